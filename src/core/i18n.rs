//! Translation resolution with fallback, memoization and user overrides.
//!
//! Tables are nested JSON objects; a dotted key such as `market.price` walks
//! one object level per segment. Lookups miss over to the fallback language,
//! then to the caller's default, then to the raw key.

use crate::core::config::AppConfig;
use crate::core::language::{self, LanguageProfile};
use crate::store::{JsonStoreExt, KeyValueStore, keys};
use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const EMBEDDED_TABLES: [(&str, &str); 6] = [
    ("en", include_str!("../../locales/en.json")),
    ("ar", include_str!("../../locales/ar.json")),
    ("fr", include_str!("../../locales/fr.json")),
    ("es", include_str!("../../locales/es.json")),
    ("hi", include_str!("../../locales/hi.json")),
    ("sw", include_str!("../../locales/sw.json")),
];

struct State {
    active: &'static LanguageProfile,
    tables: HashMap<&'static str, Value>,
    // Both hits (Some) and misses (None) are memoized
    cache: HashMap<String, Option<String>>,
    missing: BTreeSet<String>,
}

pub struct Translator {
    state: Mutex<State>,
    fallback: &'static LanguageProfile,
    store: Arc<dyn KeyValueStore>,
}

impl Translator {
    /// Builds a translator from the embedded tables. A language persisted by a
    /// previous session takes precedence over the configured one.
    pub fn new(config: &AppConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let mut tables = HashMap::new();
        for (code, raw) in EMBEDDED_TABLES {
            let profile = language::profile(code)
                .ok_or_else(|| anyhow!("No language profile for embedded table {}", code))?;
            let table: Value = serde_json::from_str(raw)
                .with_context(|| format!("Embedded translation table {code} is invalid"))?;
            tables.insert(profile.code, table);
        }

        let fallback = language::profile(&config.fallback_language).unwrap_or_else(|| {
            warn!(
                code = %config.fallback_language,
                "Unknown fallback language, using English"
            );
            &language::profiles()[0]
        });

        let stored: Option<String> = store.load(keys::LANGUAGE);
        let active = stored
            .as_deref()
            .and_then(language::profile)
            .or_else(|| language::profile(&config.language))
            .unwrap_or_else(|| {
                warn!(code = %config.language, "Unknown language, using fallback");
                fallback
            });

        let missing: BTreeSet<String> = store
            .load::<Vec<String>>(keys::MISSING_TRANSLATIONS)
            .unwrap_or_default()
            .into_iter()
            .collect();

        debug!(active = active.code, fallback = fallback.code, "Translator ready");
        Ok(Self {
            state: Mutex::new(State {
                active,
                tables,
                cache: HashMap::new(),
                missing,
            }),
            fallback,
            store,
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn active_language(&self) -> &'static LanguageProfile {
        self.lock().active
    }

    pub fn fallback_language(&self) -> &'static LanguageProfile {
        self.fallback
    }

    /// Resolves `key` in the active language.
    pub fn resolve(&self, key: &str, default: &str, params: &[(&str, &str)]) -> String {
        let code = self.lock().active.code;
        self.resolve_with(code, key, default, params)
    }

    /// Resolves `key` in an explicit language without switching to it.
    pub fn resolve_in(
        &self,
        language: &str,
        key: &str,
        default: &str,
        params: &[(&str, &str)],
    ) -> String {
        match language::profile(language) {
            Some(profile) => self.resolve_with(profile.code, key, default, params),
            None => {
                debug!(language, "Unknown language requested, resolving in active language");
                self.resolve(key, default, params)
            }
        }
    }

    /// Shorthand for a parameterless lookup that falls back to the key.
    pub fn t(&self, key: &str) -> String {
        self.resolve(key, "", &[])
    }

    fn resolve_with(
        &self,
        code: &'static str,
        key: &str,
        default: &str,
        params: &[(&str, &str)],
    ) -> String {
        let cache_key = cache_key(code, key, params);
        let mut state = self.lock();

        let cached = state.cache.get(&cache_key).cloned();
        let resolved = match cached {
            Some(cached) => cached,
            None => {
                let mut template = state
                    .tables
                    .get(code)
                    .and_then(|t| lookup(t, key))
                    .map(str::to_string);
                if template.is_none() {
                    if state.missing.insert(format!("{code}:{key}")) {
                        debug!(language = code, key, "Missing translation");
                        let list: Vec<&String> = state.missing.iter().collect();
                        self.store.save(keys::MISSING_TRANSLATIONS, &list);
                    }
                    template = state
                        .tables
                        .get(self.fallback.code)
                        .and_then(|t| lookup(t, key))
                        .map(str::to_string);
                }
                let value = template.map(|t| substitute(&t, params));
                state.cache.insert(cache_key, value.clone());
                value
            }
        };

        resolved.unwrap_or_else(|| {
            if default.is_empty() {
                key.to_string()
            } else {
                default.to_string()
            }
        })
    }

    /// Switches the active language, dropping every memoized resolution and
    /// persisting the choice with its text direction.
    pub fn set_language(&self, code: &str) -> Result<&'static LanguageProfile> {
        let profile =
            language::profile(code).ok_or_else(|| anyhow!("Unsupported language: {}", code))?;
        {
            let mut state = self.lock();
            state.active = profile;
            state.cache.clear();
        }
        self.store.save(keys::LANGUAGE, profile.code);
        self.store
            .save(keys::DIRECTION, &profile.text_direction.to_string());
        info!(language = profile.code, "Language changed");
        Ok(profile)
    }

    /// Sets a single override, creating intermediate objects along the path.
    pub fn set_override(&self, language: &str, key: &str, value: &str) -> Result<()> {
        let profile = language::profile(language)
            .ok_or_else(|| anyhow!("Unsupported language: {}", language))?;
        let mut state = self.lock();
        let mut table = state
            .tables
            .get(profile.code)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        insert_path(&mut table, key, value)?;
        state.tables.insert(profile.code, table);
        state.cache.clear();
        Ok(())
    }

    /// Imports overrides from a JSON document of the form
    /// `{ "<lang>": { nested keys... } }`. The whole document is validated
    /// before anything is applied. Returns the number of strings imported.
    pub fn import_overrides(&self, json: &str) -> Result<usize> {
        let doc: Value = serde_json::from_str(json).context("Overrides are not valid JSON")?;
        let Value::Object(languages) = doc else {
            bail!("Overrides must be an object keyed by language code");
        };

        let mut pending: Vec<(&'static str, String, String)> = Vec::new();
        for (code, subtree) in &languages {
            let profile = language::profile(code)
                .ok_or_else(|| anyhow!("Unsupported language in overrides: {}", code))?;
            if !subtree.is_object() {
                bail!("Overrides for {} must be an object", code);
            }
            let mut leaves = BTreeMap::new();
            flatten(subtree, String::new(), &mut leaves)
                .with_context(|| format!("Invalid overrides for {code}"))?;
            pending.extend(
                leaves
                    .into_iter()
                    .map(|(key, value)| (profile.code, key, value)),
            );
        }

        // Stage on copies so a conflicting path leaves every table untouched
        let mut state = self.lock();
        let mut staged: HashMap<&'static str, Value> = HashMap::new();
        for (code, key, value) in &pending {
            let table = staged.entry(*code).or_insert_with(|| {
                state
                    .tables
                    .get(code)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()))
            });
            insert_path(table, key, value)
                .with_context(|| format!("Invalid overrides for {code}"))?;
        }
        state.tables.extend(staged);
        state.cache.clear();
        info!(count = pending.len(), "Imported translation overrides");
        Ok(pending.len())
    }

    pub fn missing_translations(&self) -> Vec<String> {
        self.lock().missing.iter().cloned().collect()
    }

    /// Forgets recorded misses. Memoized lookups are dropped too, so keys
    /// that are still missing get recorded again on their next lookup.
    pub fn clear_missing(&self) {
        {
            let mut state = self.lock();
            state.missing.clear();
            state.cache.clear();
        }
        if let Err(e) = self.store.remove(keys::MISSING_TRANSLATIONS) {
            warn!(error = %e, "Failed to clear missing translations");
        }
    }
}

/// Deep-merges an overrides document into `base`; incoming strings win.
pub fn merge_overrides(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                let nested = value.is_object() && base.get(&key).is_some_and(Value::is_object);
                match base.get_mut(&key) {
                    Some(existing) if nested => merge_overrides(existing, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, incoming) => *base = incoming,
    }
}

fn cache_key(code: &str, key: &str, params: &[(&str, &str)]) -> String {
    let ordered: BTreeMap<&str, &str> = params.iter().copied().collect();
    let serialized = serde_json::to_string(&ordered).unwrap_or_default();
    format!("{code}|{key}|{serialized}")
}

fn lookup<'a>(table: &'a Value, key: &str) -> Option<&'a str> {
    if key.is_empty() {
        return None;
    }
    key.split('.')
        .try_fold(table, |node, segment| node.get(segment))
        .and_then(Value::as_str)
}

/// Replaces `{name}` placeholders in a single left-to-right pass. Values are
/// inserted literally, so braces inside a value are never expanded.
fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return template.to_string();
    }
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match params.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn flatten(node: &Value, prefix: String, out: &mut BTreeMap<String, String>) -> Result<()> {
    match node {
        Value::Object(map) => {
            for (segment, child) in map {
                if segment.is_empty() || segment.contains('.') {
                    bail!("Invalid key segment {:?}", segment);
                }
                let path = if prefix.is_empty() {
                    segment.clone()
                } else {
                    format!("{prefix}.{segment}")
                };
                flatten(child, path, out)?;
            }
            Ok(())
        }
        Value::String(s) => {
            out.insert(prefix, s.clone());
            Ok(())
        }
        other => bail!("Value at {} must be a string, found {}", prefix, other),
    }
}

fn insert_path(table: &mut Value, key: &str, value: &str) -> Result<()> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        bail!("Invalid translation key: {:?}", key);
    }
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| anyhow!("Empty translation key"))?;

    let mut node = table;
    for segment in parents {
        let Value::Object(map) = node else {
            bail!("Key {} conflicts with an existing string", key);
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let Value::Object(map) = node else {
        bail!("Key {} conflicts with an existing string", key);
    };
    if matches!(map.get(*last), Some(Value::Object(_))) {
        bail!("Key {} names a group, not a string", key);
    }
    map.insert(last.to_string(), Value::String(value.to_string()));
    Ok(())
}

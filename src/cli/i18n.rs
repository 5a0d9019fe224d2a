use super::ui;
use crate::core::i18n::{Translator, merge_overrides};
use crate::core::language;
use crate::store::{JsonStoreExt, KeyValueStore, keys};
use anyhow::{Context, Result};
use comfy_table::Cell;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Re-applies overrides saved by earlier imports.
pub fn apply_saved_overrides(translator: &Translator, store: &dyn KeyValueStore) {
    let Some(doc) = store.load::<Value>(keys::TRANSLATION_OVERRIDES) else {
        return;
    };
    match translator.import_overrides(&doc.to_string()) {
        Ok(count) => debug!(count, "Applied saved translation overrides"),
        Err(e) => warn!(error = %e, "Saved translation overrides are invalid"),
    }
}

pub fn apply_overrides_file(translator: &Translator, path: &str) -> Result<usize> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read translation overrides: {path}"))?;
    translator
        .import_overrides(&text)
        .with_context(|| format!("Invalid translation overrides in {path}"))
}

pub fn translate(
    translator: &Translator,
    key: &str,
    language: Option<&str>,
    default: Option<&str>,
    params: &[(String, String)],
) -> Result<()> {
    let params: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let default = default.unwrap_or("");
    let text = match language {
        Some(lang) => translator.resolve_in(lang, key, default, &params),
        None => translator.resolve(key, default, &params),
    };
    println!("{text}");
    Ok(())
}

pub fn languages(translator: &Translator) -> Result<()> {
    let active = translator.active_language();
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&translator.t("language.code")),
        ui::header_cell(&translator.t("language.name")),
        ui::header_cell(&translator.t("language.native")),
        ui::header_cell(&translator.t("language.direction")),
        ui::header_cell(&translator.t("language.locale")),
        ui::header_cell(&translator.t("language.active")),
    ]);

    for profile in language::profiles() {
        let marker = if profile.code == active.code { "*" } else { "" };
        table.add_row(vec![
            Cell::new(profile.code),
            Cell::new(profile.display_name),
            ui::directed_cell(profile.native_name, profile.text_direction),
            Cell::new(profile.text_direction.to_string()),
            Cell::new(profile.locale),
            Cell::new(marker),
        ]);
    }

    println!(
        "{}\n",
        ui::style_text(&translator.t("language.title"), ui::StyleType::Title)
    );
    println!("{table}");
    Ok(())
}

pub fn set_language(translator: &Translator, code: &str) -> Result<()> {
    let profile = translator.set_language(code)?;
    println!(
        "{}",
        translator.resolve("language.changed", "", &[("language", profile.native_name)])
    );
    Ok(())
}

pub fn missing(translator: &Translator, clear: bool) -> Result<()> {
    let missing = translator.missing_translations();
    if missing.is_empty() {
        println!("{}", translator.t("missing.none"));
    } else {
        println!(
            "{}\n",
            ui::style_text(&translator.t("missing.title"), ui::StyleType::Title)
        );
        for entry in &missing {
            println!("  {entry}");
        }
    }
    if clear {
        translator.clear_missing();
    }
    Ok(())
}

/// Imports an overrides file and remembers it for later runs.
pub fn import(translator: &Translator, store: &dyn KeyValueStore, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read translation overrides: {}", path.display()))?;
    let count = translator.import_overrides(&text)?;

    let incoming: Value = serde_json::from_str(&text)?;
    let mut saved = store
        .load::<Value>(keys::TRANSLATION_OVERRIDES)
        .unwrap_or_else(|| Value::Object(Default::default()));
    merge_overrides(&mut saved, incoming);
    store.save(keys::TRANSLATION_OVERRIDES, &saved);

    println!(
        "{}",
        translator.resolve("import.done", "", &[("count", &count.to_string())])
    );
    Ok(())
}

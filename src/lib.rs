pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::alerts::AlertCondition;
use crate::core::config::AppConfig;
use crate::core::i18n::Translator;
use crate::core::market::MarketService;
use crate::core::price::{NewOffer, PriceQuery, PriceRecord, TrendPeriod};
use crate::core::random::RandomSource;
use crate::providers::simulated::SimulatedMarketApi;
use crate::store::persistent::StoreCache;
use crate::store::{KeyValueStore, keys};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Translate {
        key: String,
        language: Option<String>,
        default: Option<String>,
        params: Vec<(String, String)>,
    },
    Languages,
    SetLanguage {
        code: String,
    },
    Missing {
        clear: bool,
    },
    ImportTranslations {
        path: PathBuf,
    },
    Prices {
        query: PriceQuery,
    },
    Trends {
        crop: Option<String>,
        period: TrendPeriod,
    },
    Markets,
    Buyers {
        crop: String,
    },
    Offer {
        offer: NewOffer,
    },
    Offers,
    Alert {
        crop: String,
        price: f64,
        condition: AlertCondition,
    },
    Alerts,
    Watch {
        ticks: usize,
    },
    ApiLog,
    Points,
}

/// Services shared by every command.
pub struct App {
    pub config: AppConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub translator: Translator,
    pub market: Arc<MarketService>,
}

impl App {
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let translator = Translator::new(&config, Arc::clone(&store))?;
        cli::i18n::apply_saved_overrides(&translator, store.as_ref());
        if let Some(path) = &config.translations.overrides_path {
            if let Err(e) = cli::i18n::apply_overrides_file(&translator, path) {
                warn!(error = %e, "Ignoring translation overrides file");
            }
        }

        let rng = Arc::new(RandomSource::from_seed_option(config.market.seed));
        let api = Arc::new(SimulatedMarketApi::new(
            config.market.api.clone(),
            (&config.market).into(),
            Arc::clone(&rng),
            Arc::clone(&store),
        ));
        let cache = Arc::new(StoreCache::<Vec<PriceRecord>>::new(
            Arc::clone(&store),
            keys::MARKET_CACHE,
            config.market.cache_ttl(),
        ));
        let market = Arc::new(MarketService::new(
            &config.market,
            api,
            cache,
            Arc::clone(&store),
            rng,
        ));

        Ok(Self {
            config,
            store,
            translator,
            market,
        })
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Crop desk starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = store::open_store(&config);
    let app = App::new(config, store)?;

    match command {
        AppCommand::Translate {
            key,
            language,
            default,
            params,
        } => cli::i18n::translate(
            &app.translator,
            &key,
            language.as_deref(),
            default.as_deref(),
            &params,
        ),
        AppCommand::Languages => cli::i18n::languages(&app.translator),
        AppCommand::SetLanguage { code } => cli::i18n::set_language(&app.translator, &code),
        AppCommand::Missing { clear } => cli::i18n::missing(&app.translator, clear),
        AppCommand::ImportTranslations { path } => {
            cli::i18n::import(&app.translator, app.store.as_ref(), &path)
        }
        AppCommand::Prices { query } => cli::market::prices(&app, &query).await,
        AppCommand::Trends { crop, period } => {
            cli::market::trends(&app, crop.as_deref(), period).await
        }
        AppCommand::Markets => cli::market::markets(&app).await,
        AppCommand::Buyers { crop } => cli::market::buyers(&app, &crop).await,
        AppCommand::Offer { offer } => cli::trade::offer(&app, offer).await,
        AppCommand::Offers => cli::trade::offers(&app),
        AppCommand::Alert {
            crop,
            price,
            condition,
        } => cli::trade::alert(&app, &crop, price, condition),
        AppCommand::Alerts => cli::trade::alerts(&app),
        AppCommand::Watch { ticks } => cli::trade::watch(&app, ticks).await,
        AppCommand::ApiLog => cli::trade::api_log(&app),
        AppCommand::Points => cli::trade::points(&app),
    }
}

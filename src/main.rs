use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use cropdesk::AppCommand;
use cropdesk::core::alerts::AlertCondition;
use cropdesk::core::log::init_logging;
use cropdesk::core::price::{NewOffer, PriceQuery, TrendPeriod};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Look up a translation key
    Translate {
        key: String,
        /// Resolve in this language instead of the active one
        #[arg(short, long = "lang")]
        language: Option<String>,
        /// Text to show when the key is unknown
        #[arg(long)]
        default: Option<String>,
        /// Placeholder value as NAME=VALUE, may be repeated
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// List supported languages
    Languages,
    /// Switch the interface language
    SetLanguage { code: String },
    /// Show keys missing from the active language
    Missing {
        /// Forget the recorded keys afterwards
        #[arg(long)]
        clear: bool,
    },
    /// Import translation overrides from a JSON file
    ImportTranslations { path: PathBuf },
    /// Show current market prices
    Prices {
        #[arg(long)]
        crop: Option<String>,
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        quality: Option<String>,
    },
    /// Show historical price trends
    Trends {
        /// Single crop; all crops when omitted
        #[arg(long)]
        crop: Option<String>,
        /// One of 7d, 30d, 90d
        #[arg(short, long, default_value = "30d")]
        period: TrendPeriod,
    },
    /// List known markets
    Markets,
    /// Search buyers for a crop
    Buyers { crop: String },
    /// Post a selling offer
    Offer {
        crop: String,
        quantity: f64,
        price: f64,
        #[arg(long)]
        quality: Option<String>,
    },
    /// List selling offers
    Offers,
    /// Set a price alert
    Alert {
        crop: String,
        price: f64,
        /// Trigger when the price drops to the target instead of rising to it
        #[arg(long)]
        below: bool,
    },
    /// List price alerts
    Alerts,
    /// Refresh prices periodically and report triggered alerts
    Watch {
        /// Number of refreshes before exiting; 0 runs until interrupted
        #[arg(short, long, default_value_t = 1)]
        ticks: usize,
    },
    /// Show recent market API calls
    ApiLog,
    /// Show reward points
    Points,
}

fn parse_param(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=VALUE, got {}", s))?;
    Ok((name.to_string(), value.to_string()))
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Translate {
                key,
                language,
                default,
                params,
            } => AppCommand::Translate {
                key,
                language,
                default,
                params,
            },
            Commands::Languages => AppCommand::Languages,
            Commands::SetLanguage { code } => AppCommand::SetLanguage { code },
            Commands::Missing { clear } => AppCommand::Missing { clear },
            Commands::ImportTranslations { path } => AppCommand::ImportTranslations { path },
            Commands::Prices {
                crop,
                market,
                quality,
            } => AppCommand::Prices {
                query: PriceQuery {
                    crop_id: crop,
                    market,
                    quality,
                },
            },
            Commands::Trends { crop, period } => AppCommand::Trends { crop, period },
            Commands::Markets => AppCommand::Markets,
            Commands::Buyers { crop } => AppCommand::Buyers { crop },
            Commands::Offer {
                crop,
                quantity,
                price,
                quality,
            } => AppCommand::Offer {
                offer: NewOffer {
                    crop_id: crop,
                    quantity,
                    price,
                    quality,
                },
            },
            Commands::Offers => AppCommand::Offers,
            Commands::Alert { crop, price, below } => AppCommand::Alert {
                crop,
                price,
                condition: if below {
                    AlertCondition::Below
                } else {
                    AlertCondition::Above
                },
            },
            Commands::Alerts => AppCommand::Alerts,
            Commands::Watch { ticks } => AppCommand::Watch { ticks },
            Commands::ApiLog => AppCommand::ApiLog,
            Commands::Points => AppCommand::Points,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cropdesk::cli::setup::setup(),
        Some(cmd) => cropdesk::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

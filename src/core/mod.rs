//! Core business logic abstractions

pub mod alerts;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod i18n;
pub mod language;
pub mod log;
pub mod market;
pub mod price;
pub mod pricing;
pub mod random;

// Re-export main types for cleaner imports
pub use cache::{Cache, CacheEntry};
pub use i18n::Translator;
pub use market::MarketService;
pub use price::{MarketApi, PriceQuery, PriceRecord, TrendDirection, TrendPeriod, TrendSeries};

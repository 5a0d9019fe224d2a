use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::catalog::{BaselineBook, Market, default_markets};
use crate::core::config::SimulatedApiConfig;
use crate::core::price::{
    Buyer, MarketApi, NewOffer, OfferStatus, PriceQuery, PriceRecord, SellingOffer, TrendPeriod,
    TrendSeries,
};
use crate::core::pricing::{self, PricingFactors, round2};
use crate::core::random::RandomSource;
use crate::store::{JsonStoreExt, KeyValueStore, keys};

/// Entries kept in the persisted API call log.
pub const API_LOG_CAPACITY: usize = 100;

const BUYER_NAMES: [&str; 8] = [
    "Green Valley Traders",
    "Sunrise Agro Co.",
    "Al Noor Foods",
    "Harvest Link",
    "Delta Grain Buyers",
    "FreshWay Distributors",
    "Oasis Commodities",
    "Riverbend Mills",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallLogEntry {
    pub endpoint: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub latency_ms: u64,
}

/// Appends to the persisted call log, keeping only the newest entries.
pub fn record_call(store: &dyn KeyValueStore, entry: ApiCallLogEntry) {
    let mut log: Vec<ApiCallLogEntry> = store.load(keys::API_CALL_LOG).unwrap_or_default();
    log.push(entry);
    if log.len() > API_LOG_CAPACITY {
        let excess = log.len() - API_LOG_CAPACITY;
        log.drain(..excess);
    }
    store.save(keys::API_CALL_LOG, &log);
}

pub fn api_call_log(store: &dyn KeyValueStore) -> Vec<ApiCallLogEntry> {
    store.load(keys::API_CALL_LOG).unwrap_or_default()
}

/// Stand-in for the remote market service. Every endpoint waits a random
/// latency, may fail, and fabricates its response from a private catalog.
pub struct SimulatedMarketApi {
    config: SimulatedApiConfig,
    factors: PricingFactors,
    catalog: BaselineBook,
    markets: Vec<Market>,
    rng: Arc<RandomSource>,
    store: Arc<dyn KeyValueStore>,
}

impl SimulatedMarketApi {
    pub fn new(
        config: SimulatedApiConfig,
        factors: PricingFactors,
        rng: Arc<RandomSource>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        SimulatedMarketApi {
            config,
            factors,
            catalog: BaselineBook::default(),
            markets: default_markets(),
            rng,
            store,
        }
    }

    async fn call<T, F>(&self, endpoint: &str, produce: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        let latency_ms = self
            .rng
            .uniform_u64(self.config.min_latency_ms, self.config.max_latency_ms);
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;

        let result = if self.rng.chance(self.config.failure_rate) {
            Err(anyhow!("Simulated network error calling {}", endpoint))
        } else {
            produce()
        };

        debug!(endpoint, latency_ms, success = result.is_ok(), "Simulated API call");
        record_call(
            self.store.as_ref(),
            ApiCallLogEntry {
                endpoint: endpoint.to_string(),
                timestamp: Utc::now(),
                success: result.is_ok(),
                latency_ms,
            },
        );
        result
    }
}

#[async_trait]
impl MarketApi for SimulatedMarketApi {
    #[instrument(name = "SimulatedPriceFetch", skip(self), fields(key = %query.cache_key()))]
    async fn fetch_prices(&self, query: &PriceQuery) -> Result<Vec<PriceRecord>> {
        self.call("prices", || {
            Ok(pricing::generate_records(
                self.catalog.all(),
                query,
                &self.factors,
                &self.rng,
                Utc::now(),
            ))
        })
        .await
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        self.call("markets", || Ok(self.markets.clone())).await
    }

    async fn fetch_trends(&self, crop_id: &str, period: TrendPeriod) -> Result<TrendSeries> {
        self.call("trends", || {
            let baseline = self
                .catalog
                .get(crop_id)
                .ok_or_else(|| anyhow!("No trend data for crop: {}", crop_id))?;
            Ok(pricing::generate_trend(
                baseline,
                period,
                &self.rng,
                Utc::now().date_naive(),
            ))
        })
        .await
    }

    async fn search_buyers(&self, crop_id: &str) -> Result<Vec<Buyer>> {
        self.call("buyers", || {
            let baseline = self
                .catalog
                .get(crop_id)
                .ok_or_else(|| anyhow!("No buyers for crop: {}", crop_id))?;
            let count = self.rng.uniform_u64(2, 5) as usize;
            let buyers = (0..count)
                .map(|_| {
                    let market = &self.markets[self.rng.index(self.markets.len())];
                    Buyer {
                        name: BUYER_NAMES[self.rng.index(BUYER_NAMES.len())].to_string(),
                        location: market.name.clone(),
                        crop_id: baseline.id.clone(),
                        offered_price: round2(baseline.avg_price * self.rng.uniform(0.85, 1.15)),
                        quantity: self.rng.uniform(1.0, 50.0).round(),
                    }
                })
                .collect();
            Ok(buyers)
        })
        .await
    }

    async fn create_offer(&self, offer: &NewOffer) -> Result<SellingOffer> {
        self.call("offers", || {
            let now = Utc::now();
            Ok(SellingOffer {
                id: format!(
                    "OFF-{}-{:04}",
                    now.timestamp_millis(),
                    self.rng.uniform_u64(0, 9999)
                ),
                crop_id: offer.crop_id.clone(),
                quantity: offer.quantity,
                price: offer.price,
                quality: offer.quality.clone(),
                status: OfferStatus::Open,
                created_at: now,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn api(failure_rate: f64) -> (SimulatedMarketApi, Arc<dyn KeyValueStore>) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let config = SimulatedApiConfig {
            min_latency_ms: 0,
            max_latency_ms: 2,
            failure_rate,
        };
        let api = SimulatedMarketApi::new(
            config,
            PricingFactors::default(),
            Arc::new(RandomSource::seeded(21)),
            Arc::clone(&store),
        );
        (api, store)
    }

    #[tokio::test]
    async fn test_prices_endpoint_filters_and_logs() {
        let (api, store) = api(0.0);
        let records = api
            .fetch_prices(&PriceQuery::for_crop("maize"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].crop_id, "maize");

        let log = api_call_log(store.as_ref());
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].endpoint, "prices");
        assert!(log[0].success);
        assert!(log[0].latency_ms <= 2);
    }

    #[tokio::test]
    async fn test_failing_api_reports_error_and_logs() {
        let (api, store) = api(1.0);
        let err = api.fetch_markets().await.unwrap_err();
        assert_eq!(err.to_string(), "Simulated network error calling markets");

        let log = api_call_log(store.as_ref());
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
    }

    #[tokio::test]
    async fn test_buyers_and_trends() {
        let (api, _) = api(0.0);
        let buyers = api.search_buyers("coffee").await.unwrap();
        assert!((2..=5).contains(&buyers.len()));
        for b in &buyers {
            assert_eq!(b.crop_id, "coffee");
            assert!(b.offered_price >= round2(5.8 * 0.85) - 0.01);
            assert!(b.offered_price <= round2(5.8 * 1.15) + 0.01);
            assert!(b.quantity >= 1.0);
        }
        assert!(api.search_buyers("kale").await.is_err());

        let series = api.fetch_trends("wheat", TrendPeriod::SevenDays).await.unwrap();
        assert_eq!(series.points.len(), 8);
    }

    #[tokio::test]
    async fn test_create_offer_echoes_input() {
        let (api, _) = api(0.0);
        let offer = api
            .create_offer(&NewOffer {
                crop_id: "dates".to_string(),
                quantity: 12.0,
                price: 4.75,
                quality: Some("premium".to_string()),
            })
            .await
            .unwrap();
        assert!(offer.id.starts_with("OFF-"));
        assert_eq!(offer.crop_id, "dates");
        assert_eq!(offer.status, OfferStatus::Open);
    }

    #[test]
    fn test_call_log_is_capped() {
        let store = MemoryStore::new();
        for i in 0..(API_LOG_CAPACITY + 25) {
            record_call(
                &store,
                ApiCallLogEntry {
                    endpoint: format!("e{i}"),
                    timestamp: Utc::now(),
                    success: true,
                    latency_ms: 1,
                },
            );
        }
        let log = api_call_log(&store);
        assert_eq!(log.len(), API_LOG_CAPACITY);
        assert_eq!(log[0].endpoint, "e25");
        assert_eq!(log.last().unwrap().endpoint, format!("e{}", API_LOG_CAPACITY + 24));
    }
}

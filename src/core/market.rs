//! Market price service: cached price lookups with local fallback, trends,
//! offers and alerts.

use crate::core::alerts::{self, AlertCondition, PriceAlert, TriggeredAlert};
use crate::core::cache::Cache;
use crate::core::catalog::{BaselineBook, CropBaseline, Market, default_markets};
use crate::core::config::MarketConfig;
use crate::core::price::{
    Buyer, MarketApi, NewOffer, OfferStatus, PriceQuery, PriceRecord, SellingOffer, TrendPeriod,
    TrendSeries,
};
use crate::core::pricing::{self, PricingFactors};
use crate::core::random::RandomSource;
use crate::store::{JsonStoreExt, KeyValueStore, keys};
use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Points awarded for each selling offer.
pub const OFFER_POINTS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct OfferReceipt {
    pub offer: SellingOffer,
    pub points_awarded: u64,
    pub total_points: u64,
}

/// Events published by the background refresh loop.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    Refreshed { crops: usize },
    AlertTriggered(TriggeredAlert),
}

pub struct MarketService {
    api: Arc<dyn MarketApi>,
    cache: Arc<dyn Cache<String, Vec<PriceRecord>>>,
    store: Arc<dyn KeyValueStore>,
    baselines: Mutex<BaselineBook>,
    factors: PricingFactors,
    rng: Arc<RandomSource>,
}

impl MarketService {
    pub fn new(
        config: &MarketConfig,
        api: Arc<dyn MarketApi>,
        cache: Arc<dyn Cache<String, Vec<PriceRecord>>>,
        store: Arc<dyn KeyValueStore>,
        rng: Arc<RandomSource>,
    ) -> Self {
        Self {
            api,
            cache,
            store,
            baselines: Mutex::new(BaselineBook::default()),
            factors: PricingFactors::from(config),
            rng,
        }
    }

    fn book(&self) -> MutexGuard<'_, BaselineBook> {
        self.baselines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn baseline(&self, crop_id: &str) -> Option<CropBaseline> {
        self.book().get(crop_id).cloned()
    }

    pub fn baselines(&self) -> Vec<CropBaseline> {
        self.book().all().to_vec()
    }

    /// Prices for the given filters. Served from cache while fresh; otherwise
    /// fetched remotely, falling back to local generation when the remote
    /// call fails or returns nothing. Fresh prices are folded into the
    /// baselines before being cached.
    #[instrument(skip(self), fields(key = %query.cache_key()))]
    pub async fn get_prices(&self, query: &PriceQuery) -> Vec<PriceRecord> {
        let key = query.cache_key();
        if let Some(cached) = self.cache.get(&key).await {
            return cached;
        }

        let records = match self.api.fetch_prices(query).await {
            Ok(records) if !records.is_empty() => records,
            Ok(_) => {
                debug!("Remote returned no prices, generating locally");
                self.generate_local(query)
            }
            Err(e) => {
                info!(error = %e, "Remote price fetch failed, generating locally");
                self.generate_local(query)
            }
        };

        {
            let mut book = self.book();
            for record in &records {
                if !book.observe(&record.crop_id, record.price) {
                    debug!(crop = %record.crop_id, "Price for crop without baseline");
                }
            }
        }

        self.cache.put(key, records.clone()).await;
        records
    }

    fn generate_local(&self, query: &PriceQuery) -> Vec<PriceRecord> {
        let baselines = self.book().matching(query.crop_id.as_deref());
        pricing::generate_records(&baselines, query, &self.factors, &self.rng, Utc::now())
    }

    #[instrument(skip(self))]
    pub async fn get_price_trends(&self, crop_id: &str, period: TrendPeriod) -> Result<TrendSeries> {
        let baseline = self
            .baseline(crop_id)
            .ok_or_else(|| anyhow!("Unknown crop: {}", crop_id))?;

        match self.api.fetch_trends(crop_id, period).await {
            Ok(series) if !series.points.is_empty() => return Ok(series),
            Ok(_) => debug!("Remote returned an empty trend, generating locally"),
            Err(e) => info!(error = %e, "Remote trend fetch failed, generating locally"),
        }
        Ok(pricing::generate_trend(
            &baseline,
            period,
            &self.rng,
            Utc::now().date_naive(),
        ))
    }

    pub async fn get_markets(&self) -> Vec<Market> {
        match self.api.fetch_markets().await {
            Ok(markets) if !markets.is_empty() => markets,
            Ok(_) => default_markets(),
            Err(e) => {
                info!(error = %e, "Remote market list failed, using built-in list");
                default_markets()
            }
        }
    }

    /// Buyer search has no local equivalent, so remote failures surface.
    pub async fn search_buyers(&self, crop_id: &str) -> Result<Vec<Buyer>> {
        if self.baseline(crop_id).is_none() {
            bail!("Unknown crop: {}", crop_id);
        }
        self.api.search_buyers(crop_id).await
    }

    #[instrument(skip(self))]
    pub async fn create_offer(&self, offer: NewOffer) -> Result<OfferReceipt> {
        if self.baseline(&offer.crop_id).is_none() {
            bail!("Unknown crop: {}", offer.crop_id);
        }
        if offer.quantity.is_nan() || offer.quantity <= 0.0 {
            bail!("Quantity must be positive, got {}", offer.quantity);
        }
        if offer.price.is_nan() || offer.price <= 0.0 {
            bail!("Price must be positive, got {}", offer.price);
        }

        let created = match self.api.create_offer(&offer).await {
            Ok(created) => created,
            Err(e) => {
                info!(error = %e, "Remote offer creation failed, storing locally");
                let now = Utc::now();
                SellingOffer {
                    id: format!(
                        "LOCAL-{}-{:04}",
                        now.timestamp_millis(),
                        self.rng.uniform_u64(0, 9999)
                    ),
                    crop_id: offer.crop_id.clone(),
                    quantity: offer.quantity,
                    price: offer.price,
                    quality: offer.quality.clone(),
                    status: OfferStatus::Open,
                    created_at: now,
                }
            }
        };

        let mut offers = self.offers();
        offers.push(created.clone());
        self.store.save(keys::SELLING_OFFERS, &offers);

        let total_points = self.user_points() + OFFER_POINTS;
        self.store.save(keys::USER_POINTS, &total_points);
        info!(offer = %created.id, total_points, "Offer created");

        Ok(OfferReceipt {
            offer: created,
            points_awarded: OFFER_POINTS,
            total_points,
        })
    }

    pub fn offers(&self) -> Vec<SellingOffer> {
        self.store.load(keys::SELLING_OFFERS).unwrap_or_default()
    }

    pub fn user_points(&self) -> u64 {
        self.store.load(keys::USER_POINTS).unwrap_or(0)
    }

    pub fn add_alert(
        &self,
        crop_id: &str,
        target_price: f64,
        condition: AlertCondition,
    ) -> Result<PriceAlert> {
        if self.baseline(crop_id).is_none() {
            bail!("Unknown crop: {}", crop_id);
        }
        if target_price.is_nan() || target_price <= 0.0 {
            bail!("Target price must be positive, got {}", target_price);
        }
        let now = Utc::now();
        let alert = PriceAlert {
            id: format!(
                "ALR-{}-{:04}",
                now.timestamp_millis(),
                self.rng.uniform_u64(0, 9999)
            ),
            crop_id: crop_id.to_string(),
            target_price,
            condition,
            active: true,
            created_at: now,
        };
        let mut alerts = self.alerts();
        alerts.push(alert.clone());
        self.store.save(keys::PRICE_ALERTS, &alerts);
        Ok(alert)
    }

    pub fn alerts(&self) -> Vec<PriceAlert> {
        self.store.load(keys::PRICE_ALERTS).unwrap_or_default()
    }

    /// Evaluates active alerts against current per-crop prices.
    pub async fn check_alerts(&self) -> Vec<TriggeredAlert> {
        let mut alerts = self.alerts();
        let mut crop_ids: Vec<String> = alerts
            .iter()
            .filter(|a| a.active)
            .map(|a| a.crop_id.clone())
            .collect();
        crop_ids.sort();
        crop_ids.dedup();
        if crop_ids.is_empty() {
            return Vec::new();
        }

        let queries: Vec<PriceQuery> = crop_ids.iter().map(|id| PriceQuery::for_crop(id)).collect();
        let results = join_all(queries.iter().map(|q| self.get_prices(q))).await;
        let prices: HashMap<String, f64> = results
            .into_iter()
            .flatten()
            .map(|r| (r.crop_id, r.price))
            .collect();

        let triggered = alerts::evaluate(&mut alerts, &prices);
        if !triggered.is_empty() {
            self.store.save(keys::PRICE_ALERTS, &alerts);
            for t in &triggered {
                info!(
                    crop = %t.alert.crop_id,
                    price = t.price,
                    target = t.alert.target_price,
                    condition = %t.alert.condition,
                    "Price alert triggered"
                );
            }
        }
        triggered
    }

    /// Drops every cached price and re-fetches the full list and each crop.
    /// Returns the number of crops refreshed.
    pub async fn refresh(&self) -> usize {
        self.cache.clear().await;
        let mut queries = vec![PriceQuery::all()];
        queries.extend(self.book().ids().iter().map(|id| PriceQuery::for_crop(id)));

        let results = join_all(queries.iter().map(|q| self.get_prices(q))).await;
        let crops = results.iter().skip(1).filter(|r| !r.is_empty()).count();
        debug!(crops, "Market prices refreshed");
        crops
    }

    /// Runs price refreshes and alert checks on fixed intervals until the
    /// receiver of `events` goes away.
    pub fn spawn_background(
        self: Arc<Self>,
        refresh_every: Duration,
        alerts_every: Duration,
        events: mpsc::Sender<MarketEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut refresh = tokio::time::interval(refresh_every);
            let mut check = tokio::time::interval(alerts_every);
            loop {
                let sent = tokio::select! {
                    _ = refresh.tick() => {
                        let crops = self.refresh().await;
                        events.send(MarketEvent::Refreshed { crops }).await.is_ok()
                    }
                    _ = check.tick() => {
                        let mut ok = true;
                        for triggered in self.check_alerts().await {
                            ok &= events.send(MarketEvent::AlertTriggered(triggered)).await.is_ok();
                        }
                        ok
                    }
                };
                if !sent {
                    debug!("Event receiver dropped, stopping background refresh");
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryCache, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Remote that counts calls and either fails or answers with nothing.
    struct MockApi {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockApi {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn respond<T>(&self, empty: T) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("Simulated network error"))
            } else {
                Ok(empty)
            }
        }
    }

    #[async_trait]
    impl MarketApi for MockApi {
        async fn fetch_prices(&self, _query: &PriceQuery) -> Result<Vec<PriceRecord>> {
            self.respond(Vec::new())
        }
        async fn fetch_markets(&self) -> Result<Vec<Market>> {
            self.respond(Vec::new())
        }
        async fn fetch_trends(&self, crop_id: &str, period: TrendPeriod) -> Result<TrendSeries> {
            self.respond(TrendSeries {
                crop_id: crop_id.to_string(),
                period,
                points: Vec::new(),
                change_pct: 0.0,
                direction: crate::core::price::TrendDirection::Flat,
            })
        }
        async fn search_buyers(&self, _crop_id: &str) -> Result<Vec<Buyer>> {
            self.respond(Vec::new())
        }
        async fn create_offer(&self, _offer: &NewOffer) -> Result<SellingOffer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("Simulated network error"))
        }
    }

    fn service_with(api: Arc<MockApi>, ttl: Duration) -> MarketService {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        MarketService::new(
            &MarketConfig::default(),
            api,
            Arc::new(MemoryCache::<String, Vec<PriceRecord>>::new(ttl)),
            store,
            Arc::new(RandomSource::seeded(17)),
        )
    }

    #[tokio::test]
    async fn test_failed_remote_falls_back_and_caches() {
        let api = Arc::new(MockApi::new(true));
        let service = service_with(Arc::clone(&api), Duration::from_secs(7200));

        let first = service.get_prices(&PriceQuery::for_crop("wheat")).await;
        assert_eq!(first.len(), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);

        // Cached: no second remote call and the same records come back
        let second = service.get_prices(&PriceQuery::for_crop("wheat")).await;
        assert_eq!(second, first);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);

        // A different filter is a different cache key
        service.get_prices(&PriceQuery::for_crop("rice")).await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_remote_falls_back() {
        let api = Arc::new(MockApi::new(false));
        let service = service_with(api, Duration::from_secs(60));
        let records = service.get_prices(&PriceQuery::all()).await;
        assert_eq!(records.len(), 10);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let api = Arc::new(MockApi::new(true));
        let service = service_with(Arc::clone(&api), Duration::from_millis(10));

        service.get_prices(&PriceQuery::all()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.get_prices(&PriceQuery::all()).await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_baseline_widens_around_observed_prices() {
        let api = Arc::new(MockApi::new(true));
        let service = service_with(api, Duration::from_secs(60));

        for quality in ["premium", "standard", "economy"] {
            for market in ["north", "south"] {
                let query = PriceQuery::for_crop("tomato")
                    .with_market(market)
                    .with_quality(quality);
                let before = service.baseline("tomato").unwrap();
                let records = service.get_prices(&query).await;
                let after = service.baseline("tomato").unwrap();

                let price = records[0].price;
                assert!(after.min_price <= price && price <= after.max_price);
                assert!(after.min_price <= before.min_price);
                assert!(after.max_price >= before.max_price);
                assert!((after.avg_price - (before.avg_price + price) / 2.0).abs() < 1e-9);
            }
        }
    }

    #[tokio::test]
    async fn test_trends_fall_back_locally() {
        let api = Arc::new(MockApi::new(true));
        let service = service_with(api, Duration::from_secs(60));

        let series = service
            .get_price_trends("barley", TrendPeriod::SevenDays)
            .await
            .unwrap();
        assert_eq!(series.points.len(), 8);
        assert!(service.get_price_trends("kale", TrendPeriod::SevenDays).await.is_err());
    }

    #[tokio::test]
    async fn test_markets_fall_back_to_builtin() {
        let service = service_with(Arc::new(MockApi::new(true)), Duration::from_secs(60));
        assert_eq!(service.get_markets().await, default_markets());
    }

    #[tokio::test]
    async fn test_offer_validation_local_fallback_and_points() {
        let service = service_with(Arc::new(MockApi::new(true)), Duration::from_secs(60));

        let bad = [
            NewOffer { crop_id: "kale".into(), quantity: 1.0, price: 1.0, quality: None },
            NewOffer { crop_id: "wheat".into(), quantity: 0.0, price: 1.0, quality: None },
            NewOffer { crop_id: "wheat".into(), quantity: 1.0, price: f64::NAN, quality: None },
        ];
        for offer in bad {
            assert!(service.create_offer(offer).await.is_err());
        }
        assert_eq!(service.user_points(), 0);

        let receipt = service
            .create_offer(NewOffer {
                crop_id: "wheat".into(),
                quantity: 5.0,
                price: 330.0,
                quality: Some("standard".into()),
            })
            .await
            .unwrap();
        assert!(receipt.offer.id.starts_with("LOCAL-"));
        assert_eq!(receipt.points_awarded, OFFER_POINTS);
        assert_eq!(receipt.total_points, OFFER_POINTS);

        service
            .create_offer(NewOffer {
                crop_id: "rice".into(),
                quantity: 2.0,
                price: 500.0,
                quality: None,
            })
            .await
            .unwrap();
        assert_eq!(service.offers().len(), 2);
        assert_eq!(service.user_points(), 2 * OFFER_POINTS);
    }

    #[tokio::test]
    async fn test_alerts_trigger_once() {
        let service = service_with(Arc::new(MockApi::new(true)), Duration::from_secs(60));

        assert!(service.add_alert("kale", 1.0, AlertCondition::Above).is_err());
        assert!(service.add_alert("wheat", -1.0, AlertCondition::Above).is_err());

        // Any generated wheat price is far above 1.0 and far below 1e9
        service.add_alert("wheat", 1.0, AlertCondition::Above).unwrap();
        service.add_alert("wheat", 1e9, AlertCondition::Above).unwrap();
        assert_eq!(service.alerts().len(), 2);

        let fired = service.check_alerts().await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].alert.target_price, 1.0);

        let stored = service.alerts();
        assert_eq!(stored.iter().filter(|a| a.active).count(), 1);
        assert!(service.check_alerts().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_clears_cache() {
        let api = Arc::new(MockApi::new(true));
        let service = service_with(Arc::clone(&api), Duration::from_secs(60));

        service.get_prices(&PriceQuery::all()).await;
        let crops = service.refresh().await;
        assert_eq!(crops, 10);
        // One initial call, then the full list plus ten crops
        assert_eq!(api.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_background_loop_publishes_events() {
        let service = Arc::new(service_with(
            Arc::new(MockApi::new(true)),
            Duration::from_secs(60),
        ));
        service.add_alert("maize", 1.0, AlertCondition::Above).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let handle = Arc::clone(&service).spawn_background(
            Duration::from_millis(20),
            Duration::from_millis(20),
            tx,
        );

        let mut refreshed = 0;
        let mut triggered = 0;
        while refreshed < 2 || triggered < 1 {
            match rx.recv().await {
                Some(MarketEvent::Refreshed { crops }) => {
                    assert_eq!(crops, 10);
                    refreshed += 1;
                }
                Some(MarketEvent::AlertTriggered(t)) => {
                    assert_eq!(t.alert.crop_id, "maize");
                    triggered += 1;
                }
                None => break,
            }
        }
        drop(rx);
        handle.abort();
        assert_eq!(triggered, 1);
    }
}

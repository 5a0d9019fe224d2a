//! Local price and trend generation from crop baselines.
//!
//! Generation is pure apart from the injected [`RandomSource`]; folding the
//! results back into the baselines is the caller's job.

use crate::core::catalog::CropBaseline;
use crate::core::config::MarketConfig;
use crate::core::price::{
    PriceQuery, PriceRecord, TrendDirection, TrendPeriod, TrendPoint, TrendSeries,
};
use crate::core::random::RandomSource;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// Seasonal price multipliers indexed by calendar month (January first).
pub const SEASONAL_FACTORS: [f64; 12] = [
    1.05, 1.08, 1.10, 1.04, 0.97, 0.92, 0.90, 0.93, 0.98, 1.00, 1.02, 1.04,
];

/// Daily noise applied to trend points.
pub const TREND_NOISE: (f64, f64) = (0.9, 1.1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingFactors {
    pub market_factor: f64,
    pub quality_factor: f64,
    pub perturbation: f64,
}

impl Default for PricingFactors {
    fn default() -> Self {
        Self::from(&MarketConfig::default())
    }
}

impl From<&MarketConfig> for PricingFactors {
    fn from(config: &MarketConfig) -> Self {
        Self {
            market_factor: config.market_factor,
            quality_factor: config.quality_factor,
            perturbation: config.perturbation.abs(),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// `avg * market_factor * quality_factor * (1 + u)` with `u` uniform in
/// `[-perturbation, perturbation]`. Each factor only applies when its filter is set.
pub fn generate_price(
    baseline: &CropBaseline,
    query: &PriceQuery,
    factors: &PricingFactors,
    rng: &RandomSource,
) -> f64 {
    let mut price = baseline.avg_price;
    if query.market.is_some() {
        price *= factors.market_factor;
    }
    if query.quality.is_some() {
        price *= factors.quality_factor;
    }
    let noise = rng.uniform(-factors.perturbation, factors.perturbation);
    round2(price * (1.0 + noise))
}

pub fn generate_records(
    baselines: &[CropBaseline],
    query: &PriceQuery,
    factors: &PricingFactors,
    rng: &RandomSource,
    now: DateTime<Utc>,
) -> Vec<PriceRecord> {
    baselines
        .iter()
        .filter(|b| query.crop_id.as_deref().is_none_or(|id| b.id == id))
        .map(|baseline| {
            let price = generate_price(baseline, query, factors, rng);
            let change_pct = percent_change(baseline.avg_price, price);
            PriceRecord {
                crop_id: baseline.id.clone(),
                crop_name: baseline.name.clone(),
                unit: baseline.unit.clone(),
                market: query.market.clone(),
                quality: query.quality.clone(),
                price,
                change_pct: round2(change_pct),
                trend: TrendDirection::classify(change_pct),
                updated_at: now,
            }
        })
        .collect()
}

/// Daily series ending at `today`, one point per day including day 0, so a
/// `7d` period yields 8 points.
pub fn generate_trend(
    baseline: &CropBaseline,
    period: TrendPeriod,
    rng: &RandomSource,
    today: NaiveDate,
) -> TrendSeries {
    let days = period.days();
    let points: Vec<TrendPoint> = (0..=days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| {
            let seasonal = SEASONAL_FACTORS[date.month0() as usize];
            let noise = rng.uniform(TREND_NOISE.0, TREND_NOISE.1);
            TrendPoint {
                date,
                price: round2(baseline.avg_price * noise * seasonal),
            }
        })
        .collect();

    let change_pct = match (points.first(), points.last()) {
        (Some(first), Some(last)) => percent_change(first.price, last.price),
        _ => 0.0,
    };

    TrendSeries {
        crop_id: baseline.id.clone(),
        period,
        points,
        change_pct: round2(change_pct),
        direction: TrendDirection::classify(change_pct),
    }
}

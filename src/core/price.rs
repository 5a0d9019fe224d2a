//! Market price abstractions and core types

use crate::core::catalog::Market;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

const ALL: &str = "all";

/// Optional filters for a price request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceQuery {
    pub crop_id: Option<String>,
    pub market: Option<String>,
    pub quality: Option<String>,
}

impl PriceQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_crop(crop_id: &str) -> Self {
        Self {
            crop_id: Some(crop_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_market(mut self, market: &str) -> Self {
        self.market = Some(market.to_string());
        self
    }

    pub fn with_quality(mut self, quality: &str) -> Self {
        self.quality = Some(quality.to_string());
        self
    }

    /// `crop-market-quality`, with `all` standing in for an absent filter.
    pub fn cache_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.crop_id.as_deref().unwrap_or(ALL),
            self.market.as_deref().unwrap_or(ALL),
            self.quality.as_deref().unwrap_or(ALL)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    /// More than 5% either way is a move; anything in between is flat.
    pub fn classify(change_pct: f64) -> Self {
        if change_pct > 5.0 {
            TrendDirection::Up
        } else if change_pct < -5.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        }
    }

    /// Translation key for the direction label.
    pub fn label_key(&self) -> &'static str {
        match self {
            TrendDirection::Up => "trend.up",
            TrendDirection::Down => "trend.down",
            TrendDirection::Flat => "trend.flat",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Up => "▲",
            TrendDirection::Down => "▼",
            TrendDirection::Flat => "▬",
        }
    }
}

impl Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TrendDirection::Up => "up",
                TrendDirection::Down => "down",
                TrendDirection::Flat => "flat",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub crop_id: String,
    /// Translation key for the crop name.
    pub crop_name: String,
    pub unit: String,
    pub market: Option<String>,
    pub quality: Option<String>,
    pub price: f64,
    /// Change against the baseline average the price was generated from.
    pub change_pct: f64,
    pub trend: TrendDirection,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendPeriod {
    SevenDays,
    ThirtyDays,
    NinetyDays,
}

impl TrendPeriod {
    pub fn days(&self) -> u32 {
        match self {
            TrendPeriod::SevenDays => 7,
            TrendPeriod::ThirtyDays => 30,
            TrendPeriod::NinetyDays => 90,
        }
    }
}

impl Display for TrendPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d", self.days())
    }
}

impl FromStr for TrendPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "7d" => Ok(TrendPeriod::SevenDays),
            "30d" => Ok(TrendPeriod::ThirtyDays),
            "90d" => Ok(TrendPeriod::NinetyDays),
            _ => Err(anyhow::anyhow!("Invalid trend period: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub crop_id: String,
    pub period: TrendPeriod,
    pub points: Vec<TrendPoint>,
    pub change_pct: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buyer {
    pub name: String,
    pub location: String,
    pub crop_id: String,
    pub offered_price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOffer {
    pub crop_id: String,
    pub quantity: f64,
    pub price: f64,
    pub quality: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Open,
    Sold,
    Withdrawn,
}

impl Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                OfferStatus::Open => "open",
                OfferStatus::Sold => "sold",
                OfferStatus::Withdrawn => "withdrawn",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellingOffer {
    pub id: String,
    pub crop_id: String,
    pub quantity: f64,
    pub price: f64,
    pub quality: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

/// Remote market endpoints. Implementations may be slow or fail; callers
/// fall back to local data.
#[async_trait]
pub trait MarketApi: Send + Sync {
    async fn fetch_prices(&self, query: &PriceQuery) -> Result<Vec<PriceRecord>>;
    async fn fetch_markets(&self) -> Result<Vec<Market>>;
    async fn fetch_trends(&self, crop_id: &str, period: TrendPeriod) -> Result<TrendSeries>;
    async fn search_buyers(&self, crop_id: &str) -> Result<Vec<Buyer>>;
    async fn create_offer(&self, offer: &NewOffer) -> Result<SellingOffer>;
}

//! Price alert rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn label_key(&self) -> &'static str {
        match self {
            AlertCondition::Above => "alerts.above",
            AlertCondition::Below => "alerts.below",
        }
    }
}

impl Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AlertCondition::Above => "above",
                AlertCondition::Below => "below",
            }
        )
    }
}

impl FromStr for AlertCondition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            _ => Err(anyhow::anyhow!("Invalid alert condition: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: String,
    pub crop_id: String,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PriceAlert {
    pub fn is_met(&self, price: f64) -> bool {
        match self.condition {
            AlertCondition::Above => price >= self.target_price,
            AlertCondition::Below => price <= self.target_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    pub alert: PriceAlert,
    pub price: f64,
}

/// Fires every active alert whose condition holds for its crop's current
/// price. Fired alerts are deactivated in place so they trigger only once.
pub fn evaluate(alerts: &mut [PriceAlert], prices: &HashMap<String, f64>) -> Vec<TriggeredAlert> {
    let mut triggered = Vec::new();
    for alert in alerts.iter_mut().filter(|a| a.active) {
        if let Some(&price) = prices.get(&alert.crop_id) {
            if alert.is_met(price) {
                alert.active = false;
                triggered.push(TriggeredAlert {
                    alert: alert.clone(),
                    price,
                });
            }
        }
    }
    triggered
}

//! Built-in crop baselines and market directory

use serde::{Deserialize, Serialize};

/// Running average and observed range of a crop's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropBaseline {
    pub id: String,
    /// Translation key for the crop name.
    pub name: String,
    pub unit: String,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub quality_grades: Vec<String>,
}

impl CropBaseline {
    /// Folds a new observation in: the average moves halfway towards it and
    /// the range widens to include it. The range never narrows.
    pub fn observe(&mut self, price: f64) {
        self.avg_price = (self.avg_price + price) / 2.0;
        if price < self.min_price {
            self.min_price = price;
        }
        if price > self.max_price {
            self.max_price = price;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub name: String,
    pub region: String,
}

/// The set of baselines a market service prices against.
#[derive(Debug, Clone)]
pub struct BaselineBook {
    crops: Vec<CropBaseline>,
}

impl BaselineBook {
    pub fn new(crops: Vec<CropBaseline>) -> Self {
        Self { crops }
    }

    pub fn get(&self, id: &str) -> Option<&CropBaseline> {
        self.crops.iter().find(|c| c.id == id)
    }

    pub fn all(&self) -> &[CropBaseline] {
        &self.crops
    }

    pub fn ids(&self) -> Vec<String> {
        self.crops.iter().map(|c| c.id.clone()).collect()
    }

    /// Baselines matching an optional crop filter.
    pub fn matching(&self, crop_id: Option<&str>) -> Vec<CropBaseline> {
        self.crops
            .iter()
            .filter(|c| crop_id.is_none_or(|id| c.id == id))
            .cloned()
            .collect()
    }

    /// Records an observed price. Returns false for an unknown crop.
    pub fn observe(&mut self, id: &str, price: f64) -> bool {
        match self.crops.iter_mut().find(|c| c.id == id) {
            Some(crop) => {
                crop.observe(price);
                true
            }
            None => false,
        }
    }
}

impl Default for BaselineBook {
    fn default() -> Self {
        Self::new(default_crops())
    }
}

fn crop(id: &str, unit: &str, avg: f64, min: f64, max: f64) -> CropBaseline {
    CropBaseline {
        id: id.to_string(),
        name: format!("crops.{id}"),
        unit: unit.to_string(),
        avg_price: avg,
        min_price: min,
        max_price: max,
        quality_grades: vec![
            "premium".to_string(),
            "standard".to_string(),
            "economy".to_string(),
        ],
    }
}

pub fn default_crops() -> Vec<CropBaseline> {
    vec![
        crop("wheat", "ton", 320.0, 280.0, 360.0),
        crop("rice", "ton", 540.0, 480.0, 610.0),
        crop("maize", "ton", 260.0, 220.0, 300.0),
        crop("barley", "ton", 240.0, 210.0, 275.0),
        crop("sorghum", "ton", 230.0, 200.0, 265.0),
        crop("tomato", "kg", 1.2, 0.8, 1.7),
        crop("potato", "kg", 0.6, 0.4, 0.85),
        crop("onion", "kg", 0.7, 0.45, 1.0),
        crop("dates", "kg", 4.5, 3.2, 6.0),
        crop("coffee", "kg", 5.8, 4.6, 7.2),
    ]
}

fn market(id: &str, name: &str, region: &str) -> Market {
    Market {
        id: id.to_string(),
        name: name.to_string(),
        region: region.to_string(),
    }
}

pub fn default_markets() -> Vec<Market> {
    vec![
        market("central", "Central Wholesale Market", "Capital"),
        market("north", "Northern Grain Exchange", "North"),
        market("south", "Southern Produce Market", "South"),
        market("coast", "Coastal Port Market", "Coast"),
        market("highland", "Highland Farmers Market", "Highlands"),
    ]
}

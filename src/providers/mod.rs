pub mod simulated;

pub use simulated::SimulatedMarketApi;

pub mod i18n;
pub mod market;
pub mod setup;
pub mod trade;
pub mod ui;

use super::ui;
use crate::App;
use crate::core::alerts::{AlertCondition, TriggeredAlert};
use crate::core::i18n::Translator;
use crate::core::market::MarketEvent;
use crate::core::price::NewOffer;
use crate::providers::simulated::api_call_log;
use anyhow::Result;
use comfy_table::Cell;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

fn crop_label(t: &Translator, crop_id: &str) -> String {
    t.resolve(&format!("crops.{crop_id}"), crop_id, &[])
}

fn triggered_line(t: &Translator, triggered: &TriggeredAlert) -> String {
    let alert = &triggered.alert;
    t.resolve(
        "alerts.triggered",
        "",
        &[
            ("crop", &crop_label(t, &alert.crop_id)),
            ("price", &format!("{:.2}", triggered.price)),
            ("condition", &t.t(alert.condition.label_key())),
            ("target", &format!("{:.2}", alert.target_price)),
        ],
    )
}

pub async fn offer(app: &App, offer: NewOffer) -> Result<()> {
    let t = &app.translator;
    let receipt = app.market.create_offer(offer).await?;
    println!(
        "{}",
        t.resolve(
            "offers.created",
            "",
            &[
                ("id", &receipt.offer.id),
                ("crop", &crop_label(t, &receipt.offer.crop_id)),
            ],
        )
    );
    println!(
        "{}",
        ui::style_text(
            &t.resolve(
                "offers.points_awarded",
                "",
                &[
                    ("points", &receipt.points_awarded.to_string()),
                    ("total", &receipt.total_points.to_string()),
                ],
            ),
            ui::StyleType::Value
        )
    );
    Ok(())
}

pub fn offers(app: &App) -> Result<()> {
    let t = &app.translator;
    let offers = app.market.offers();
    if offers.is_empty() {
        println!("{}", t.t("offers.none"));
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&t.t("offers.id")),
        ui::header_cell(&t.t("market.crop")),
        ui::header_cell(&t.t("offers.quantity")),
        ui::header_cell(&t.t("offers.price")),
        ui::header_cell(&t.t("market.quality")),
        ui::header_cell(&t.t("offers.status")),
    ]);
    let all = t.t("market.all");
    for offer in &offers {
        let quality = offer
            .quality
            .as_ref()
            .map(|q| t.resolve(&format!("quality.{q}"), q, &[]));
        table.add_row(vec![
            Cell::new(&offer.id),
            Cell::new(crop_label(t, &offer.crop_id)),
            ui::amount_cell(offer.quantity),
            ui::amount_cell(offer.price),
            ui::optional_cell(quality.as_deref(), &all),
            Cell::new(offer.status.to_string()),
        ]);
    }
    println!(
        "{}\n",
        ui::style_text(&t.t("offers.title"), ui::StyleType::Title)
    );
    println!("{table}");
    Ok(())
}

pub fn alert(app: &App, crop: &str, price: f64, condition: AlertCondition) -> Result<()> {
    let t = &app.translator;
    let alert = app.market.add_alert(crop, price, condition)?;
    println!(
        "{}",
        t.resolve(
            "alerts.created",
            "",
            &[
                ("crop", &crop_label(t, &alert.crop_id)),
                ("price", &format!("{:.2}", alert.target_price)),
            ],
        )
    );
    Ok(())
}

pub fn alerts(app: &App) -> Result<()> {
    let t = &app.translator;
    let alerts = app.market.alerts();
    if alerts.is_empty() {
        println!("{}", t.t("alerts.none"));
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&t.t("market.crop")),
        ui::header_cell(&t.t("alerts.condition")),
        ui::header_cell(&t.t("alerts.target")),
        ui::header_cell(&t.t("offers.status")),
    ]);
    for alert in &alerts {
        let status = if alert.active {
            t.t("alerts.active")
        } else {
            t.t("alerts.inactive")
        };
        table.add_row(vec![
            Cell::new(crop_label(t, &alert.crop_id)),
            Cell::new(t.t(alert.condition.label_key())),
            ui::amount_cell(alert.target_price),
            ui::status_cell(alert.active, &status),
        ]);
    }
    println!(
        "{}\n",
        ui::style_text(&t.t("alerts.title"), ui::StyleType::Title)
    );
    println!("{table}");
    Ok(())
}

/// Runs the background refresh loop, printing each refresh and triggered
/// alert. Stops after `ticks` refreshes, or on Ctrl-C when `ticks` is 0.
pub async fn watch(app: &App, ticks: usize) -> Result<()> {
    let t = &app.translator;
    let (tx, mut rx) = mpsc::channel(16);
    let handle = Arc::clone(&app.market).spawn_background(
        app.config.market.refresh_interval(),
        app.config.market.alert_interval(),
        tx,
    );

    let total = if ticks == 0 {
        "∞".to_string()
    } else {
        ticks.to_string()
    };
    let mut seen = 0usize;
    loop {
        let event = tokio::select! {
            event = rx.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                None
            }
        };
        match event {
            Some(MarketEvent::Refreshed { crops }) => {
                seen += 1;
                println!(
                    "{} {}",
                    ui::style_text(
                        &t.resolve(
                            "watch.tick",
                            "",
                            &[("tick", &seen.to_string()), ("total", &total)]
                        ),
                        ui::StyleType::Subtle
                    ),
                    t.resolve("market.refreshed", "", &[("count", &crops.to_string())])
                );
                if ticks > 0 && seen >= ticks {
                    break;
                }
            }
            Some(MarketEvent::AlertTriggered(triggered)) => {
                println!(
                    "{}",
                    ui::style_text(&triggered_line(t, &triggered), ui::StyleType::Label)
                );
            }
            None => break,
        }
    }

    handle.abort();
    Ok(())
}

pub fn api_log(app: &App) -> Result<()> {
    let t = &app.translator;
    let log = api_call_log(app.store.as_ref());
    if log.is_empty() {
        println!("{}", t.t("api_log.none"));
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&t.t("api_log.endpoint")),
        ui::header_cell(&t.t("api_log.time")),
        ui::header_cell(&t.t("api_log.status")),
        ui::header_cell(&t.t("api_log.latency")),
    ]);
    let (ok, failed) = (t.t("api_log.ok"), t.t("api_log.failed"));
    for entry in log.iter().rev() {
        table.add_row(vec![
            Cell::new(&entry.endpoint),
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            ui::status_cell(
                entry.success,
                if entry.success { ok.as_str() } else { failed.as_str() },
            ),
            Cell::new(entry.latency_ms),
        ]);
    }
    println!(
        "{}\n",
        ui::style_text(&t.t("api_log.title"), ui::StyleType::Title)
    );
    println!("{table}");
    Ok(())
}

pub fn points(app: &App) -> Result<()> {
    let t = &app.translator;
    let points = app.market.user_points().to_string();
    println!(
        "{}",
        ui::style_text(
            &t.resolve("points.total", "", &[("points", &points)]),
            ui::StyleType::Value
        )
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::PriceAlert;
    use crate::core::config::AppConfig;
    use crate::store::KeyValueStore;
    use crate::store::memory::MemoryStore;
    use chrono::Utc;

    #[test]
    fn test_triggered_line_is_localized() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let t = Translator::new(&AppConfig::default(), store).unwrap();
        let triggered = TriggeredAlert {
            alert: PriceAlert {
                id: "ALR-1".to_string(),
                crop_id: "wheat".to_string(),
                target_price: 300.0,
                condition: AlertCondition::Above,
                active: false,
                created_at: Utc::now(),
            },
            price: 352.5,
        };
        assert_eq!(
            triggered_line(&t, &triggered),
            "Wheat is now 352.50 (above 300.00)"
        );
    }
}

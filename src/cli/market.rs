use super::ui;
use crate::App;
use crate::core::i18n::Translator;
use crate::core::price::{PriceQuery, PriceRecord, TrendDirection, TrendPeriod, TrendSeries};
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;

/// A price record with its labels resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub crop: String,
    pub market: Option<String>,
    pub quality: Option<String>,
    pub price: f64,
    pub unit: String,
    pub change_pct: f64,
    pub trend: TrendDirection,
    pub trend_label: String,
}

pub fn price_rows(records: &[PriceRecord], translator: &Translator) -> Vec<PriceRow> {
    records
        .iter()
        .map(|record| PriceRow {
            crop: translator.resolve(&record.crop_name, &record.crop_id, &[]),
            market: record.market.clone(),
            quality: record
                .quality
                .as_ref()
                .map(|q| translator.resolve(&format!("quality.{q}"), q, &[])),
            price: record.price,
            unit: record.unit.clone(),
            change_pct: record.change_pct,
            trend: record.trend,
            trend_label: translator.t(record.trend.label_key()),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendSummary {
    pub crop: String,
    pub period: TrendPeriod,
    pub first: Option<f64>,
    pub last: Option<f64>,
    pub points: usize,
    pub change_pct: f64,
    pub direction: TrendDirection,
    pub direction_label: String,
}

pub fn trend_summary(series: &TrendSeries, translator: &Translator) -> TrendSummary {
    let crop_key = format!("crops.{}", series.crop_id);
    TrendSummary {
        crop: translator.resolve(&crop_key, &series.crop_id, &[]),
        period: series.period,
        first: series.points.first().map(|p| p.price),
        last: series.points.last().map(|p| p.price),
        points: series.points.len(),
        change_pct: series.change_pct,
        direction: series.direction,
        direction_label: translator.t(series.direction.label_key()),
    }
}

pub async fn prices(app: &App, query: &PriceQuery) -> Result<()> {
    let t = &app.translator;
    let records = app.market.get_prices(query).await;
    if records.is_empty() {
        println!("{}", t.t("market.no_data"));
        return Ok(());
    }

    let all = t.t("market.all");
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&t.t("market.crop")),
        ui::header_cell(&t.t("market.market")),
        ui::header_cell(&t.t("market.quality")),
        ui::header_cell(&format!("{} ({})", t.t("market.price"), app.config.currency)),
        ui::header_cell(&t.t("market.unit")),
        ui::header_cell(&t.t("market.change")),
        ui::header_cell(&t.t("market.trend")),
    ]);
    let direction = t.active_language().text_direction;
    for row in price_rows(&records, t) {
        table.add_row(vec![
            ui::directed_cell(&row.crop, direction),
            ui::optional_cell(row.market.as_deref(), &all),
            ui::optional_cell(row.quality.as_deref(), &all),
            ui::amount_cell(row.price),
            Cell::new(row.unit),
            ui::change_cell(row.change_pct),
            ui::trend_cell(row.trend, &row.trend_label),
        ]);
    }

    println!(
        "{}\n",
        ui::style_text(&t.t("market.title"), ui::StyleType::Title)
    );
    println!("{table}");
    Ok(())
}

/// Shows one crop's full series, or a summary line per crop when no crop is
/// given.
pub async fn trends(app: &App, crop: Option<&str>, period: TrendPeriod) -> Result<()> {
    let t = &app.translator;
    match crop {
        Some(crop_id) => {
            let series = app.market.get_price_trends(crop_id, period).await?;
            let summary = trend_summary(&series, t);
            let period_label = period.to_string();
            println!(
                "{}\n",
                ui::style_text(
                    &t.resolve(
                        "trend.title",
                        "",
                        &[("crop", &summary.crop), ("period", &period_label)]
                    ),
                    ui::StyleType::Title
                )
            );

            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell(&t.t("trend.date")),
                ui::header_cell(&t.t("market.price")),
            ]);
            for point in &series.points {
                table.add_row(vec![
                    Cell::new(point.date.format("%Y-%m-%d").to_string()),
                    ui::amount_cell(point.price),
                ]);
            }
            println!("{table}");
            println!(
                "\n{}: {} {}",
                ui::style_text(&t.t("market.change"), ui::StyleType::Label),
                ui::style_text(&format!("{:+.2}%", summary.change_pct), ui::StyleType::Value),
                ui::style_text(&summary.direction_label, ui::StyleType::Subtle)
            );
        }
        None => {
            let ids: Vec<String> = app.market.baselines().into_iter().map(|b| b.id).collect();
            let pb = ui::new_progress_bar(ids.len() as u64);
            pb.set_message(t.t("common.loading"));

            let results = join_all(ids.iter().map(|id| {
                let pb = pb.clone();
                async move {
                    let result = app.market.get_price_trends(id, period).await;
                    pb.inc(1);
                    result
                }
            }))
            .await;
            pb.finish_and_clear();

            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell(&t.t("market.crop")),
                ui::header_cell(&t.t("trend.first")),
                ui::header_cell(&t.t("trend.last")),
                ui::header_cell(&t.t("trend.points")),
                ui::header_cell(&t.t("market.change")),
                ui::header_cell(&t.t("market.trend")),
            ]);
            for series in results.into_iter().collect::<Result<Vec<_>>>()? {
                let summary = trend_summary(&series, t);
                table.add_row(vec![
                    Cell::new(&summary.crop),
                    summary.first.map_or(Cell::new("-"), ui::amount_cell),
                    summary.last.map_or(Cell::new("-"), ui::amount_cell),
                    Cell::new(summary.points),
                    ui::change_cell(summary.change_pct),
                    ui::trend_cell(summary.direction, &summary.direction_label),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

pub async fn markets(app: &App) -> Result<()> {
    let t = &app.translator;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell(&t.t("market.market")),
        ui::header_cell(&t.t("market.region")),
    ]);
    for market in app.market.get_markets().await {
        table.add_row(vec![
            Cell::new(market.id),
            Cell::new(market.name),
            Cell::new(market.region),
        ]);
    }
    println!(
        "{}\n",
        ui::style_text(&t.t("market.markets_title"), ui::StyleType::Title)
    );
    println!("{table}");
    Ok(())
}

pub async fn buyers(app: &App, crop: &str) -> Result<()> {
    let t = &app.translator;
    let buyers = app.market.search_buyers(crop).await?;
    let crop_name = t.resolve(&format!("crops.{crop}"), crop, &[]);
    println!(
        "{}\n",
        ui::style_text(
            &t.resolve("buyers.title", "", &[("crop", &crop_name)]),
            ui::StyleType::Title
        )
    );
    if buyers.is_empty() {
        println!("{}", t.t("buyers.none"));
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(&t.t("buyers.name")),
        ui::header_cell(&t.t("buyers.location")),
        ui::header_cell(&t.t("buyers.offered_price")),
        ui::header_cell(&t.t("buyers.quantity")),
    ]);
    for buyer in buyers {
        table.add_row(vec![
            Cell::new(buyer.name),
            Cell::new(buyer.location),
            ui::amount_cell(buyer.offered_price),
            ui::amount_cell(buyer.quantity),
        ]);
    }
    println!("{table}");
    Ok(())
}

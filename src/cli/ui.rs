use crate::core::language::TextDirection;
use crate::core::price::TrendDirection;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Value,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Value => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned cell for a two-decimal amount.
pub fn amount_cell(value: f64) -> Cell {
    Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
}

/// Formats an `Option<String>`; `None` renders as the given placeholder.
pub fn optional_cell(value: Option<&str>, placeholder: &str) -> Cell {
    match value {
        Some(v) => Cell::new(v),
        None => Cell::new(placeholder).fg(Color::DarkGrey),
    }
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(change: f64) -> Cell {
    let text = format!("{change:+.2}%");
    if change >= 0.0 {
        Cell::new(text)
            .fg(Color::Green)
            .set_alignment(CellAlignment::Right)
    } else {
        Cell::new(text)
            .fg(Color::Red)
            .set_alignment(CellAlignment::Right)
    }
}

/// Arrow plus translated label, colored by direction.
pub fn trend_cell(direction: TrendDirection, label: &str) -> Cell {
    let color = match direction {
        TrendDirection::Up => Color::Green,
        TrendDirection::Down => Color::Red,
        TrendDirection::Flat => Color::DarkGrey,
    };
    Cell::new(format!("{} {label}", direction.arrow())).fg(color)
}

/// Right-aligns content for right-to-left languages.
pub fn directed_cell(text: &str, direction: TextDirection) -> Cell {
    let alignment = match direction {
        TextDirection::Ltr => CellAlignment::Left,
        TextDirection::Rtl => CellAlignment::Right,
    };
    Cell::new(text).set_alignment(alignment)
}

pub fn status_cell(ok: bool, label: &str) -> Cell {
    Cell::new(label).fg(if ok { Color::Green } else { Color::Red })
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(bar_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(bar_style.progress_chars("#>-"));
    }
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

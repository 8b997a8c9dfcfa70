use comfy_table::{Attribute, Cell, Color, Table};

use crate::billing;
use crate::model::RevenuePoint;

pub const BAR_WIDTH: usize = 40;

/// Bar length for `value` when `max` fills `width` cells. Any non-zero value gets at least one cell.
pub fn bar_len(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    let scaled = ((value / max) * width as f64).round() as usize;
    scaled.clamp(1, width)
}

fn bar(value: f64, max: f64) -> String {
    "█".repeat(bar_len(value, max, BAR_WIDTH))
}

pub fn amount_chart(points: &[RevenuePoint]) -> Table {
    let max = points.iter().map(|p| p.amount).fold(0.0, f64::max);
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Period"), Cell::new("Revenue"), Cell::new("")]);

    for point in points {
        table.add_row(vec![
            Cell::new(&point.period),
            Cell::new(billing::format_money(point.amount)),
            Cell::new(bar(point.amount, max)).fg(Color::Rgb { r: 4, g: 120, b: 87 }),
        ]);
    }

    let total: f64 = points.iter().map(|p| p.amount).sum();
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(billing::format_money(total)).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);
    table
}

pub fn count_chart(points: &[RevenuePoint]) -> Table {
    let max = points.iter().map(|p| p.quotation_count).max().unwrap_or(0) as f64;
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Period"), Cell::new("Quotations"), Cell::new("")]);

    for point in points {
        table.add_row(vec![
            Cell::new(&point.period),
            Cell::new(point.quotation_count),
            Cell::new(bar(point.quotation_count as f64, max)).fg(Color::Rgb { r: 29, g: 78, b: 216 }),
        ]);
    }

    let total: u64 = points.iter().map(|p| p.quotation_count).sum();
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(total).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);
    table
}

use tracing::debug;

use super::Desk;
use crate::errors::Result;
use crate::revenue::{amount_chart, count_chart};
use crate::session::Route;

pub fn run(desk: &Desk, year: Option<i32>) -> Result<()> {
    desk.guard(Route::Revenue)?;
    let points = desk.api.revenue(year)?;
    debug!(points = points.len(), ?year, "revenue fetched");

    let title = match year {
        Some(y) => format!("📊 Revenue {}", y),
        None => "📊 Revenue".to_string(),
    };
    println!("\n{}", title);
    if points.is_empty() {
        println!("No revenue recorded.");
        return Ok(());
    }

    println!("\nAmount");
    println!("{}", amount_chart(&points));
    println!("\nQuotations");
    println!("{}", count_chart(&points));
    Ok(())
}

//! Money arithmetic shared by quotations, bills and salary slips.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{LeaveRequest, LeaveStatus, QuotationItem};

/// Integrated GST applied to every bill.
pub const IGST_RATE: f64 = 0.18;

/// Round to paise.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn line_amount(quantity: f64, rate: f64) -> f64 {
    round2(quantity * rate)
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct BillTotals {
    pub taxable_value: f64,
    pub igst: f64,
    pub grand_total: f64,
}

impl BillTotals {
    /// Item totals are recomputed from quantity and rate; the stored `amount`
    /// of a fetched quotation is not trusted.
    pub fn from_items(items: &[QuotationItem]) -> Self {
        let taxable_value = round2(items.iter().map(|i| line_amount(i.quantity, i.rate)).sum());
        let igst = round2(taxable_value * IGST_RATE);
        Self {
            taxable_value,
            igst,
            grand_total: round2(taxable_value + igst),
        }
    }
}

pub fn quotation_total(items: &[QuotationItem]) -> f64 {
    round2(items.iter().map(|i| line_amount(i.quantity, i.rate)).sum())
}

pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        return 0;
    }
    (end - start).num_days() + 1
}

/// Approved leave days of one employee falling inside the given month.
pub fn leave_days_in_month(requests: &[LeaveRequest], employee_id: u64, year: i32, month: u32) -> i64 {
    let Some(month_start) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let Some(month_end) = next_month.and_then(|d| d.pred_opt()) else {
        return 0;
    };

    requests
        .iter()
        .filter(|r| r.employee_id == employee_id && r.status == LeaveStatus::Approved)
        .map(|r| inclusive_days(r.start_date.max(month_start), r.end_date.min(month_end)))
        .sum()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(a), Some(b)) => (b - a).num_days() as u32,
        _ => 0,
    }
}

/// `1234567.5` -> `12,34,567.50` (lakh/crore grouping).
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", round2(value).abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = if int_part.len() <= 3 {
        int_part.to_string()
    } else {
        let (head, last3) = int_part.split_at(int_part.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (h, t) = rest.split_at(rest.len() - 2);
            groups.push(t);
            rest = h;
        }
        if !rest.is_empty() {
            groups.push(rest);
        }
        groups.reverse();
        format!("{},{}", groups.join(","), last3)
    };

    let sign = if value < 0.0 && round2(value) != 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten",
    "Eleven", "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];
const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn below_hundred(n: u64) -> String {
    if n < 20 {
        ONES[n as usize].to_string()
    } else if n % 10 == 0 {
        TENS[(n / 10) as usize].to_string()
    } else {
        format!("{} {}", TENS[(n / 10) as usize], ONES[(n % 10) as usize])
    }
}

fn below_thousand(n: u64) -> String {
    let hundreds = n / 100;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, r) => below_hundred(r),
        (h, 0) => format!("{} Hundred", ONES[h as usize]),
        (h, r) => format!("{} Hundred {}", ONES[h as usize], below_hundred(r)),
    }
}

fn indian_words(n: u64) -> String {
    let crore = n / 10_000_000;
    let lakh = (n % 10_000_000) / 100_000;
    let thousand = (n % 100_000) / 1000;
    let rest = n % 1000;

    let mut parts = Vec::new();
    if crore > 0 {
        parts.push(format!("{} Crore", indian_words(crore)));
    }
    if lakh > 0 {
        parts.push(format!("{} Lakh", below_hundred(lakh)));
    }
    if thousand > 0 {
        parts.push(format!("{} Thousand", below_hundred(thousand)));
    }
    if rest > 0 {
        parts.push(below_thousand(rest));
    }
    parts.join(" ")
}

/// `295.0` -> `Rupees Two Hundred Ninety Five Only`
pub fn amount_in_words(amount: f64) -> String {
    let total_paise = (amount.abs() * 100.0).round() as u64;
    let rupees = total_paise / 100;
    let paise = total_paise % 100;

    let rupee_words = if rupees == 0 { "Zero".to_string() } else { indian_words(rupees) };
    let sign = if amount < 0.0 && total_paise > 0 { "Minus " } else { "" };
    let mut words = format!("{}Rupees {}", sign, rupee_words);
    if paise > 0 {
        words.push_str(&format!(" and {} Paise", below_hundred(paise)));
    }
    words.push_str(" Only");
    words
}

/// `(2024, 3)` -> `March 2024`
pub fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{}-{:02}", year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64, rate: f64) -> QuotationItem {
        QuotationItem::new("Part".into(), String::new(), String::new(), quantity, "nos".into(), rate)
    }

    fn leave(employee_id: u64, start: (i32, u32, u32), end: (i32, u32, u32), status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id,
            employee_name: None,
            subject: "Leave".into(),
            content: String::new(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            status,
        }
    }

    #[test]
    fn amount_is_quantity_times_rate() {
        assert_eq!(line_amount(10.0, 25.0), 250.0);
        assert_eq!(line_amount(3.0, 0.1), 0.3);
    }

    #[test]
    fn bill_totals_add_eighteen_percent_igst() {
        let totals = BillTotals::from_items(&[item(10.0, 25.0), item(2.0, 1200.0)]);
        assert_eq!(totals.taxable_value, 2650.0);
        assert_eq!(totals.igst, 477.0);
        assert_eq!(totals.grand_total, 3127.0);
    }

    #[test]
    fn bill_totals_ignore_stale_stored_amounts() {
        let mut stale = item(4.0, 50.0);
        stale.amount = 999.0;
        let totals = BillTotals::from_items(&[stale]);
        assert_eq!(totals.taxable_value, 200.0);
    }

    #[test]
    fn empty_bill_is_zero() {
        let totals = BillTotals::from_items(&[]);
        assert_eq!(totals.grand_total, 0.0);
    }

    #[test]
    fn money_uses_indian_grouping() {
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(999.5), "999.50");
        assert_eq!(format_money(1000.0), "1,000.00");
        assert_eq!(format_money(125000.0), "1,25,000.00");
        assert_eq!(format_money(1234567.5), "12,34,567.50");
        assert_eq!(format_money(-45000.0), "-45,000.00");
    }

    #[test]
    fn words_for_common_amounts() {
        assert_eq!(amount_in_words(295.0), "Rupees Two Hundred Ninety Five Only");
        assert_eq!(amount_in_words(0.0), "Rupees Zero Only");
        assert_eq!(
            amount_in_words(125000.5),
            "Rupees One Lakh Twenty Five Thousand and Fifty Paise Only"
        );
        assert_eq!(
            amount_in_words(30_500_010.0),
            "Rupees Three Crore Five Lakh Ten Only"
        );
        assert_eq!(amount_in_words(1100.0), "Rupees One Thousand One Hundred Only");
        assert_eq!(amount_in_words(-1500.0), "Minus Rupees One Thousand Five Hundred Only");
        assert_eq!(amount_in_words(-0.001), "Rupees Zero Only");
    }

    #[test]
    fn leave_days_clip_to_month() {
        let requests = vec![
            leave(7, (2024, 2, 27), (2024, 3, 2), LeaveStatus::Approved),
            leave(7, (2024, 3, 10), (2024, 3, 11), LeaveStatus::Approved),
            leave(7, (2024, 3, 20), (2024, 3, 22), LeaveStatus::Rejected),
            leave(8, (2024, 3, 1), (2024, 3, 31), LeaveStatus::Approved),
        ];
        assert_eq!(leave_days_in_month(&requests, 7, 2024, 3), 4);
        assert_eq!(leave_days_in_month(&requests, 7, 2024, 2), 3);
        assert_eq!(leave_days_in_month(&requests, 8, 2024, 3), 31);
    }

    #[test]
    fn inverted_range_has_no_days() {
        let a = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(inclusive_days(a, b), 0);
        assert_eq!(inclusive_days(b, a), 2);
    }

    #[test]
    fn days_in_february() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
    }
}

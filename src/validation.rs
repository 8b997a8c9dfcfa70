use chrono::NaiveDate;
use regex::Regex;

use crate::errors::{AppError, Result};
use crate::model::QuotationItem;

pub struct Validator;

impl Validator {
    /// Fails on the first field that is empty after trimming.
    pub fn require(fields: &[(&str, &str)]) -> Result<()> {
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", label)));
            }
        }
        Ok(())
    }

    pub fn validate_email(email: &str) -> Result<()> {
        let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .map_err(|e| AppError::Validation(format!("Regex error: {}", e)))?;

        if !email_regex.is_match(email.trim()) {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        Ok(())
    }

    /// Ten digit mobile number, optionally prefixed with +91.
    pub fn validate_phone(phone: &str) -> Result<()> {
        let phone_regex = Regex::new(r"^(\+91[\- ]?)?[6-9]\d{9}$")
            .map_err(|e| AppError::Validation(format!("Regex error: {}", e)))?;

        if !phone_regex.is_match(phone.trim()) {
            return Err(AppError::Validation("Phone must be a 10 digit mobile number".to_string()));
        }
        Ok(())
    }

    pub fn validate_ifsc(ifsc: &str) -> Result<()> {
        let ifsc_regex = Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$")
            .map_err(|e| AppError::Validation(format!("Regex error: {}", e)))?;

        if !ifsc_regex.is_match(ifsc.trim()) {
            return Err(AppError::Validation("Invalid IFSC code".to_string()));
        }
        Ok(())
    }

    pub fn validate_password(password: &str) -> Result<()> {
        if password.len() < 6 {
            return Err(AppError::Validation("Password must be at least 6 characters long".to_string()));
        }
        Ok(())
    }

    pub fn validate_percentage(value: u64) -> Result<()> {
        if value > 100 {
            return Err(AppError::Validation("Progress must be between 0 and 100".to_string()));
        }
        Ok(())
    }

    pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
        if end < start {
            return Err(AppError::Validation("End date cannot be before start date".to_string()));
        }
        Ok(())
    }

    pub fn validate_amount(label: &str, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::Validation(format!("{} must be a non-negative number", label)));
        }
        Ok(())
    }

    pub fn validate_item(item: &QuotationItem) -> Result<()> {
        Self::require(&[("Product name", item.product_name.as_str()), ("Unit", item.unit.as_str())])?;
        if item.quantity <= 0.0 {
            return Err(AppError::Validation("Quantity must be greater than zero".to_string()));
        }
        Self::validate_amount("Rate", item.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_blank_fields() {
        let err = Validator::require(&[("Client name", "Acme"), ("Project name", "   ")]).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Project name is required");
    }

    #[test]
    fn require_accepts_filled_fields() {
        assert!(Validator::require(&[("Name", "x"), ("Subject", "y")]).is_ok());
    }

    #[test]
    fn phone_numbers() {
        assert!(Validator::validate_phone("9876543210").is_ok());
        assert!(Validator::validate_phone("+91 9876543210").is_ok());
        assert!(Validator::validate_phone("12345").is_err());
    }

    #[test]
    fn ifsc_codes() {
        assert!(Validator::validate_ifsc("HDFC0001234").is_ok());
        assert!(Validator::validate_ifsc("HDFC1001234").is_err());
    }

    #[test]
    fn emails() {
        assert!(Validator::validate_email("accounts@shree.in").is_ok());
        assert!(Validator::validate_email("accounts@").is_err());
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(Validator::validate_password("abc12").is_err());
        assert!(Validator::validate_password("abc123").is_ok());
    }

    #[test]
    fn percentage_bounds() {
        assert!(Validator::validate_percentage(100).is_ok());
        assert!(Validator::validate_percentage(101).is_err());
    }

    #[test]
    fn date_range_order() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(Validator::validate_date_range(b, a).is_ok());
        assert!(Validator::validate_date_range(a, a).is_ok());
        assert!(Validator::validate_date_range(a, b).is_err());
    }

    #[test]
    fn items_need_quantity_and_unit() {
        let mut item = QuotationItem::new("Bush".into(), "".into(), "".into(), 0.0, "nos".into(), 10.0);
        assert!(Validator::validate_item(&item).is_err());
        item.quantity = 2.0;
        assert!(Validator::validate_item(&item).is_ok());
        item.unit = " ".into();
        assert!(Validator::validate_item(&item).is_err());
    }
}

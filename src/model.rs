use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::billing;

// ==========================================
// Lenient field decoding
// ==========================================

/// The PHP backend hands ids and amounts back as strings about as often as
/// numbers, so every numeric field goes through one of these.
pub mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn whole(f: f64) -> Option<u64> {
        (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
    }

    fn parse_u64(s: &str) -> Option<u64> {
        let s = s.trim();
        s.parse().ok().or_else(|| s.parse::<f64>().ok().and_then(whole))
    }

    pub fn to_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(whole))
                .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {}", n))),
            Value::String(s) => {
                parse_u64(&s).ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {:?}", s)))
            }
            other => Err(D::Error::custom(format!("expected unsigned integer, got {}", other))),
        }
    }

    /// Like [`to_u64`], but `null` and blank strings read as 0.
    pub fn to_u64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(0),
            Value::String(s) if s.trim().is_empty() => Ok(0),
            other => to_u64(other).map_err(D::Error::custom),
        }
    }

    pub fn to_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            other => to_u64(other).map(Some).map_err(D::Error::custom),
        }
    }

    pub fn to_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(0.0),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("expected number, got {}", n))),
            Value::String(s) if s.trim().is_empty() => Ok(0.0),
            Value::String(s) => s
                .trim()
                .replace(',', "")
                .parse()
                .map_err(|_| D::Error::custom(format!("expected number, got {:?}", s))),
            other => Err(D::Error::custom(format!("expected number, got {}", other))),
        }
    }

    pub fn to_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    pub fn to_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect()),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.starts_with('[') {
                    serde_json::from_str(trimmed).map_err(D::Error::custom)
                } else {
                    Ok(trimmed
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from)
                        .collect())
                }
            }
            other => Err(D::Error::custom(format!("expected list of strings, got {}", other))),
        }
    }
}

// ==========================================
// Records
// ==========================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Client {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Project {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    #[serde(deserialize_with = "lenient::to_u64")]
    pub client_id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuotationItem {
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub old_po: String,
    #[serde(deserialize_with = "lenient::to_f64")]
    pub quantity: f64,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub unit: String,
    #[serde(deserialize_with = "lenient::to_f64")]
    pub rate: f64,
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub amount: f64,
}

impl QuotationItem {
    pub fn new(product_name: String, description: String, old_po: String, quantity: f64, unit: String, rate: f64) -> Self {
        Self {
            product_name,
            description,
            old_po,
            quantity,
            unit,
            rate,
            amount: billing::line_amount(quantity, rate),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Quotation {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    pub reference_no: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub address: String,
    /// Addressee printed under "To".
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub subject: String,
    #[serde(deserialize_with = "lenient::to_u64")]
    pub client_id: u64,
    #[serde(deserialize_with = "lenient::to_u64")]
    pub project_id: u64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<QuotationItem>,
}

/// A bill is never stored; it is a quotation priced with tax at render time.
#[derive(Debug, Serialize, Clone)]
pub struct Bill {
    pub bill_no: String,
    pub date: NaiveDate,
    pub quotation: Quotation,
    pub totals: billing::BillTotals,
}

impl Bill {
    pub fn from_quotation(bill_no: String, date: NaiveDate, quotation: Quotation) -> Self {
        let totals = billing::BillTotals::from_items(&quotation.items);
        Self { bill_no, date, quotation, totals }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BankDetails {
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub account_holder: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub account_number: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub bank_name: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub ifsc: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SalaryComponents {
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub basic: f64,
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub hra: f64,
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub conveyance: f64,
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub special_allowance: f64,
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub provident_fund: f64,
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub professional_tax: f64,
    #[serde(default, deserialize_with = "lenient::to_f64")]
    pub other_deductions: f64,
}

impl SalaryComponents {
    pub fn gross(&self) -> f64 {
        self.basic + self.hra + self.conveyance + self.special_allowance
    }

    pub fn deductions(&self) -> f64 {
        self.provident_fund + self.professional_tax + self.other_deductions
    }

    pub fn net(&self) -> f64 {
        self.gross() - self.deductions()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Employee {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub designation: String,
    #[serde(default)]
    pub date_of_joining: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub pan: String,
    #[serde(flatten)]
    pub bank: BankDetails,
    #[serde(flatten)]
    pub salary: SalaryComponents,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Approved")]
    Approved,
    #[serde(alias = "Rejected")]
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaveRequest {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    #[serde(deserialize_with = "lenient::to_u64")]
    pub employee_id: u64,
    #[serde(default)]
    pub employee_name: Option<String>,
    pub subject: String,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub content: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
}

impl LeaveRequest {
    /// Both ends inclusive.
    pub fn days(&self) -> i64 {
        billing::inclusive_days(self.start_date, self.end_date)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Assignment {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    #[serde(deserialize_with = "lenient::to_u64")]
    pub project_id: u64,
    #[serde(deserialize_with = "lenient::to_u64")]
    pub employee_id: u64,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackRecord {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    #[serde(deserialize_with = "lenient::to_u64")]
    pub project_id: u64,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::to_u64_or_zero")]
    pub progress_percentage: u64,
    #[serde(default, deserialize_with = "lenient::to_string")]
    pub challenges: String,
    #[serde(default, deserialize_with = "lenient::to_string_list")]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "Owner")]
    Owner,
    #[serde(alias = "Clerk")]
    Clerk,
    #[serde(alias = "Employee")]
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Owner, Role::Clerk, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Clerk => "clerk",
            Role::Employee => "employee",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    #[serde(deserialize_with = "lenient::to_u64")]
    pub id: u64,
    pub username: String,
    pub role: Role,
    /// Employee record behind this login, when the backend links one.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::to_opt_u64")]
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RevenuePoint {
    #[serde(alias = "month")]
    pub period: String,
    #[serde(default, alias = "count", deserialize_with = "lenient::to_u64_or_zero")]
    pub quotation_count: u64,
    #[serde(default, alias = "total", deserialize_with = "lenient::to_f64")]
    pub amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_accepts_string_ids() {
        let client: Client = serde_json::from_str(r#"{"id":"17","name":"Acme Forge"}"#).unwrap();
        assert_eq!(client.id, 17);
        assert_eq!(client.created_at, None);
    }

    #[test]
    fn quotation_item_amounts_from_strings() {
        let item: QuotationItem = serde_json::from_str(
            r#"{"product_name":"Bracket","description":null,"old_po":"","quantity":"10","unit":"nos","rate":"25.50","amount":""}"#,
        )
        .unwrap();
        assert_eq!(item.quantity, 10.0);
        assert_eq!(item.rate, 25.5);
        assert_eq!(item.amount, 0.0);
        assert_eq!(item.description, "");
    }

    #[test]
    fn quotation_item_new_computes_amount() {
        let item = QuotationItem::new("Shaft".into(), "".into(), "".into(), 10.0, "nos".into(), 25.0);
        assert_eq!(item.amount, 250.0);
    }

    #[test]
    fn employee_flattens_bank_and_salary() {
        let json = r#"{
            "id": "3", "name": "Ravi", "designation": "Welder",
            "account_number": "001122", "ifsc": "SBIN0001234",
            "basic": "20000", "hra": 8000, "provident_fund": "1800"
        }"#;
        let employee: Employee = serde_json::from_str(json).unwrap();
        assert_eq!(employee.bank.ifsc, "SBIN0001234");
        assert_eq!(employee.salary.gross(), 28000.0);
        assert_eq!(employee.salary.net(), 26200.0);
    }

    #[test]
    fn track_record_images_in_every_shape() {
        let array: TrackRecord = serde_json::from_str(
            r#"{"id":1,"project_id":2,"progress_percentage":"40","images":["a.jpg","b.jpg"]}"#,
        )
        .unwrap();
        let encoded: TrackRecord = serde_json::from_str(
            r#"{"id":1,"project_id":2,"progress_percentage":40,"images":"[\"a.jpg\",\"b.jpg\"]"}"#,
        )
        .unwrap();
        let csv: TrackRecord = serde_json::from_str(
            r#"{"id":1,"project_id":2,"progress_percentage":40,"images":"a.jpg, b.jpg,"}"#,
        )
        .unwrap();
        assert_eq!(array.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(encoded.images, array.images);
        assert_eq!(csv.images, array.images);
        assert_eq!(array.progress_percentage, 40);
    }

    #[test]
    fn decimal_strings_decode_as_whole_numbers() {
        let record: TrackRecord =
            serde_json::from_str(r#"{"id":"9","project_id":2,"progress_percentage":"45.00"}"#).unwrap();
        assert_eq!(record.progress_percentage, 45);
        assert_eq!(record.id, 9);

        let fractional = serde_json::from_str::<TrackRecord>(r#"{"id":1,"project_id":2,"progress_percentage":"45.5"}"#);
        assert!(fractional.is_err());
    }

    #[test]
    fn null_or_blank_counts_read_as_zero() {
        let null: RevenuePoint =
            serde_json::from_str(r#"{"period":"2024-01","quotation_count":null,"amount":null}"#).unwrap();
        let blank: RevenuePoint = serde_json::from_str(r#"{"month":"2024-02","count":"","total":"1,200.50"}"#).unwrap();
        assert_eq!(null.quotation_count, 0);
        assert_eq!(null.amount, 0.0);
        assert_eq!(blank.quotation_count, 0);
        assert_eq!(blank.amount, 1200.5);
    }

    #[test]
    fn ids_still_reject_null() {
        assert!(serde_json::from_str::<Client>(r#"{"id":null,"name":"Apex"}"#).is_err());
    }

    #[test]
    fn roles_accept_capitalized_spelling() {
        let user: User = serde_json::from_str(r#"{"id":1,"username":"meena","role":"Clerk"}"#).unwrap();
        assert_eq!(user.role, Role::Clerk);
        assert_eq!(serde_json::to_string(&user.role).unwrap(), "\"clerk\"");
    }

    #[test]
    fn login_may_link_an_employee_record() {
        let linked: User =
            serde_json::from_str(r#"{"id":12,"username":"ravi","role":"employee","employee_id":"3"}"#).unwrap();
        let unlinked: User = serde_json::from_str(r#"{"id":1,"username":"asha","role":"owner","employee_id":null}"#).unwrap();
        assert_eq!(linked.employee_id, Some(3));
        assert_eq!(unlinked.employee_id, None);
    }

    #[test]
    fn leave_days_are_inclusive() {
        let leave: LeaveRequest = serde_json::from_str(
            r#"{"id":1,"employee_id":"4","subject":"Family function","start_date":"2024-03-04","end_date":"2024-03-06","status":"Pending"}"#,
        )
        .unwrap();
        assert_eq!(leave.days(), 3);
        assert_eq!(leave.status, LeaveStatus::Pending);
    }

    #[test]
    fn bill_from_quotation_prices_items() {
        let quotation = Quotation {
            id: 1,
            reference_no: "SS/24/001".into(),
            address: String::new(),
            name: String::new(),
            subject: String::new(),
            client_id: 1,
            project_id: 1,
            date: None,
            items: vec![QuotationItem::new("Bolt".into(), "".into(), "".into(), 10.0, "nos".into(), 25.0)],
        };
        let bill = Bill::from_quotation("BILL20240101-01".into(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), quotation);
        assert_eq!(bill.totals.taxable_value, 250.0);
        assert_eq!(bill.totals.igst, 45.0);
        assert_eq!(bill.totals.grand_total, 295.0);
    }
}

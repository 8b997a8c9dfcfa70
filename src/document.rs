//! PDF assembly: tera renders typst source, the `typst` binary compiles it.

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use slug::slugify;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tera::{Context, Tera, Value};
use tracing::{debug, info, warn};

use crate::billing::{self, BillTotals};
use crate::config::CompanyProfile;
use crate::errors::{AppError, Result};
use crate::model::{Bill, Employee, LeaveRequest, Project, Quotation, QuotationItem, TrackRecord};

// ==========================================
// Constants & Embeds
// ==========================================

// Defaults are copied into <data_root>/templates on first use so they can be edited.
const DEFAULT_TEMPLATES: [(&str, &str); 6] = [
    ("letterhead.tera", include_str!("../templates/letterhead.tera")),
    ("signature.tera", include_str!("../templates/signature.tera")),
    ("quotation.tera", include_str!("../templates/quotation.tera")),
    ("bill.tera", include_str!("../templates/bill.tera")),
    ("report.tera", include_str!("../templates/report.tera")),
    ("salary_slip.tera", include_str!("../templates/salary_slip.tera")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Quotation,
    Bill,
    Report,
    SalarySlip,
}

impl DocumentKind {
    fn template(&self) -> &'static str {
        match self {
            DocumentKind::Quotation => "quotation.tera",
            DocumentKind::Bill => "bill.tera",
            DocumentKind::Report => "report.tera",
            DocumentKind::SalarySlip => "salary_slip.tera",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            DocumentKind::Quotation => "quotations",
            DocumentKind::Bill => "bills",
            DocumentKind::Report => "reports",
            DocumentKind::SalarySlip => "salary-slips",
        }
    }
}

/// Extra file (downloaded site image) placed next to the typst source.
pub struct Asset {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

// ==========================================
// Typst escaping
// ==========================================

/// Quotes a string as a typst string literal.
pub fn quote_typst(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn typst_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Value::String(quote_typst(&raw)))
}

// ==========================================
// Render views
// ==========================================

#[derive(Debug, Serialize, Clone)]
pub struct Letterhead {
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub phone: String,
    pub email: String,
    pub gstin: String,
    pub bank_info: String,
    /// File name inside the assets directory.
    pub logo: Option<String>,
}

impl Letterhead {
    pub fn from_profile(profile: &CompanyProfile) -> Self {
        Self {
            name: profile.name.clone(),
            address1: profile.address1.clone(),
            address2: profile.address2.clone(),
            phone: profile.phone.clone(),
            email: profile.email.clone(),
            gstin: profile.gstin.clone(),
            bank_info: profile.bank_info.clone(),
            logo: profile
                .logo
                .as_deref()
                .and_then(|l| Path::new(l).file_name())
                .map(|f| f.to_string_lossy().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ItemRow {
    sl: usize,
    product_name: String,
    description: String,
    old_po: String,
    quantity: String,
    unit: String,
    rate: String,
    amount: String,
}

fn item_rows(items: &[QuotationItem]) -> Vec<ItemRow> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| ItemRow {
            sl: idx + 1,
            product_name: item.product_name.clone(),
            description: item.description.clone(),
            old_po: item.old_po.clone(),
            quantity: format!("{}", item.quantity),
            unit: item.unit.clone(),
            rate: billing::format_money(item.rate),
            amount: billing::format_money(billing::line_amount(item.quantity, item.rate)),
        })
        .collect()
}

fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[derive(Debug, Serialize)]
pub struct QuotationView {
    letterhead: Letterhead,
    quotation: Quotation,
    date: String,
    client_name: String,
    project_name: String,
    items: Vec<ItemRow>,
    total: String,
    total_words: String,
    terms: Vec<String>,
}

impl QuotationView {
    pub fn new(company: &CompanyProfile, quotation: &Quotation, client_name: &str, project_name: &str) -> Self {
        let total = billing::quotation_total(&quotation.items);
        Self {
            letterhead: Letterhead::from_profile(company),
            date: display_date(quotation.date.unwrap_or_else(|| Local::now().date_naive())),
            client_name: client_name.to_string(),
            project_name: project_name.to_string(),
            items: item_rows(&quotation.items),
            total: billing::format_money(total),
            total_words: billing::amount_in_words(total),
            terms: company.quotation_terms.clone(),
            quotation: quotation.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TotalsView {
    taxable_value: String,
    igst: String,
    grand_total: String,
}

impl From<&BillTotals> for TotalsView {
    fn from(totals: &BillTotals) -> Self {
        Self {
            taxable_value: billing::format_money(totals.taxable_value),
            igst: billing::format_money(totals.igst),
            grand_total: billing::format_money(totals.grand_total),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BillView {
    letterhead: Letterhead,
    bill_no: String,
    date: String,
    quotation: Quotation,
    client_name: String,
    project_name: String,
    items: Vec<ItemRow>,
    totals: TotalsView,
    amount_in_words: String,
}

impl BillView {
    pub fn new(company: &CompanyProfile, bill: &Bill, client_name: &str, project_name: &str) -> Self {
        Self {
            letterhead: Letterhead::from_profile(company),
            bill_no: bill.bill_no.clone(),
            date: display_date(bill.date),
            quotation: bill.quotation.clone(),
            client_name: client_name.to_string(),
            project_name: project_name.to_string(),
            items: item_rows(&bill.quotation.items),
            totals: TotalsView::from(&bill.totals),
            amount_in_words: billing::amount_in_words(bill.totals.grand_total),
        }
    }
}

#[derive(Debug, Serialize)]
struct RecordRow {
    period: String,
    status: String,
    progress: String,
    challenges: String,
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    letterhead: Letterhead,
    project_id: u64,
    project_name: String,
    client_name: String,
    latest_progress: String,
    generated_on: String,
    records: Vec<RecordRow>,
}

fn record_period(record: &TrackRecord) -> String {
    match (record.start_date, record.end_date) {
        (Some(s), Some(e)) => format!("{} to {}", display_date(s), display_date(e)),
        (Some(s), None) => format!("from {}", display_date(s)),
        (None, Some(e)) => format!("until {}", display_date(e)),
        (None, None) => record.created_at.clone().unwrap_or_else(|| format!("#{}", record.id)),
    }
}

impl ReportView {
    /// `image_names` maps a record id to the staged file names of its images.
    pub fn new(
        company: &CompanyProfile,
        project: &Project,
        client_name: &str,
        records: &[TrackRecord],
        image_names: &HashMap<u64, Vec<String>>,
        generated_on: NaiveDate,
    ) -> Self {
        let latest_progress = records
            .iter()
            .max_by_key(|r| (r.end_date, r.id))
            .map(|r| format!("{}%", r.progress_percentage))
            .unwrap_or_else(|| "No reports yet".to_string());

        Self {
            letterhead: Letterhead::from_profile(company),
            project_id: project.id,
            project_name: project.name.clone(),
            client_name: client_name.to_string(),
            latest_progress,
            generated_on: display_date(generated_on),
            records: records
                .iter()
                .map(|r| RecordRow {
                    period: record_period(r),
                    status: r.status.clone(),
                    progress: format!("{}%", r.progress_percentage),
                    challenges: r.challenges.clone(),
                    images: image_names.get(&r.id).cloned().unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SalaryRow {
    earning: String,
    earning_amount: String,
    deduction: String,
    deduction_amount: String,
}

#[derive(Debug, Serialize)]
pub struct SalarySlipView {
    letterhead: Letterhead,
    month_label: String,
    employee: Employee,
    date_of_joining: String,
    days_in_month: u32,
    leave_days: i64,
    rows: Vec<SalaryRow>,
    gross: String,
    total_deductions: String,
    net: String,
    net_words: String,
}

impl SalarySlipView {
    pub fn new(company: &CompanyProfile, employee: &Employee, leave: &[LeaveRequest], year: i32, month: u32) -> Self {
        let s = &employee.salary;
        let earnings = [
            ("Basic", s.basic),
            ("House Rent Allowance", s.hra),
            ("Conveyance", s.conveyance),
            ("Special Allowance", s.special_allowance),
        ];
        let deductions = [
            ("Provident Fund", s.provident_fund),
            ("Professional Tax", s.professional_tax),
            ("Other Deductions", s.other_deductions),
        ];
        let rows = (0..earnings.len().max(deductions.len()))
            .map(|i| {
                let (earning, earning_amount) = earnings
                    .get(i)
                    .map(|(l, a)| (l.to_string(), billing::format_money(*a)))
                    .unwrap_or_default();
                let (deduction, deduction_amount) = deductions
                    .get(i)
                    .map(|(l, a)| (l.to_string(), billing::format_money(*a)))
                    .unwrap_or_default();
                SalaryRow { earning, earning_amount, deduction, deduction_amount }
            })
            .collect();

        Self {
            letterhead: Letterhead::from_profile(company),
            month_label: billing::month_label(year, month),
            employee: employee.clone(),
            date_of_joining: employee.date_of_joining.map(display_date).unwrap_or_default(),
            days_in_month: billing::days_in_month(year, month),
            leave_days: billing::leave_days_in_month(leave, employee.id, year, month),
            rows,
            gross: billing::format_money(s.gross()),
            total_deductions: billing::format_money(s.deductions()),
            net: billing::format_money(s.net()),
            net_words: billing::amount_in_words(s.net()),
        }
    }
}

// ==========================================
// File naming
// ==========================================

pub fn quotation_stem(reference_no: &str) -> String {
    let stem = slugify(reference_no);
    if stem.is_empty() { "quotation".to_string() } else { stem }
}

pub fn report_stem(project_id: u64, date: NaiveDate) -> String {
    format!("project-{}-report-{}", project_id, date.format("%Y%m%d"))
}

pub fn salary_slip_stem(employee: &Employee, year: i32, month: u32) -> String {
    format!("salary-{}-{}-{:02}", slugify(&employee.name), year, month)
}

/// `BILL<YYYYMMDD>-<NN>`, continuing after the highest number already on disk for that day.
pub fn next_bill_number(output_root: &Path, date: NaiveDate) -> String {
    let prefix = format!("BILL{}", date.format("%Y%m%d"));
    let mut next_idx = 1;

    let year_dir = output_root
        .join(DocumentKind::Bill.dir_name())
        .join(date.format("%Y").to_string());
    let mut stack = vec![year_dir];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let fname = entry.file_name().to_string_lossy().to_string();
            let Some(rest) = fname.strip_prefix(&prefix).and_then(|r| r.strip_prefix('-')) else {
                continue;
            };
            let num_part: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(idx) = num_part.parse::<u32>() {
                if idx >= next_idx {
                    next_idx = idx + 1;
                }
            }
        }
    }

    format!("{}-{:02}", prefix, next_idx)
}

// ==========================================
// Renderer
// ==========================================

/// Files one document run writes next to each other.
struct Staged {
    output_dir: PathBuf,
    assets_name: String,
    typ_path: PathBuf,
    pdf_path: PathBuf,
}

impl Staged {
    fn assets_dir(&self) -> PathBuf {
        self.output_dir.join(&self.assets_name)
    }

    fn discard(&self) {
        for file in [&self.typ_path, &self.pdf_path] {
            if file.exists() {
                if let Err(e) = fs::remove_file(file) {
                    warn!(path = %file.display(), error = %e, "could not remove partial output");
                }
            }
        }
        let assets_dir = self.assets_dir();
        if assets_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&assets_dir) {
                warn!(path = %assets_dir.display(), error = %e, "could not remove staged assets");
            }
        }
    }
}

pub struct Renderer {
    root: PathBuf,
    typst_bin: String,
    company: CompanyProfile,
    tera: Tera,
}

impl Renderer {
    /// Writes any missing default template into `<root>/templates` and loads the directory.
    pub fn new(root: &Path, typst_bin: &str, company: CompanyProfile) -> Result<Self> {
        let template_dir = root.join("templates");
        fs::create_dir_all(&template_dir)?;
        for (name, body) in DEFAULT_TEMPLATES {
            let path = template_dir.join(name);
            if !path.exists() {
                info!(template = name, "initializing default template");
                fs::write(&path, body)?;
            }
        }

        let glob_path = template_dir.join("*.tera");
        let glob = glob_path
            .to_str()
            .ok_or_else(|| AppError::Config(format!("non UTF-8 template path: {}", glob_path.display())))?;
        let mut tera = Tera::new(glob)?;
        tera.register_filter("typst", typst_filter);

        Ok(Self {
            root: root.to_path_buf(),
            typst_bin: typst_bin.to_string(),
            company,
            tera,
        })
    }

    pub fn company(&self) -> &CompanyProfile {
        &self.company
    }

    pub fn output_root(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn render_source<V: Serialize>(&self, kind: DocumentKind, view: &V, assets_dir: &str) -> Result<String> {
        let mut context = Context::from_serialize(view)?;
        context.insert("assets", assets_dir);
        Ok(self.tera.render(kind.template(), &context)?)
    }

    /// Stages the letterhead image and assets, renders, compiles, and returns the PDF path.
    /// Any failure aborts the whole document and removes what was staged for it.
    pub fn produce<V: Serialize>(
        &self,
        kind: DocumentKind,
        stem: &str,
        year: i32,
        view: &V,
        assets: &[Asset],
    ) -> Result<PathBuf> {
        let output_dir = self.output_root().join(kind.dir_name()).join(year.to_string());
        let staged = Staged {
            assets_name: format!("{}_assets", stem),
            typ_path: output_dir.join(format!("{}.typ", stem)),
            pdf_path: output_dir.join(format!("{}.pdf", stem)),
            output_dir,
        };
        // A regenerated document keeps its previous files if the new attempt fails.
        let fresh = !staged.pdf_path.exists();

        match self.stage_and_compile(kind, view, assets, &staged) {
            Ok(()) => {
                info!(path = %staged.pdf_path.display(), "document generated");
                Ok(staged.pdf_path)
            }
            Err(e) => {
                if fresh {
                    staged.discard();
                }
                Err(e)
            }
        }
    }

    fn stage_and_compile<V: Serialize>(
        &self,
        kind: DocumentKind,
        view: &V,
        assets: &[Asset],
        staged: &Staged,
    ) -> Result<()> {
        let assets_dir = staged.assets_dir();
        fs::create_dir_all(&assets_dir)?;

        if let Some(logo) = &self.company.logo {
            let source = self.root.join(logo);
            if !source.is_file() {
                return Err(AppError::Document(format!("Header image not found: {}", source.display())));
            }
            let file_name = source
                .file_name()
                .ok_or_else(|| AppError::Document(format!("Bad header image path: {}", logo)))?;
            fs::copy(&source, assets_dir.join(file_name))?;
        }
        for asset in assets {
            fs::write(assets_dir.join(&asset.file_name), &asset.bytes)?;
        }

        let source = self.render_source(kind, view, &staged.assets_name)?;
        fs::write(&staged.typ_path, source)?;
        debug!(path = %staged.typ_path.display(), "typst source written");

        self.compile(&staged.typ_path, &staged.pdf_path)
    }

    fn compile(&self, typ_path: &Path, pdf_path: &Path) -> Result<()> {
        if Command::new(&self.typst_bin).arg("--version").output().is_err() {
            return Err(AppError::Document(format!(
                "'{}' is not installed. Install typst or set typst_bin in settings.toml",
                self.typst_bin
            )));
        }

        println!("🔨 Compiling PDF...");
        let status = Command::new(&self.typst_bin)
            .arg("compile")
            .arg(typ_path)
            .arg(pdf_path)
            .status()?;
        if !status.success() {
            return Err(AppError::Document(format!("typst compile failed for {}", typ_path.display())));
        }
        Ok(())
    }
}

pub fn current_year() -> i32 {
    Local::now().year()
}

// Helper: Open file and reveal in Finder/Explorer
pub fn open_and_reveal(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg("-R").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(format!("/select,{}", path.to_string_lossy())).spawn().ok();

    #[cfg(target_os = "macos")]
    Command::new("open").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(path).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(path).spawn().ok();
}

pub fn open_folder(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg(path).spawn().ok();
    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(path).spawn().ok();
    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(path).spawn().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BankDetails, SalaryComponents};

    fn company() -> CompanyProfile {
        CompanyProfile {
            name: "Shree Precision Engineering".into(),
            address1: "Plot 14, MIDC".into(),
            address2: "Pune".into(),
            phone: "9822000000".into(),
            email: "office@shree.example".into(),
            gstin: "27ABCDE1234F1Z5".into(),
            bank_info: "SBI A/c 1234".into(),
            logo: None,
            quotation_terms: vec!["Prices ex-works.".into()],
        }
    }

    fn quotation() -> Quotation {
        Quotation {
            id: 4,
            reference_no: "SPE/Q/24/017".into(),
            address: "Chakan, Pune".into(),
            name: "The Purchase Manager".into(),
            subject: "Quote for \"heavy\" brackets".into(),
            client_id: 1,
            project_id: 2,
            date: NaiveDate::from_ymd_opt(2024, 4, 1),
            items: vec![QuotationItem::new(
                "MS Bracket".into(),
                "Line 1\nLine 2".into(),
                "PO-88".into(),
                10.0,
                "nos".into(),
                25.0,
            )],
        }
    }

    fn renderer(root: &Path, company: CompanyProfile) -> Renderer {
        Renderer::new(root, "typst", company).unwrap()
    }

    #[test]
    fn quotes_typst_strings() {
        assert_eq!(quote_typst("plain"), "\"plain\"");
        assert_eq!(quote_typst("a \"b\" \\ c\nd"), "\"a \\\"b\\\" \\\\ c\\nd\"");
        assert_eq!(quote_typst("#set page()"), "\"#set page()\"");
    }

    #[test]
    fn templates_are_seeded_into_data_root() {
        let dir = tempfile::tempdir().unwrap();
        renderer(dir.path(), company());
        for (name, _) in DEFAULT_TEMPLATES {
            assert!(dir.path().join("templates").join(name).exists(), "{} missing", name);
        }
    }

    #[test]
    fn edited_templates_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("quotation.tera"), "custom {{ quotation.reference_no | typst }}").unwrap();

        let r = renderer(dir.path(), company());
        let view = QuotationView::new(r.company(), &quotation(), "Apex", "Line 2");
        let source = r.render_source(DocumentKind::Quotation, &view, "x_assets").unwrap();
        assert_eq!(source, "custom \"SPE/Q/24/017\"");
    }

    #[test]
    fn quotation_source_carries_escaped_fields() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), company());
        let view = QuotationView::new(r.company(), &quotation(), "Apex Auto", "Press line");
        let source = r.render_source(DocumentKind::Quotation, &view, "q_assets").unwrap();

        assert!(source.contains("\"SPE/Q/24/017\""));
        assert!(source.contains("\"Quote for \\\"heavy\\\" brackets\""));
        assert!(source.contains("\"Line 1\\nLine 2\""));
        assert!(source.contains("\"250.00\""));
        assert!(source.contains("\"Rupees Two Hundred Fifty Only\""));
        assert!(source.contains("\"Prices ex-works.\""));
        assert!(source.contains("\"01/04/2024\""));
        assert!(!source.contains("#image("));
    }

    #[test]
    fn bill_source_has_tax_summary() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), company());
        let bill = Bill::from_quotation(
            "BILL20240402-01".into(),
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            quotation(),
        );
        let view = BillView::new(r.company(), &bill, "Apex Auto", "Press line");
        let source = r.render_source(DocumentKind::Bill, &view, "b_assets").unwrap();

        assert!(source.contains("\"BILL20240402-01\""));
        assert!(source.contains("\"45.00\""));
        assert!(source.contains("\"295.00\""));
        assert!(source.contains("\"Rupees Two Hundred Ninety Five Only\""));
    }

    #[test]
    fn report_embeds_staged_images() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), company());
        let project = Project {
            id: 12,
            client_id: 1,
            name: "Paint shop".into(),
            description: String::new(),
            created_at: None,
        };
        let record = TrackRecord {
            id: 3,
            project_id: 12,
            status: "In progress".into(),
            progress_percentage: 60,
            challenges: "Crane delayed".into(),
            images: vec!["uploads/a.jpg".into()],
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 7),
            created_at: None,
        };
        let names = HashMap::from([(3, vec!["3-1-a.jpg".to_string()])]);
        let view = ReportView::new(
            r.company(),
            &project,
            "Apex",
            &[record],
            &names,
            NaiveDate::from_ymd_opt(2024, 5, 8).unwrap(),
        );
        let source = r.render_source(DocumentKind::Report, &view, "project-12_assets").unwrap();

        assert!(source.contains("image(\"project-12_assets/3-1-a.jpg\""));
        assert!(source.contains("\"60%\""));
        assert!(source.contains("\"01/05/2024 to 07/05/2024\""));
    }

    #[test]
    fn salary_slip_source_has_net_pay() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), company());
        let employee = Employee {
            id: 8,
            name: "Ravi Patil".into(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            designation: "Welder".into(),
            date_of_joining: NaiveDate::from_ymd_opt(2021, 6, 1),
            pan: "ABCDE1234F".into(),
            bank: BankDetails { ifsc: "SBIN0001234".into(), ..Default::default() },
            salary: SalaryComponents { basic: 20000.0, hra: 8000.0, provident_fund: 1800.0, ..Default::default() },
        };
        let view = SalarySlipView::new(r.company(), &employee, &[], 2024, 3);
        let source = r.render_source(DocumentKind::SalarySlip, &view, "s_assets").unwrap();

        assert!(source.contains("\"March 2024\""));
        assert!(source.contains("\"26,200.00\""));
        assert!(source.contains("\"SBIN0001234\""));
        assert_eq!(salary_slip_stem(&employee, 2024, 3), "salary-ravi-patil-2024-03");
    }

    #[test]
    fn missing_header_image_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = company();
        profile.logo = Some("letterhead.png".into());
        let r = renderer(dir.path(), profile);
        let view = QuotationView::new(r.company(), &quotation(), "Apex", "Line");

        let err = r.produce(DocumentKind::Quotation, "q", 2024, &view, &[]).unwrap_err();
        assert!(err.to_string().contains("Header image not found"));
        assert!(!dir.path().join("output/quotations/2024/q.typ").exists());
    }

    #[test]
    fn header_image_is_referenced_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = company();
        profile.logo = Some("branding/letterhead.png".into());
        let r = renderer(dir.path(), profile);
        let view = QuotationView::new(r.company(), &quotation(), "Apex", "Line");
        let source = r.render_source(DocumentKind::Quotation, &view, "q_assets").unwrap();
        assert!(source.contains("#image(\"q_assets/letterhead.png\""));
    }

    #[test]
    fn bill_numbers_continue_from_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        assert_eq!(next_bill_number(dir.path(), date), "BILL20240402-01");

        let year_dir = dir.path().join("bills/2024");
        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("BILL20240402-01.pdf"), b"").unwrap();
        fs::write(year_dir.join("BILL20240402-07.typ"), b"").unwrap();
        fs::write(year_dir.join("BILL20240401-09.typ"), b"").unwrap();
        assert_eq!(next_bill_number(dir.path(), date), "BILL20240402-08");
    }

    fn bill_fixture(date: NaiveDate) -> (Bill, String) {
        let bill = Bill::from_quotation("BILL20240402-01".into(), date, quotation());
        let stem = bill.bill_no.clone();
        (bill, stem)
    }

    #[test]
    fn failed_compile_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let r = Renderer::new(dir.path(), "definitely-not-typst", company()).unwrap();
        let (bill, stem) = bill_fixture(date);
        let view = BillView::new(r.company(), &bill, "Apex", "Line");
        let asset = Asset { file_name: "site.jpg".into(), bytes: vec![1, 2, 3] };

        let err = r.produce(DocumentKind::Bill, &stem, 2024, &view, &[asset]).unwrap_err();
        assert!(err.to_string().contains("definitely-not-typst"));

        let year_dir = r.output_root().join("bills/2024");
        assert!(!year_dir.join("BILL20240402-01.typ").exists());
        assert!(!year_dir.join("BILL20240402-01_assets").exists());
        assert_eq!(next_bill_number(&r.output_root(), date), "BILL20240402-01");
    }

    #[test]
    fn failed_regeneration_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let r = Renderer::new(dir.path(), "definitely-not-typst", company()).unwrap();
        let (bill, stem) = bill_fixture(date);
        let view = BillView::new(r.company(), &bill, "Apex", "Line");

        let year_dir = r.output_root().join("bills/2024");
        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("BILL20240402-01.pdf"), b"%PDF").unwrap();

        assert!(r.produce(DocumentKind::Bill, &stem, 2024, &view, &[]).is_err());
        assert!(year_dir.join("BILL20240402-01.pdf").exists());
    }

    #[test]
    fn quotation_stems_are_file_safe() {
        assert_eq!(quotation_stem("SPE/Q/24/017"), "spe-q-24-017");
        assert_eq!(quotation_stem("///"), "quotation");
        assert_eq!(
            report_stem(12, NaiveDate::from_ymd_opt(2024, 5, 8).unwrap()),
            "project-12-report-20240508"
        );
    }
}

use chrono::{Datelike, Local, NaiveDate};
use clap::Subcommand;
use comfy_table::{Attribute, Cell, Table};
use inquire::{Confirm, CustomType, DateSelect, Text};
use tracing::info;

use super::clients::{client_choices, client_name};
use super::projects::{project_choices, project_name};
use super::{pick, print_table, Choice, Desk};
use crate::api::NewQuotation;
use crate::billing::{self, BillTotals};
use crate::document::{self, BillView, DocumentKind, QuotationView};
use crate::errors::{AppError, Result};
use crate::model::{Bill, Quotation, QuotationItem};
use crate::search::filter_records;
use crate::session::Route;
use crate::validation::Validator;

#[derive(Subcommand)]
pub enum QuotationCmd {
    /// List quotations
    List {
        /// Case-insensitive filter on reference, addressee or subject
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Create a new quotation
    New,
    /// Generate the quotation PDF
    Pdf {
        /// Reference number (prompts when omitted)
        reference: Option<String>,
    },
    /// Generate a tax bill from a quotation
    Bill {
        /// Quotation reference number (prompts when omitted)
        reference: Option<String>,
    },
}

pub fn run(desk: &Desk, cmd: QuotationCmd) -> Result<()> {
    match cmd {
        QuotationCmd::List { search } => {
            desk.guard(Route::Quotations)?;
            list(desk, search.as_deref().unwrap_or(""))
        }
        QuotationCmd::New => {
            desk.guard(Route::Quotations)?;
            create(desk)
        }
        QuotationCmd::Pdf { reference } => {
            desk.guard(Route::Quotations)?;
            quotation_pdf(desk, reference.as_deref())
        }
        QuotationCmd::Bill { reference } => {
            desk.guard(Route::Bills)?;
            bill_pdf(desk, reference.as_deref())
        }
    }
}

// ==========================================
// Listing
// ==========================================

fn quotation_table(quotations: &[&Quotation]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Ref. No"),
        Cell::new("Date"),
        Cell::new("To"),
        Cell::new("Subject"),
        Cell::new("Items"),
        Cell::new("Total (excl. GST)"),
    ]);
    for q in quotations {
        table.add_row(vec![
            Cell::new(&q.reference_no),
            Cell::new(q.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(&q.name),
            Cell::new(&q.subject),
            Cell::new(q.items.len()),
            Cell::new(billing::format_money(billing::quotation_total(&q.items))),
        ]);
    }
    table
}

fn items_table(items: &[QuotationItem]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Sl."),
        Cell::new("Product"),
        Cell::new("Old PO"),
        Cell::new("Qty"),
        Cell::new("Unit"),
        Cell::new("Rate"),
        Cell::new("Amount"),
    ]);
    for (idx, item) in items.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&item.product_name),
            Cell::new(&item.old_po),
            Cell::new(item.quantity),
            Cell::new(&item.unit),
            Cell::new(billing::format_money(item.rate)),
            Cell::new(billing::format_money(item.amount)),
        ]);
    }
    table
}

fn totals_table(totals: &BillTotals) -> Table {
    let mut table = Table::new();
    table.add_row(vec![Cell::new("Taxable Value"), Cell::new(billing::format_money(totals.taxable_value))]);
    table.add_row(vec![Cell::new("IGST @ 18%"), Cell::new(billing::format_money(totals.igst))]);
    table.add_row(vec![
        Cell::new("Grand Total").add_attribute(Attribute::Bold),
        Cell::new(billing::format_money(totals.grand_total)).add_attribute(Attribute::Bold),
    ]);
    table
}

fn list(desk: &Desk, query: &str) -> Result<()> {
    let quotations = desk.api.quotations()?;
    let hits = filter_records(&quotations, query);
    print_table("Quotations", quotation_table(&hits), hits.len());
    Ok(())
}

// ==========================================
// New quotation
// ==========================================

/// `Q/<year>/<NNN>`, one past the highest number already used this year.
pub fn suggest_reference(existing: &[Quotation], year: i32) -> String {
    let prefix = format!("Q/{}/", year);
    let next = existing
        .iter()
        .filter_map(|q| q.reference_no.strip_prefix(&prefix))
        .filter_map(|rest| rest.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    format!("{}{:03}", prefix, next)
}

fn enter_items() -> Result<Vec<QuotationItem>> {
    let mut items = Vec::new();
    println!("\n--- Enter Line Items ---");
    println!("(Leave Product Name empty to finish)");

    loop {
        let product_name = Text::new("Product Name:").prompt()?;
        if product_name.trim().is_empty() {
            break;
        }
        let description = Text::new("Description:").prompt()?;
        let old_po = Text::new("Old PO (optional):").prompt()?;
        let quantity = CustomType::<f64>::new("Quantity:")
            .with_error_message("Please type a number")
            .prompt()?;
        let unit = Text::new("Unit:").with_default("nos").prompt()?;
        let rate = CustomType::<f64>::new("Rate:")
            .with_error_message("Please type a number")
            .prompt()?;

        let item = QuotationItem::new(
            product_name.trim().to_string(),
            description.trim().to_string(),
            old_po.trim().to_string(),
            quantity,
            unit.trim().to_string(),
            rate,
        );
        match Validator::validate_item(&item) {
            Ok(()) => {
                println!("   = {}", billing::format_money(item.amount));
                items.push(item);
            }
            Err(e) => println!("❌ {} (item skipped)", e),
        }
    }
    Ok(items)
}

fn create(desk: &Desk) -> Result<()> {
    let clients = desk.api.clients()?;
    let client_id = pick("Select Client:", client_choices(&clients))?;
    let projects = desk.api.projects(Some(client_id))?;
    let project_id = pick("Select Project:", project_choices(&projects))?;

    let date = DateSelect::new("Quotation Date:")
        .with_default(Local::now().date_naive())
        .prompt()?;
    let existing = desk.api.quotations()?;
    let reference_no = Text::new("Reference No:")
        .with_default(&suggest_reference(&existing, date.year()))
        .prompt()?;
    let name = Text::new("To (addressee):").with_default("The Purchase Manager").prompt()?;
    let address = Text::new("Address:").prompt()?;
    let subject = Text::new("Subject:").prompt()?;
    Validator::require(&[
        ("Reference No", reference_no.as_str()),
        ("Addressee", name.as_str()),
        ("Address", address.as_str()),
        ("Subject", subject.as_str()),
    ])?;
    if existing.iter().any(|q| q.reference_no == reference_no.trim()) {
        return Err(AppError::Validation(format!("Reference No {} already exists", reference_no.trim())));
    }

    let items = enter_items()?;
    if items.is_empty() {
        println!("❌ No items entered. Aborting.");
        return Ok(());
    }
    print_table("Line Items", items_table(&items), items.len());
    println!("Total (excl. GST): {}", billing::format_money(billing::quotation_total(&items)));

    if !Confirm::new("Save quotation?").with_default(true).prompt()? {
        println!("Cancelled");
        return Ok(());
    }

    let new_quotation = NewQuotation {
        reference_no: reference_no.trim().to_string(),
        address: address.trim().to_string(),
        name: name.trim().to_string(),
        subject: subject.trim().to_string(),
        client_id,
        project_id,
        date,
        items,
    };
    let message = desk.api.add_quotation(&new_quotation)?;
    info!(reference = %new_quotation.reference_no, "quotation saved");
    println!("✅ {}", message);

    if Confirm::new("Generate PDF now?").with_default(true).prompt()? {
        let quotation = Quotation {
            id: 0,
            reference_no: new_quotation.reference_no,
            address: new_quotation.address,
            name: new_quotation.name,
            subject: new_quotation.subject,
            client_id,
            project_id,
            date: Some(date),
            items: new_quotation.items,
        };
        render_quotation(desk, &quotation, &client_name(&clients, client_id), &project_name(&projects, project_id))?;
    }
    Ok(())
}

// ==========================================
// Documents
// ==========================================

fn select_quotation(quotations: Vec<Quotation>, reference: Option<&str>) -> Result<Quotation> {
    if let Some(reference) = reference {
        return quotations
            .into_iter()
            .find(|q| q.reference_no.eq_ignore_ascii_case(reference.trim()))
            .ok_or_else(|| AppError::Validation(format!("No quotation with reference {}", reference)));
    }

    let choices = quotations
        .into_iter()
        .map(|q| Choice {
            label: format!("{} | {} | {}", q.reference_no, q.name, q.subject),
            value: q,
        })
        .collect();
    pick("Select Quotation:", choices)
}

fn render_quotation(desk: &Desk, quotation: &Quotation, client: &str, project: &str) -> Result<()> {
    let renderer = desk.renderer()?;
    let view = QuotationView::new(renderer.company(), quotation, client, project);
    let year = quotation.date.map(|d| d.year()).unwrap_or_else(document::current_year);
    let pdf = renderer.produce(
        DocumentKind::Quotation,
        &document::quotation_stem(&quotation.reference_no),
        year,
        &view,
        &[],
    )?;
    println!("✅ PDF Generated: {:?}", pdf);
    document::open_and_reveal(&pdf);
    Ok(())
}

fn quotation_pdf(desk: &Desk, reference: Option<&str>) -> Result<()> {
    let quotation = select_quotation(desk.api.quotations()?, reference)?;
    let clients = desk.api.clients()?;
    let projects = desk.api.projects(Some(quotation.client_id))?;
    render_quotation(
        desk,
        &quotation,
        &client_name(&clients, quotation.client_id),
        &project_name(&projects, quotation.project_id),
    )
}

fn bill_pdf(desk: &Desk, reference: Option<&str>) -> Result<()> {
    let quotation = select_quotation(desk.api.quotations()?, reference)?;
    if quotation.items.is_empty() {
        return Err(AppError::Validation(format!("Quotation {} has no items to bill", quotation.reference_no)));
    }
    let clients = desk.api.clients()?;
    let projects = desk.api.projects(Some(quotation.client_id))?;

    let date: NaiveDate = DateSelect::new("Bill Date:")
        .with_default(Local::now().date_naive())
        .prompt()?;

    let renderer = desk.renderer()?;
    let bill_no = document::next_bill_number(&renderer.output_root(), date);
    let bill = Bill::from_quotation(bill_no, date, quotation);

    println!("\n--- Bill {} ---", bill.bill_no);
    println!("{}", totals_table(&bill.totals));
    println!("{}", billing::amount_in_words(bill.totals.grand_total));

    let view = BillView::new(
        renderer.company(),
        &bill,
        &client_name(&clients, bill.quotation.client_id),
        &project_name(&projects, bill.quotation.project_id),
    );
    let pdf = renderer.produce(DocumentKind::Bill, &bill.bill_no, date.year(), &view, &[])?;
    println!("✅ PDF Generated: {:?}", pdf);
    document::open_and_reveal(&pdf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotation(reference_no: &str) -> Quotation {
        Quotation {
            id: 1,
            reference_no: reference_no.into(),
            address: String::new(),
            name: "Buyer".into(),
            subject: "Shafts".into(),
            client_id: 1,
            project_id: 1,
            date: None,
            items: vec![],
        }
    }

    #[test]
    fn reference_suggestion_continues_numbering() {
        let existing = vec![quotation("Q/2024/009"), quotation("Q/2024/011"), quotation("Q/2023/040"), quotation("misc")];
        assert_eq!(suggest_reference(&existing, 2024), "Q/2024/012");
        assert_eq!(suggest_reference(&existing, 2025), "Q/2025/001");
    }

    #[test]
    fn select_by_reference_ignores_case() {
        let found = select_quotation(vec![quotation("Q/2024/001"), quotation("q/2024/002")], Some("Q/2024/002")).unwrap();
        assert_eq!(found.reference_no, "q/2024/002");
    }

    #[test]
    fn unknown_reference_is_reported() {
        let err = select_quotation(vec![quotation("Q/2024/001")], Some("Q/9")).unwrap_err();
        assert!(err.to_string().contains("No quotation with reference Q/9"));
    }
}

use chrono::{Datelike, Local};
use clap::Subcommand;
use comfy_table::{Cell, Table};
use inquire::{Confirm, CustomType, DateSelect, Text};
use tracing::info;

use super::{optional, pick, print_table, Choice, Desk};
use crate::billing;
use crate::document::{self, DocumentKind, SalarySlipView};
use crate::errors::{AppError, Result};
use crate::model::{BankDetails, Employee, SalaryComponents};
use crate::search::{filter_records, find_by_id, remove_by_id};
use crate::session::Route;
use crate::validation::Validator;

#[derive(Subcommand)]
pub enum EmployeeCmd {
    /// List employees
    List {
        /// Case-insensitive filter on name, designation or email
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add a new employee
    Add,
    /// Edit personal, bank and salary details
    Edit,
    /// Delete an employee
    Delete,
    /// Show salary breakdown for every employee
    Salary,
    /// Generate a monthly salary slip PDF
    SalarySlip,
}

pub fn run(desk: &Desk, cmd: EmployeeCmd) -> Result<()> {
    match cmd {
        EmployeeCmd::Salary | EmployeeCmd::SalarySlip => desk.guard(Route::Salary)?,
        _ => desk.guard(Route::Employees)?,
    };
    match cmd {
        EmployeeCmd::List { search } => list(desk, search.as_deref().unwrap_or("")),
        EmployeeCmd::Add => add(desk),
        EmployeeCmd::Edit => edit(desk),
        EmployeeCmd::Delete => delete(desk),
        EmployeeCmd::Salary => salary(desk),
        EmployeeCmd::SalarySlip => salary_slip(desk),
    }
}

fn employee_table(employees: &[&Employee]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Designation"),
        Cell::new("Phone"),
        Cell::new("Email"),
        Cell::new("Joined"),
    ]);
    for e in employees {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(&e.name),
            Cell::new(&e.designation),
            Cell::new(&e.phone),
            Cell::new(&e.email),
            Cell::new(e.date_of_joining.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
        ]);
    }
    table
}

fn salary_table(employees: &[Employee]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Name"),
        Cell::new("Gross"),
        Cell::new("Deductions"),
        Cell::new("Net"),
    ]);
    for e in employees {
        table.add_row(vec![
            Cell::new(&e.name),
            Cell::new(billing::format_money(e.salary.gross())),
            Cell::new(billing::format_money(e.salary.deductions())),
            Cell::new(billing::format_money(e.salary.net())),
        ]);
    }
    table
}

pub fn employee_choices(employees: &[Employee]) -> Vec<Choice<u64>> {
    employees
        .iter()
        .map(|e| Choice { label: format!("{} | {} (#{})", e.name, e.designation, e.id), value: e.id })
        .collect()
}

fn list(desk: &Desk, query: &str) -> Result<()> {
    let employees = desk.api.employees()?;
    let hits = filter_records(&employees, query);
    print_table("Employees", employee_table(&hits), hits.len());
    Ok(())
}

fn amount(prompt: &str, current: f64) -> Result<f64> {
    let value = CustomType::<f64>::new(prompt)
        .with_default(current)
        .with_error_message("Please type a number")
        .prompt()?;
    Validator::validate_amount(prompt.trim_end_matches(':'), value)?;
    Ok(value)
}

/// Shared by add and edit; `current` supplies the defaults.
fn employee_wizard(current: &Employee) -> Result<Employee> {
    println!("\n--- Personal Details ---");
    let name = Text::new("Name:").with_default(&current.name).prompt()?;
    let designation = Text::new("Designation:").with_default(&current.designation).prompt()?;
    let phone = Text::new("Phone:").with_default(&current.phone).prompt()?;
    let email = Text::new("Email (optional):").with_default(&current.email).prompt()?;
    let address = Text::new("Address:").with_default(&current.address).prompt()?;
    let date_of_joining = DateSelect::new("Date of Joining:")
        .with_default(current.date_of_joining.unwrap_or_else(|| Local::now().date_naive()))
        .prompt()?;
    let pan = Text::new("PAN (optional):").with_default(&current.pan).prompt()?;

    Validator::require(&[
        ("Name", name.as_str()),
        ("Designation", designation.as_str()),
        ("Phone", phone.as_str()),
    ])?;
    Validator::validate_phone(&phone)?;
    if let Some(email) = optional(email.clone()) {
        Validator::validate_email(&email)?;
    }

    println!("\n--- Bank Details ---");
    let account_holder = Text::new("Account Holder:")
        .with_default(if current.bank.account_holder.is_empty() { &name } else { &current.bank.account_holder })
        .prompt()?;
    let account_number = Text::new("Account Number:").with_default(&current.bank.account_number).prompt()?;
    let bank_name = Text::new("Bank Name:").with_default(&current.bank.bank_name).prompt()?;
    let ifsc = Text::new("IFSC:").with_default(&current.bank.ifsc).prompt()?;
    let ifsc = ifsc.trim().to_uppercase();
    if !ifsc.is_empty() {
        Validator::validate_ifsc(&ifsc)?;
    }

    println!("\n--- Salary (monthly) ---");
    let s = &current.salary;
    let salary = SalaryComponents {
        basic: amount("Basic:", s.basic)?,
        hra: amount("HRA:", s.hra)?,
        conveyance: amount("Conveyance:", s.conveyance)?,
        special_allowance: amount("Special Allowance:", s.special_allowance)?,
        provident_fund: amount("Provident Fund:", s.provident_fund)?,
        professional_tax: amount("Professional Tax:", s.professional_tax)?,
        other_deductions: amount("Other Deductions:", s.other_deductions)?,
    };
    println!(
        "Gross {} | Deductions {} | Net {}",
        billing::format_money(salary.gross()),
        billing::format_money(salary.deductions()),
        billing::format_money(salary.net())
    );
    check_net_pay(&salary)?;

    Ok(Employee {
        id: current.id,
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        phone: phone.trim().to_string(),
        address: address.trim().to_string(),
        designation: designation.trim().to_string(),
        date_of_joining: Some(date_of_joining),
        pan: pan.trim().to_uppercase(),
        bank: BankDetails {
            account_holder: account_holder.trim().to_string(),
            account_number: account_number.trim().to_string(),
            bank_name: bank_name.trim().to_string(),
            ifsc,
        },
        salary,
    })
}

fn check_net_pay(salary: &SalaryComponents) -> Result<()> {
    if salary.net() < 0.0 {
        return Err(AppError::Validation(format!(
            "Deductions ({}) exceed gross pay ({})",
            billing::format_money(salary.deductions()),
            billing::format_money(salary.gross())
        )));
    }
    Ok(())
}

fn blank_employee() -> Employee {
    Employee {
        id: 0,
        name: String::new(),
        email: String::new(),
        phone: String::new(),
        address: String::new(),
        designation: String::new(),
        date_of_joining: None,
        pan: String::new(),
        bank: BankDetails::default(),
        salary: SalaryComponents::default(),
    }
}

fn add(desk: &Desk) -> Result<()> {
    let employee = employee_wizard(&blank_employee())?;
    let message = desk.api.add_employee(&employee)?;
    info!(employee = %employee.name, "employee added");
    println!("✅ {}", message);
    Ok(())
}

fn edit(desk: &Desk) -> Result<()> {
    let employees = desk.api.employees()?;
    let id = pick("Select Employee to edit:", employee_choices(&employees))?;
    let Some(current) = find_by_id(&employees, id) else {
        return Ok(());
    };
    let updated = employee_wizard(current)?;
    let message = desk.api.update_employee(&updated)?;
    println!("✅ {}", message);
    Ok(())
}

fn delete(desk: &Desk) -> Result<()> {
    let mut employees = desk.api.employees()?;
    let id = pick("Select Employee to DELETE:", employee_choices(&employees))?;
    if !Confirm::new("Delete this employee?").with_default(false).prompt()? {
        println!("Cancelled");
        return Ok(());
    }

    let message = desk.api.delete_employee(id)?;
    remove_by_id(&mut employees, id);
    println!("✅ {}", message);

    let remaining: Vec<&Employee> = employees.iter().collect();
    print_table("Employees", employee_table(&remaining), remaining.len());
    Ok(())
}

fn salary(desk: &Desk) -> Result<()> {
    let employees = desk.api.employees()?;
    print_table("Monthly Salary", salary_table(&employees), employees.len());
    let total: f64 = employees.iter().map(|e| e.salary.net()).sum();
    println!("Total net payroll: {}", billing::format_money(total));
    Ok(())
}

fn salary_slip(desk: &Desk) -> Result<()> {
    let employees = desk.api.employees()?;
    let id = pick("Select Employee:", employee_choices(&employees))?;
    let Some(employee) = find_by_id(&employees, id) else {
        return Ok(());
    };

    let day = DateSelect::new("Any day in the slip month:")
        .with_default(Local::now().date_naive())
        .prompt()?;
    let (year, month) = (day.year(), day.month());
    let leave = desk.api.leave_requests(Some(employee.id))?;

    let renderer = desk.renderer()?;
    let view = SalarySlipView::new(renderer.company(), employee, &leave, year, month);
    let pdf = renderer.produce(
        DocumentKind::SalarySlip,
        &document::salary_slip_stem(employee, year, month),
        year,
        &view,
        &[],
    )?;
    println!("✅ PDF Generated: {:?}", pdf);
    document::open_and_reveal(&pdf);
    Ok(())
}

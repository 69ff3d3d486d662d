//! # Seed Data Generator
//!
//! Populates a development database with jewelry invoices.
//!
//! ## Usage
//! ```bash
//! # 25 invoices (default)
//! cargo run -p kanak-backend --bin seed
//!
//! # Custom amount and database
//! cargo run -p kanak-backend --bin seed -- --count 200 --db ./data/kanak.db
//! ```
//!
//! ## Generated Data
//! - Customers from a fixed list of buyers, some GST-registered
//! - One to three items per invoice, priced from weight × rate + making
//! - A spread of statuses: draft, sent, paid and cancelled
//!
//! Seeded invoices go straight to the database and are not charged to the
//! account's usage counters.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::env;

use kanak_core::invoice::format_invoice_number;
use kanak_core::{
    CoreError, Customer, Invoice, ItemInput, Money, PaymentMethod, TaxSettings,
    DEFAULT_ACCOUNT_ID,
};
use kanak_db::{Database, DbConfig, InvoiceFilter};

/// (name, address, phone, gstin)
const CUSTOMERS: &[(&str, &str, &str, Option<&str>)] = &[
    ("Kavya Sharma", "22 Johari Bazaar, Jaipur", "9829012345", None),
    ("Arjun Mehta", "5 Linking Road, Mumbai", "9820098200", None),
    ("Lakshmi Jewellers", "41 T. Nagar, Chennai", "9840012345", Some("33AABCL1234M1Z5")),
    ("Farah Ali", "3 Charminar Road, Hyderabad", "9849012345", None),
    ("Gurpreet Singh", "18 Hall Bazaar, Amritsar", "9814012345", None),
    ("Sona Traders", "9 Manek Chowk, Ahmedabad", "9825012345", Some("24AAFCS5678K1ZP")),
];

/// (name, karat rate per gram in rupees, weight range in tenths of a gram)
const PIECES: &[(&str, i64, (i64, i64))] = &[
    ("22K Gold Necklace", 5_500, (150, 450)),
    ("22K Gold Bangle", 5_500, (100, 250)),
    ("18K Gold Ring", 4_500, (25, 80)),
    ("22K Gold Earrings", 5_500, (40, 120)),
    ("24K Gold Coin", 6_000, (10, 100)),
    ("Silver Anklet", 75, (300, 900)),
];

const METHODS: &[PaymentMethod] = &[
    PaymentMethod::Upi,
    PaymentMethod::Cash,
    PaymentMethod::Card,
    PaymentMethod::BankTransfer,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 25;
    let mut db_path = String::from("./kanak_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kanak Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of invoices to generate (default: 25)");
                println!("  -d, --db <PATH>    Database file path (default: ./kanak_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Kanak Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Invoices: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db
        .invoices()
        .list(DEFAULT_ACCOUNT_ID, &InvoiceFilter::default())
        .await?
        .len();
    if existing > 0 {
        println!("⚠ Database already has {} invoices", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let customers: Vec<Customer> = CUSTOMERS
        .iter()
        .map(|(name, address, phone, gstin)| {
            let mut customer = Customer::new(DEFAULT_ACCOUNT_ID, *name, *address, *phone, now);
            customer.gstin = gstin.map(str::to_string);
            customer
        })
        .collect();
    for customer in &customers {
        db.customers().upsert(customer).await?;
    }
    println!("✓ {} customers", customers.len());

    let tax = TaxSettings::default();
    let today = now.date_naive();
    let start = std::time::Instant::now();
    let mut generated = 0;

    for n in 0..count {
        let mut invoice = match generate_invoice(n, &customers, &tax, today) {
            Ok(invoice) => invoice,
            Err(e) => {
                eprintln!("Failed to build invoice {}: {}", n + 1, e);
                continue;
            }
        };

        if let Err(e) = db.invoices().save(&mut invoice).await {
            eprintln!("Failed to insert {}: {}", invoice.invoice_number, e);
            continue;
        }
        generated += 1;

        if generated % 10 == 0 {
            println!("  Generated {} invoices...", generated);
        }
    }

    println!();
    println!("✓ Generated {} invoices in {:?}", generated, start.elapsed());
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds invoice `n`, dated backwards from `today` so the series spans
/// a few months, and moves all but the newest few out of draft.
fn generate_invoice(
    n: usize,
    customers: &[Customer],
    tax: &TaxSettings,
    today: NaiveDate,
) -> Result<Invoice, CoreError> {
    let date = today - Duration::days((n as i64) * 3);
    let customer = customers[n % customers.len()].clone();
    let number = format_invoice_number("INV", date.year(), n as i64 + 1);

    let mut invoice = Invoice::new_draft(DEFAULT_ACCOUNT_ID, number, customer, date, Utc::now());
    invoice.due_date = Some(date + Duration::days(15));

    let item_count = 1 + n % 3;
    let items = (0..item_count)
        .map(|k| {
            let (name, rate, (min, max)) = PIECES[(n * 7 + k * 3) % PIECES.len()];
            let tenths = min + ((n as i64 * 37 + k as i64 * 11) % (max - min + 1));
            let weight = Decimal::new(tenths, 1);
            let making = Money::from_rupees(rate * tenths / 100);

            tax.build_item(ItemInput {
                name: name.to_string(),
                hsn_code: Some("7113".to_string()),
                quantity: 1,
                weight_in_grams: Some(weight),
                rate_per_gram: Some(Money::from_rupees(rate)),
                making_charges: Some(making),
                ..Default::default()
            })
        })
        .collect();

    invoice.replace_items(items)?;

    if n >= 3 {
        let now = Utc::now();
        match n % 5 {
            0 | 1 => {
                invoice.generate(now)?;
                invoice.mark_paid(METHODS[n % METHODS.len()], None, now)?;
            }
            2 => invoice.cancel(now)?,
            _ => invoice.generate(now)?,
        }
    }
    Ok(invoice)
}

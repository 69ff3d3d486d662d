//! # Kanak Backend Entry Point
//!
//! Loads the configuration, opens the database and prints where the
//! configured account stands: business details, invoice allowance and the
//! dashboard totals.
//!
//! ## Usage
//! ```bash
//! cargo run -p kanak-backend
//! cargo run -p kanak-backend -- --config ./kanak.toml
//! KANAK_DB_PATH=./kanak_dev.db cargo run -p kanak-backend
//! ```

use std::env;
use std::path::PathBuf;

use kanak_backend::commands::{config, invoice, usage};
use kanak_backend::state::AppConfig;
use kanak_backend::{init_tracing, Backend};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kanak GST Invoicing");
                println!();
                println!("Usage: kanak-backend [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: $KANAK_CONFIG or the platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();
    info!("Starting Kanak backend");

    let app_config = AppConfig::load(config_path)?;
    let app = Backend::start(app_config).await?;

    let view = config::get_config(&app.config);
    println!("{}", view.business.name);
    println!("{}", view.business.address);
    if let Some(gstin) = &view.business.gstin {
        println!("GSTIN: {}", gstin);
    }
    println!(
        "GST: CGST {}% + SGST {}%",
        view.tax.default_cgst_rate.percentage(),
        view.tax.default_sgst_rate.percentage()
    );
    println!();

    let entitlement = usage::get_entitlement(&app.config, &app.billing).await?;
    if entitlement.degraded {
        println!("Usage accounting unavailable; invoice creation is allowed");
    } else if let Some(plan) = &entitlement.plan_id {
        println!("Plan: {}", plan);
        if let Some(until) = entitlement.valid_until {
            println!("  Valid until {}", until.format("%Y-%m-%d"));
        }
        if let Some(left) = entitlement.subscription_invoices_remaining {
            println!("  {} invoices left", left);
        }
    } else {
        println!(
            "Free tier: {} of {} invoices used",
            entitlement.free_invoices_used, entitlement.free_invoices_limit
        );
        if !entitlement.can_create_invoice {
            println!("  Upgrade to keep creating invoices");
        }
    }
    println!();

    let summary = invoice::get_dashboard(&app.db, &app.config, None).await?;
    println!("Invoices: {}", summary.total_invoices);
    println!(
        "  draft {} / sent {} / paid {} / cancelled {} (overdue {})",
        summary.draft_count,
        summary.sent_count,
        summary.paid_count,
        summary.cancelled_count,
        summary.overdue_count
    );
    println!("Billed:      ₹{}", summary.billed_total.round_to_paise());
    println!("Collected:   ₹{}", summary.collected_total.round_to_paise());
    println!("Outstanding: ₹{}", summary.outstanding_total.round_to_paise());
    println!(
        "GST collected: CGST ₹{} / SGST ₹{}",
        summary.cgst_collected.round_to_paise(),
        summary.sgst_collected.round_to_paise()
    );

    app.shutdown().await;
    Ok(())
}

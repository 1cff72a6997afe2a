//! # Seed Data Generator
//!
//! Populates a database with a grocery catalog and a few customers for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./billbook_dev.db
//! cargo run -p billbook-register --bin seed
//!
//! # Specify database path and add a few demo sales
//! cargo run -p billbook-register --bin seed -- --db ./data/billbook.db --sales
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;

use billbook_core::{Customer, Money, PaymentMethod, Product};
use billbook_db::{Database, DbConfig};
use billbook_register::telemetry::init_tracing;
use billbook_register::{Billbook, NoOpPrinter, RegisterConfig};

/// (code, name, unit, price in paise, category)
const PRODUCTS: &[(&str, &str, &str, i64, &str)] = &[
    ("RICE-BAS", "Basmati Rice", "kg", 12000, "Grains"),
    ("RICE-PON", "Ponni Rice", "kg", 6200, "Grains"),
    ("ATTA-5", "Wheat Atta 5kg", "pcs", 28500, "Grains"),
    ("DAL-TOOR", "Toor Dal", "kg", 14000, "Pulses"),
    ("DAL-MOONG", "Moong Dal", "kg", 12800, "Pulses"),
    ("CHANA", "Bengal Gram", "kg", 9600, "Pulses"),
    ("SUGAR", "Sugar", "kg", 4500, "Essentials"),
    ("SALT", "Iodised Salt", "pcs", 2800, "Essentials"),
    ("OIL-SUN-1L", "Sunflower Oil 1L", "pcs", 15500, "Oils"),
    ("OIL-GING-1L", "Gingelly Oil 1L", "pcs", 39000, "Oils"),
    ("GHEE-500", "Ghee 500ml", "pcs", 32000, "Dairy"),
    ("MILK-500", "Toned Milk 500ml", "pcs", 2700, "Dairy"),
    ("CURD-500", "Curd 500g", "pcs", 3500, "Dairy"),
    ("TEA-250", "Tea Powder 250g", "pcs", 14500, "Beverages"),
    ("COFFEE-200", "Filter Coffee 200g", "pcs", 18000, "Beverages"),
    ("SOAP-BATH", "Bath Soap", "pcs", 4200, "Household"),
    ("DET-1KG", "Detergent Powder 1kg", "pcs", 11000, "Household"),
    ("ONION", "Onion", "kg", 4000, "Vegetables"),
    ("TOMATO", "Tomato", "kg", 3200, "Vegetables"),
    ("POTATO", "Potato", "kg", 3600, "Vegetables"),
];

/// (name, phone, address)
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Meena Raman", "9840012345", "12 Market Road"),
    ("Ravi Kumar", "9000011111", "4 Temple Street"),
    ("Anu Joseph", "9123456789", ""),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path = PathBuf::from("./billbook_dev.db");
    let mut with_sales = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--sales" | "-s" => with_sales = true,
            "--help" | "-h" => {
                println!("Billbook POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./billbook_dev.db)");
                println!("  -s, --sales        Also record a few demo sales");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    println!("Billbook POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path.display());
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut config = RegisterConfig::default();
    config.database.path = Some(db_path);
    let app = Billbook::with_database(db, config, Arc::new(NoOpPrinter)).await?;

    let mut products = Vec::new();
    for (code, name, unit, paise, category) in PRODUCTS {
        let product = Product::new(*name, *code, *unit, Money::from_cents(*paise))
            .with_category(*category);
        match app.catalog.add_product(product).await {
            Ok(product) => products.push(product),
            Err(e) => eprintln!("Failed to insert {}: {}", code, e),
        }
    }
    println!("✓ {} products", products.len());

    let mut customers = Vec::new();
    for (name, phone, address) in CUSTOMERS {
        let customer = Customer::new(*name, Some(phone.to_string()), Some(address.to_string()));
        match app.catalog.add_customer(customer).await {
            Ok(customer) => customers.push(customer),
            Err(e) => eprintln!("Failed to insert {}: {}", name, e),
        }
    }
    println!("✓ {} customers", customers.len());

    if with_sales && products.len() == PRODUCTS.len() && !customers.is_empty() {
        let register = &app.register;

        register.add_product(&products[0].id, Decimal::from(2)).await?;
        register.add_product(&products[6].id, Decimal::ONE).await?;
        let cash = register.commit(PaymentMethod::Cash).await?;

        register.add_product(&products[3].id, Decimal::new(15, 1)).await?;
        register.select_customer(&customers[0].id).await?;
        let debt = register.commit(PaymentMethod::Debt).await?;

        register.add_product(&products[8].id, Decimal::ONE).await?;
        register.set_discount_input("10");
        let upi = register.commit(PaymentMethod::Upi).await?;

        for outcome in [&cash, &debt, &upi] {
            println!(
                "  {} {} {}",
                outcome.bill.bill_number,
                outcome.bill.payment_method,
                app.config.store.format_money(outcome.bill.grand_total)
            );
        }
        println!("✓ 3 demo sales");
    }

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

//! # Demo Shop Seeder
//!
//! Populates a database with a small demo catalog and a few customers.
//!
//! ## Usage
//! ```bash
//! cargo run -p tillbook-db --bin seed
//! cargo run -p tillbook-db --bin seed -- --db ./data/tillbook.db --shop main
//! ```

use chrono::Utc;
use std::env;
use tillbook_core::{new_id, Customer, Product, DEFAULT_SHOP_ID};
use tillbook_db::{Database, DbConfig};

/// (name, price cents, cost cents, stock, low stock threshold)
const CATALOG: &[(&str, i64, i64, i64, i64)] = &[
    ("Bread", 250, 140, 40, 10),
    ("Brown Bread", 280, 160, 30, 10),
    ("Milk", 1_850, 1_300, 24, 6),
    ("Eggs", 4_500, 3_200, 12, 4),
    ("Sugar", 3_900, 2_900, 20, 5),
    ("Maize Meal", 8_500, 6_800, 15, 5),
    ("Cooking Oil", 6_200, 4_700, 18, 4),
    ("Rice", 5_400, 3_900, 22, 6),
    ("Tea Bags", 3_100, 2_000, 16, 4),
    ("Coffee", 7_900, 5_500, 8, 3),
    ("Washing Powder", 4_800, 3_400, 10, 3),
    ("Soap", 1_200, 700, 36, 8),
    ("Candles", 1_500, 900, 25, 5),
    ("Airtime", 1_000, 950, 0, 0),
];

/// (name, phone, credit limit cents)
const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Thandi", "0821234567", 50_000),
    ("Sipho", "0837654321", 0),
    ("Naledi", "0845550199", 20_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tillbook_dev.db");
    let mut shop = String::from(DEFAULT_SHOP_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--shop" | "-s" => {
                if i + 1 < args.len() {
                    shop = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tillbook Demo Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tillbook_dev.db)");
                println!("  -s, --shop <ID>    Shop to seed (default: {DEFAULT_SHOP_ID})");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tillbook Demo Seeder");
    println!("====================");
    println!("Database: {}", db_path);
    println!("Shop:     {}", shop);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count(&shop).await?;
    if existing > 0 {
        println!("⚠ Shop already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let now = Utc::now();
    let mut products = 0;
    for (name, price_cents, cost_cents, stock, threshold) in CATALOG {
        let product = Product {
            id: new_id(),
            shop_id: shop.clone(),
            name: name.to_string(),
            price_cents: *price_cents,
            cost_cents: Some(*cost_cents),
            stock: *stock,
            low_stock_threshold: *threshold,
            // Airtime is sold as a voucher, not counted
            track_stock: *name != "Airtime",
            active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        products += 1;
    }
    println!("✓ {} products", products);

    let mut customers = 0;
    for (name, phone, limit) in CUSTOMERS {
        let customer = Customer {
            id: new_id(),
            shop_id: shop.clone(),
            name: name.to_string(),
            phone: phone.to_string(),
            email: None,
            total_spent_cents: 0,
            total_visits: 0,
            loyalty_points: 0,
            current_balance_cents: 0,
            credit_limit_cents: *limit,
            last_purchase_at: None,
            version: 0,
            created_at: now,
        };
        if let Err(e) = db.customers().insert(&customer).await {
            eprintln!("Failed to insert {}: {}", customer.name, e);
            continue;
        }
        customers += 1;
    }
    println!("✓ {} customers", customers);

    let low = db.products().low_stock(&shop).await?;
    println!("  Low stock right away: {}", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

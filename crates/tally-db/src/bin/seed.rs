//! # Seed Data Generator
//!
//! Populates the database with demo categories and inventory for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! Creates one category per department, each with a capital baseline, and a
//! spread of items per category:
//! - Unique code: `{CATEGORY}-{NAME}-{INDEX}`
//! - Cost/selling prices with a plausible margin
//! - Starting stock between 0 and 60 with low-stock thresholds

use chrono::Utc;
use std::env;
use tally_core::InventoryItem;
use tally_db::{Database, DbConfig};
use uuid::Uuid;

/// Departments: (code prefix, display name, capital baseline in cents, items)
const DEPARTMENTS: &[(&str, &str, i64, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        1000_00,
        &[
            "Coca-Cola 330ml",
            "Pepsi 330ml",
            "Sprite 330ml",
            "Red Bull 250ml",
            "Still Water 500ml",
            "Orange Juice 1L",
            "Iced Tea 500ml",
            "Cold Brew Coffee",
        ],
    ),
    (
        "SNK",
        "Snacks",
        750_00,
        &[
            "Lays Classic",
            "Doritos Nacho",
            "Pringles Original",
            "Snickers Bar",
            "Kit Kat",
            "Gummy Bears",
            "Oreos",
            "Salted Pretzels",
        ],
    ),
    (
        "GRO",
        "Grocery",
        1500_00,
        &[
            "White Bread",
            "Spaghetti 500g",
            "White Rice 1kg",
            "Canned Beans",
            "Canned Tomatoes",
            "Peanut Butter",
            "Honey 250g",
            "Sugar 1kg",
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing data
    let existing = db.categories().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} categories", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating categories and inventory...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for (dept_idx, (prefix, name, capital_cents, item_names)) in DEPARTMENTS.iter().enumerate() {
        let category = db.categories().create(name, *capital_cents).await?;
        println!("  Category {} (capital {})", name, capital_cents / 100);

        for (item_idx, item_name) in item_names.iter().enumerate() {
            let item = generate_item(
                &category.id,
                prefix,
                item_name,
                dept_idx * 100 + item_idx,
            );

            if let Err(e) = db.inventory().insert(&item).await {
                eprintln!("Failed to insert {}: {}", item.code, e);
                continue;
            }

            generated += 1;
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single inventory item with plausible data.
fn generate_item(category_id: &str, prefix: &str, name: &str, seed: usize) -> InventoryItem {
    let now = Utc::now();

    // Unique code: BEV-COC-003
    let code = format!(
        "{}-{}-{:03}",
        prefix,
        &name.replace(' ', "")[..3].to_uppercase(),
        seed
    );

    // Cost $0.99 - $8.99, selling price with a ~40% markup
    let cost_cents = 99 + ((seed * 17) % 800) as i64;
    let selling_cents = cost_cents + (cost_cents * 2) / 5;

    InventoryItem {
        id: Uuid::new_v4().to_string(),
        category_id: category_id.to_string(),
        code,
        name: name.to_string(),
        cost_price_cents: cost_cents,
        selling_price_cents: selling_cents,
        quantity: ((seed * 7) % 61) as i64,
        min_stock: 5,
        max_stock: 80,
        created_at: now,
        updated_at: now,
    }
}

//! # Seed Data Generator
//!
//! Populates the database with demo customers, vehicle stock and running
//! expenses for development.
//!
//! ## Usage
//! ```bash
//! # Generate 50 stock items (default)
//! cargo run -p dealer-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p dealer-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p dealer-db --bin seed -- --db ./data/dealer.db
//! ```
//!
//! ## Generated Data
//! - One customer per fleet name, plus a supplier entry
//! - Stock items across makes and model years, each with 1-5 VINs
//! - Twelve months of showroom rent in AED
//!
//! Each stock item has:
//! - Name: `{MAKE} {MODEL} {YEAR}`
//! - Selling price: 85,000 - 400,000 AED
//! - Cost: 80-92% of selling price
//! - VINs: `{MAKE3}{YEAR}{INDEX:05}-{UNIT}`

use chrono::{Datelike, Months, NaiveDate, Utc};
use dealer_core::expense::OperatingExpense;
use dealer_core::{Customer, NewStockItem, NewUnit, PartyKind};
use dealer_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

/// Makes and models for realistic test data
const MODELS: &[(&str, &[&str])] = &[
    ("Toyota", &["Land Cruiser", "Hilux", "Camry", "Prado", "Fortuner"]),
    ("Nissan", &["Patrol", "Sunny", "X-Trail", "Navara"]),
    ("Mitsubishi", &["Pajero", "L200", "Outlander"]),
    ("Hyundai", &["Tucson", "Elantra", "Santa Fe"]),
    ("Kia", &["Sportage", "Sorento", "Pegas"]),
];

const COLORS: &[&str] = &["White", "Silver", "Black", "Grey", "Pearl", "Bronze"];

const YEARS: &[i32] = &[2023, 2024, 2025];

const FLEETS: &[&str] = &[
    "Al Noor Rent A Car",
    "Gulf Logistics FZE",
    "Hamdan Trading LLC",
    "Desert Star Tours",
    "Emirates Fleet Services",
    "Blue Coast Contracting",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./dealer_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
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
                println!("Dealer Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of stock items to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./dealer_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Dealer Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Stock items: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.stock().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} stock items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Directory
    println!();
    println!("Generating directory...");
    for (idx, name) in FLEETS.iter().enumerate() {
        db.directory().insert(&generate_party(name, PartyKind::Customer, idx)).await?;
    }
    db.directory()
        .insert(&generate_party("Al Futtaim Motors", PartyKind::Supplier, FLEETS.len()))
        .await?;
    println!("  {} directory entries", db.directory().count().await?);

    // Stock
    println!();
    println!("Generating stock...");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut units = 0;

    'outer: for &year in YEARS {
        for (make_idx, (make, models)) in MODELS.iter().enumerate() {
            for (model_idx, model) in models.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = generated * 31 + make_idx * 7 + model_idx;
                let item = generate_stock_item(make, model, year, seed, generated);

                match db.stock().insert(&item).await {
                    Ok(stored) => {
                        units += stored.units.len();
                        generated += 1;
                    }
                    Err(e) => eprintln!("Failed to insert {}: {}", item.name, e),
                }

                if generated > 0 && generated % 25 == 0 {
                    println!("  Generated {} stock items...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} stock items ({} VINs) in {:?}",
        generated, units, elapsed
    );

    // Expenses
    println!();
    println!("Generating expenses...");
    let today = Utc::now().date_naive();
    let first_of_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
    for back in 0..12u32 {
        let Some(month) = first_of_month.checked_sub_months(Months::new(back)) else {
            continue;
        };
        db.expenses()
            .insert(&OperatingExpense {
                id: Uuid::new_v4().to_string(),
                category: "rent".to_string(),
                description: format!("Showroom rent {}", month.format("%Y-%m")),
                amount_cents: 4_500_000,
                currency: "AED".to_string(),
                incurred_on: month,
            })
            .await?;
    }
    println!("  12 monthly rent entries");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_party(name: &str, kind: PartyKind, seed: usize) -> Customer {
    let slug: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    Customer {
        id: Uuid::new_v4().to_string(),
        kind,
        name: name.to_string(),
        email: Some(format!("accounts@{}.example", slug)),
        phone: Some(format!("+9714{:07}", 3_000_000 + seed * 1_117)),
        address: Some("Dubai, UAE".to_string()),
        trn: Some(format!("1000{:011}", seed * 7_919 + 3)),
        created_at: Utc::now(),
    }
}

/// Generates a single stock item with 1-5 serialized units.
fn generate_stock_item(make: &str, model: &str, year: i32, seed: usize, index: usize) -> NewStockItem {
    // 85,000 - 400,000 AED in 500 AED steps
    let selling_price_cents = (85_000 + ((seed * 4_973) % 631) as i64 * 500) * 100;

    // 80-92% of selling price
    let cost_pct = 80 + (seed % 13) as i64;
    let cost_price_cents = selling_price_cents * cost_pct / 100;

    let color = COLORS[seed % COLORS.len()];
    let unit_count = 1 + seed % 5;
    let prefix: String = make.chars().take(3).collect::<String>().to_uppercase();

    let units = (0..unit_count)
        .map(|u| NewUnit {
            chassis_number: format!("{}{}{:05}-{}", prefix, year, index, u + 1),
            engine_number: Some(format!("EN{:08}", seed * 10 + u)),
            color: Some(COLORS[(seed + u) % COLORS.len()].to_string()),
        })
        .collect();

    NewStockItem {
        name: format!("{} {} {}", make, model, year),
        make: Some(make.to_string()),
        model: Some(model.to_string()),
        year: Some(year),
        color: Some(color.to_string()),
        cost_price_cents,
        selling_price_cents,
        currency: "AED".to_string(),
        quantity: 0,
        units,
    }
}

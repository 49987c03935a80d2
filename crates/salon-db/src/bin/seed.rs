//! # Seed Data Generator
//!
//! Populates the database with a demo salon for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./backoffice_dev.db
//! cargo run -p salon-db --bin seed
//!
//! # Specify database path and the demo password
//! cargo run -p salon-db --bin seed -- --db ./data/backoffice.db --password hunter22
//! ```
//!
//! ## Generated Data
//! - Users: owner (superuser), two barbers, one client
//! - Currencies: USD (default), EUR
//! - Salons: "Downtown" with the child salon "Uptown"
//! - One register per currency, hairstyles, shaves, inventory,
//!   a salary payment and a rent expense

use std::env;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use salon_core::{ExchangeRate, Money, Pagination, PermissionKind, ShaveStatus, TransactionKind};
use salon_db::{
    Database, DbConfig, NewAssignment, NewBarber, NewCashRegister, NewClient, NewHairstyle,
    NewItem, NewItemPurchase, NewItemUsage, NewPayment, NewSalon, NewShave, NewTransalon, NewUser,
};

/// Hairstyles: (name, tariff in cents)
const HAIRSTYLES: &[(&str, i64)] = &[
    ("Classic Cut", 2_500),
    ("Skin Fade", 3_000),
    ("Buzz Cut", 1_500),
    ("Beard Trim", 1_200),
    ("Hot Towel Shave", 2_000),
];

/// Items: (name, unit price in cents, opening stock)
const ITEMS: &[(&str, i64, i64)] = &[
    ("Pomade", 1_200, 10),
    ("Beard Oil", 1_800, 6),
    ("Shaving Cream", 900, 12),
    ("Razor Blades (10)", 600, 20),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./backoffice_dev.db");
    let mut password = String::from("password123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Salon Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./backoffice_dev.db)");
                println!("  -p, --password <PASS>    Password of every demo user (default: password123)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Salon Back Office Seed Data Generator");
    println!("=======================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.salons().list(None, Pagination::default()).await?;
    if existing.total > 0 {
        println!("⚠ Database already has {} salons", existing.total);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let password_hash = hash_password(&password)?;
    let new_user = |email: &str, first: &str, last: &str, superuser: bool| NewUser {
        email: email.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        password_hash: password_hash.clone(),
        is_active: true,
        is_staff: superuser,
        is_superuser: superuser,
    };

    // Users
    let owner = db.users().create(new_user("owner@salon.dev", "Olivia", "Owner", true)).await?;
    let dave = db.users().create(new_user("dave@salon.dev", "Dave", "Blade", false)).await?;
    let sam = db.users().create(new_user("sam@salon.dev", "Sam", "Shears", false)).await?;
    let carl = db.users().create(new_user("carl@salon.dev", "Carl", "Client", false)).await?;
    println!("✓ Created 4 users");

    // Currencies
    let usd = db.currencies().default().await?;
    let eur = db.currencies().create("EUR", "Euro", false).await?;
    let salary = db.payment_types().default_salary().await?;
    let senior = db.barber_types().create("Senior", "Five or more years behind the chair").await?;
    println!("✓ Currencies {} (default) and {}", usd.code, eur.code);

    // Salons
    let downtown = db
        .salons()
        .create(NewSalon {
            name: "Downtown".to_string(),
            description: "Flagship salon".to_string(),
            address: Some("1 Main Street".to_string()),
            phone: Some("555-0100".to_string()),
            email: Some("downtown@salon.dev".to_string()),
            parent_id: None,
            owner_id: owner.id.clone(),
        })
        .await?;
    let uptown = db
        .salons()
        .create(NewSalon {
            name: "Uptown".to_string(),
            description: "Second location".to_string(),
            address: Some("99 Hill Road".to_string()),
            phone: None,
            email: None,
            parent_id: Some(downtown.id.clone()),
            owner_id: owner.id.clone(),
        })
        .await?;
    db.salons()
        .grant(&uptown.id, &sam.id, PermissionKind::ManageInventory)
        .await?;
    println!("✓ Salons {} and {} (child)", downtown.name, uptown.name);

    // Staff
    let today = Utc::now().date_naive();
    let mut barbers = Vec::new();
    for user in [&dave, &sam] {
        db.assignments()
            .create(
                &downtown.id,
                NewAssignment {
                    barber_user_id: user.id.clone(),
                    start_date: today - Duration::days(30),
                    end_date: today + Duration::days(335),
                },
            )
            .await?;
        let barber = db
            .barbers()
            .create(
                &downtown.id,
                NewBarber {
                    user_id: user.id.clone(),
                    barber_type_id: senior.id.clone(),
                    address: "1 Main Street".to_string(),
                    phone: "555-0101".to_string(),
                },
            )
            .await?;
        barbers.push(barber);
    }
    let client = db
        .clients()
        .create(
            &downtown.id,
            NewClient {
                user_id: carl.id.clone(),
                address: None,
                phone: Some("555-0199".to_string()),
            },
        )
        .await?;
    println!("✓ {} barbers and 1 client", barbers.len());

    // Registers
    let till = db
        .cash_registers()
        .create(
            &downtown.id,
            NewCashRegister {
                name: "Front desk".to_string(),
                currency_id: Some(usd.id.clone()),
                opening_balance: Money::from_cents(50_000),
            },
        )
        .await?;
    db.cash_registers()
        .create(
            &downtown.id,
            NewCashRegister {
                name: "Euro box".to_string(),
                currency_id: Some(eur.id.clone()),
                opening_balance: Money::zero(),
            },
        )
        .await?;

    // Services
    let mut hairstyles = Vec::new();
    for (name, tariff) in HAIRSTYLES {
        let hairstyle = db
            .hairstyles()
            .create(
                &downtown.id,
                NewHairstyle {
                    name: name.to_string(),
                    current_tariff: Money::from_cents(*tariff),
                    currency_id: Some(usd.id.clone()),
                },
            )
            .await?;
        hairstyles.push(hairstyle);
    }

    let mut completed = Vec::new();
    for (n, hairstyle) in hairstyles.iter().enumerate() {
        let barber = &barbers[n % barbers.len()];
        let status = if n + 1 == hairstyles.len() {
            ShaveStatus::Scheduled
        } else {
            ShaveStatus::Completed
        };
        let shave = db
            .shaves()
            .create(
                &downtown.id,
                NewShave {
                    barber_id: barber.id.clone(),
                    hairstyle_id: hairstyle.id.clone(),
                    amount: None,
                    currency_id: None,
                    exchange_rate: ExchangeRate::one(),
                    client_id: Some(client.id.clone()),
                    cash_register_id: till.id.clone(),
                    shave_date: today - Duration::days(n as i64),
                    status,
                },
            )
            .await?;
        if shave.status == ShaveStatus::Completed {
            completed.push(shave);
        }
    }
    println!("✓ {} hairstyles, {} completed shaves", hairstyles.len(), completed.len());

    // Inventory
    let mut items = Vec::new();
    for (name, price, stock) in ITEMS {
        let item = db
            .items()
            .create(
                &downtown.id,
                NewItem {
                    name: name.to_string(),
                    price: Money::from_cents(*price),
                    currency_id: None,
                    exchange_rate: ExchangeRate::one(),
                    current_stock: *stock,
                    purposes: vec![hairstyles[0].id.clone()],
                },
            )
            .await?;
        items.push(item);
    }
    db.item_purchases()
        .create(
            &downtown.id,
            NewItemPurchase {
                item_id: items[0].id.clone(),
                quantity: 5,
                purchase_price: Money::from_cents(700),
                currency_id: None,
                exchange_rate: ExchangeRate::one(),
                purchase_date: today,
                supplier: "Barber Supply Co".to_string(),
                cash_register_id: till.id.clone(),
            },
        )
        .await?;
    if let Some(shave) = completed.first() {
        db.item_usages()
            .create(
                &downtown.id,
                NewItemUsage {
                    item_id: items[0].id.clone(),
                    shave_id: Some(shave.id.clone()),
                    barber_id: Some(shave.barber_id.clone()),
                    quantity: 1,
                    note: "Finish".to_string(),
                },
            )
            .await?;
    }
    println!("✓ {} items with one purchase and one usage", items.len());

    // Finance
    db.payments()
        .create(
            &downtown.id,
            NewPayment {
                barber_id: barbers[0].id.clone(),
                amount: Money::from_cents(40_000),
                currency_id: None,
                exchange_rate: ExchangeRate::one(),
                start_date: today - Duration::days(30),
                end_date: today,
                payment_type_id: Some(salary.id.clone()),
                cash_register_id: till.id.clone(),
                payment_date: today,
            },
        )
        .await?;
    db.transalons()
        .create(
            &downtown.id,
            NewTransalon {
                name: "Monthly rent".to_string(),
                amount: Money::from_cents(15_000),
                currency_id: None,
                exchange_rate: ExchangeRate::one(),
                transaction_date: today,
                kind: TransactionKind::Expenses,
                cash_register_id: till.id.clone(),
            },
        )
        .await?;

    let till = db.cash_registers().get(&downtown.id, &till.id).await?;
    let revenue = db.shaves().revenue(&downtown.id, None, None).await?;
    let inventory = db.items().inventory_value(&downtown.id).await?;

    println!();
    println!("  Front desk balance: {} {}", till.balance(), usd.code);
    println!("  Revenue:            {} {}", revenue, usd.code);
    println!("  Inventory value:    {} {}", inventory, usd.code);
    println!();
    println!("✓ Seed complete! Log in as owner@salon.dev");

    Ok(())
}

fn hash_password(password: &str) -> Result<String, Box<dyn std::error::Error>> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?;
    Ok(hash.to_string())
}

//! # dealer-db: Persistence and Reservation Ledger
//!
//! SQLite storage for the dealership sales pipeline, using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dealer Sales Data Flow                           │
//! │                                                                         │
//! │  QuotationService::create_quotation                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dealer-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │    Ledger    │  │   │
//! │  │   │   (pool.rs)   │    │               │    │ (ledger.rs)  │  │   │
//! │  │   │               │    │ Stock         │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Quotation     │    │ plan → CAS   │  │   │
//! │  │   │ Transactions  │    │ Invoice       │    │ flips → qty  │  │   │
//! │  │   │ Migrations    │    │ Directory     │    │              │  │   │
//! │  │   └───────────────┘    │ Expense       │    └──────────────┘  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`ledger`] - VIN reservation ledger
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dealer_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./dealer.db")).await?;
//! let outcome = db.ledger().reserve(&stock_item_id, &chassis_numbers).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::{ReservationLedger, ReservationRequest};
pub use pool::{Database, DbConfig};

pub use repository::directory::DirectoryRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::quotation::QuotationRepository;
pub use repository::stock::{CostPrice, StockRepository};

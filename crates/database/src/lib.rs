//! # Stockfolio Database Crate
//!
//! This crate is the PostgreSQL-backed archive of daily prices, stock lists and
//! portfolios.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** This crate encapsulates all database-specific logic. The analytics
//!   engine only ever sees it through the `PriceHistoryStore` trait, which `DbRepository`
//!   implements.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent database access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: A utility to apply database migrations, ensuring the schema is up-to-date.
//! - `DbRepository`: Holds the pool and provides the price and holdings queries.
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::{DbRepository, InsertOutcome};

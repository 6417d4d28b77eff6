use crate::DbError;
use analytics::{PriceHistoryStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{Holding, PriceBar, PricePoint};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// Whether an upsert created a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Updated,
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

fn price_point(row: &PgRow) -> Result<PricePoint, sqlx::Error> {
    Ok(PricePoint::new(row.try_get("date")?, row.try_get("close_price")?))
}

fn holding(row: &PgRow) -> Result<Holding, sqlx::Error> {
    let company_name: String = row.try_get("company_name")?;
    Ok(Holding::new(
        row.try_get::<String, _>("symbol")?,
        row.try_get("quantity")?,
        row.try_get("current_price")?,
    )
    .with_company_name(company_name))
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers `symbol` if it is not known yet. An existing company name is left alone.
    pub async fn ensure_stock(&self, symbol: &str, company_name: &str) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO stock (symbol, company_name) VALUES ($1, $2) ON CONFLICT (symbol) DO NOTHING",
        )
        .bind(symbol)
        .bind(company_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Saves a bar for the bulk import path.
    ///
    /// Re-importing the same (symbol, date) overwrites the stored values, so an import
    /// can be repeated safely.
    pub async fn upsert_price_bar(&self, bar: &PriceBar) -> Result<InsertOutcome, DbError> {
        bar.validate()?;
        // `xmax = 0` only holds for a freshly inserted tuple.
        let row = sqlx::query(
            r#"
            INSERT INTO stockdata (symbol, date, open_price, high_price, low_price, close_price, volume)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (symbol, date) DO UPDATE SET
                open_price = EXCLUDED.open_price,
                high_price = EXCLUDED.high_price,
                low_price = EXCLUDED.low_price,
                close_price = EXCLUDED.close_price,
                volume = EXCLUDED.volume
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&bar.symbol)
        .bind(bar.date)
        .bind(bar.open_price)
        .bind(bar.high_price)
        .bind(bar.low_price)
        .bind(bar.close_price)
        .bind(bar.volume)
        .fetch_one(&self.pool)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Updated
        })
    }

    /// Saves a manually entered bar.
    ///
    /// Unlike the import path this refuses to create stocks or overwrite history: an
    /// unknown symbol is `NotFound` and an existing row for the date is `Duplicate`.
    pub async fn insert_price_bar(&self, bar: &PriceBar) -> Result<(), DbError> {
        bar.validate()?;
        let mut tx = self.pool.begin().await?;

        let known = sqlx::query("SELECT symbol FROM stock WHERE symbol = $1")
            .bind(&bar.symbol)
            .fetch_optional(&mut *tx)
            .await?;
        if known.is_none() {
            return Err(DbError::NotFound(format!("stock {}", bar.symbol)));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO stockdata (symbol, date, open_price, high_price, low_price, close_price, volume)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (symbol, date) DO NOTHING
            "#,
        )
        .bind(&bar.symbol)
        .bind(bar.date)
        .bind(bar.open_price)
        .bind(bar.high_price)
        .bind(bar.low_price)
        .bind(bar.close_price)
        .bind(bar.volume)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if inserted == 0 {
            return Err(DbError::Duplicate(format!(
                "price data for {} on {} already exists",
                bar.symbol, bar.date
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    /// The items of a stock list, valued at each symbol's latest close (0 if it has none).
    pub async fn get_stock_list_holdings(&self, list_id: i32) -> Result<Vec<Holding>, DbError> {
        let exists = sqlx::query("SELECT listid FROM stocklist WHERE listid = $1")
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::NotFound(format!("stock list {list_id}")));
        }

        let rows = sqlx::query(
            r#"
            WITH latest_prices AS (
                SELECT DISTINCT ON (symbol) symbol, close_price
                FROM stockdata
                ORDER BY symbol, date DESC
            )
            SELECT sli.symbol, s.company_name, sli.quantity,
                   COALESCE(lp.close_price, 0) AS current_price
            FROM stocklistitem sli
            JOIN stock s ON sli.symbol = s.symbol
            LEFT JOIN latest_prices lp ON sli.symbol = lp.symbol
            WHERE sli.listid = $1
            ORDER BY sli.symbol
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(holding).collect::<Result<_, _>>()?)
    }

    /// The holdings of a portfolio, valued at each symbol's latest close (0 if it has none).
    pub async fn get_portfolio_holdings(&self, portfolio_id: i32) -> Result<Vec<Holding>, DbError> {
        let exists = sqlx::query("SELECT portfolioid FROM portfolio WHERE portfolioid = $1")
            .bind(portfolio_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::NotFound(format!("portfolio {portfolio_id}")));
        }

        let rows = sqlx::query(
            r#"
            WITH latest_prices AS (
                SELECT DISTINCT ON (symbol) symbol, close_price
                FROM stockdata
                ORDER BY symbol, date DESC
            )
            SELECT sh.symbol, s.company_name, sh.quantity,
                   COALESCE(lp.close_price, 0) AS current_price
            FROM stockholding sh
            JOIN stock s ON sh.symbol = s.symbol
            LEFT JOIN latest_prices lp ON sh.symbol = lp.symbol
            WHERE sh.portfolioid = $1
            ORDER BY sh.symbol
            "#,
        )
        .bind(portfolio_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(holding).collect::<Result<_, _>>()?)
    }

    async fn fetch_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT date, close_price
            FROM stockdata
            WHERE symbol = $1 AND date >= $2 AND date <= $3
            ORDER BY date ASC
            "#,
        )
        .bind(symbol)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(price_point).collect::<Result<_, _>>()?)
    }

    async fn fetch_recent_prices(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT date, close_price FROM stockdata WHERE symbol = $1 ORDER BY date DESC LIMIT $2",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(price_point).collect::<Result<_, _>>()?)
    }

    async fn fetch_latest_price(&self, symbol: &str) -> Result<Option<PricePoint>, DbError> {
        let row = sqlx::query(
            "SELECT date, close_price FROM stockdata WHERE symbol = $1 ORDER BY date DESC LIMIT 1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(price_point).transpose()?)
    }
}

#[async_trait]
impl PriceHistoryStore for DbRepository {
    async fn get_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, StoreError> {
        Ok(self.fetch_prices(symbol, start, end).await?)
    }

    async fn get_recent_prices(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<PricePoint>, StoreError> {
        Ok(self.fetch_recent_prices(symbol, limit).await?)
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<Option<PricePoint>, StoreError> {
        Ok(self.fetch_latest_price(symbol).await?)
    }
}

//! One-time database seeding from a directory of JSON files
//!
//! Each file holds an array of rows for one entity. The set of entities is
//! closed: a file name outside [`SeedEntity`] is rejected up front instead of
//! being looked up by name at runtime.

use std::fmt;
use std::path::{Path, PathBuf};

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::de::DeserializeOwned;

use crate::db::models::*;
use crate::db::repository;
use crate::db::schema::*;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedEntity {
    Products,
    ExpenseSummary,
    Sales,
    SalesSummary,
    Purchases,
    PurchaseSummary,
    Users,
    Expenses,
    ExpenseByCategory,
}

impl SeedEntity {
    /// Load order; referenced rows come before the rows that reference them
    pub const ORDERED: [SeedEntity; 9] = [
        SeedEntity::Products,
        SeedEntity::ExpenseSummary,
        SeedEntity::Sales,
        SeedEntity::SalesSummary,
        SeedEntity::Purchases,
        SeedEntity::PurchaseSummary,
        SeedEntity::Users,
        SeedEntity::Expenses,
        SeedEntity::ExpenseByCategory,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            SeedEntity::Products => "products.json",
            SeedEntity::ExpenseSummary => "expenseSummary.json",
            SeedEntity::Sales => "sales.json",
            SeedEntity::SalesSummary => "salesSummary.json",
            SeedEntity::Purchases => "purchases.json",
            SeedEntity::PurchaseSummary => "purchaseSummary.json",
            SeedEntity::Users => "users.json",
            SeedEntity::Expenses => "expenses.json",
            SeedEntity::ExpenseByCategory => "expenseByCategory.json",
        }
    }

    pub fn from_file_name(name: &str) -> Result<Self> {
        Self::ORDERED
            .into_iter()
            .find(|entity| entity.file_name() == name)
            .ok_or_else(|| Error::UnknownSeedEntity(name.to_string()))
    }

    fn clear(self, conn: &mut SqliteConnection) -> QueryResult<usize> {
        match self {
            SeedEntity::Products => diesel::delete(products::table).execute(conn),
            SeedEntity::ExpenseSummary => diesel::delete(expense_summary::table).execute(conn),
            SeedEntity::Sales => diesel::delete(sales::table).execute(conn),
            SeedEntity::SalesSummary => diesel::delete(sales_summary::table).execute(conn),
            SeedEntity::Purchases => diesel::delete(purchases::table).execute(conn),
            SeedEntity::PurchaseSummary => diesel::delete(purchase_summary::table).execute(conn),
            SeedEntity::Users => diesel::delete(users::table).execute(conn),
            SeedEntity::Expenses => diesel::delete(expenses::table).execute(conn),
            SeedEntity::ExpenseByCategory => {
                diesel::delete(expense_by_category::table).execute(conn)
            }
        }
    }

    fn load(self, conn: &mut SqliteConnection, path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(path)?;

        let inserted = match self {
            SeedEntity::Products => repository::insert_products(conn, &parse::<Product>(path, &raw)?)?,
            SeedEntity::ExpenseSummary => {
                repository::insert_expense_summary(conn, &parse::<ExpenseSummary>(path, &raw)?)?
            }
            SeedEntity::Sales => repository::insert_sales(conn, &parse::<Sale>(path, &raw)?)?,
            SeedEntity::SalesSummary => repository::insert_sales_summary(conn, &parse::<SalesSummary>(path, &raw)?)?,
            SeedEntity::Purchases => repository::insert_purchases(conn, &parse::<Purchase>(path, &raw)?)?,
            SeedEntity::PurchaseSummary => {
                repository::insert_purchase_summary(conn, &parse::<PurchaseSummary>(path, &raw)?)?
            }
            SeedEntity::Users => repository::insert_users(conn, &parse::<User>(path, &raw)?)?,
            SeedEntity::Expenses => repository::insert_expenses(conn, &parse::<Expense>(path, &raw)?)?,
            SeedEntity::ExpenseByCategory => {
                repository::insert_expense_by_category(conn, &parse::<ExpenseByCategory>(path, &raw)?)?
            }
        };

        Ok(inserted)
    }
}

impl fmt::Display for SeedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

fn parse<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<Vec<T>> {
    serde_json::from_str(raw).map_err(|source| Error::SeedFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Rows inserted per entity, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub loaded: Vec<(SeedEntity, usize)>,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.loaded.iter().map(|(_, count)| count).sum()
    }
}

/// Replace the contents of every table with the files in `dir`
pub fn seed_directory(conn: &mut SqliteConnection, dir: &Path) -> Result<SeedReport> {
    seed_entities(conn, dir, &SeedEntity::ORDERED)
}

/// Replace the contents of the given entities' tables with their files in `dir`
///
/// Runs in one transaction: either every entity is reloaded or none is.
pub fn seed_entities(
    conn: &mut SqliteConnection,
    dir: &Path,
    entities: &[SeedEntity],
) -> Result<SeedReport> {
    let selected: Vec<SeedEntity> = SeedEntity::ORDERED
        .into_iter()
        .filter(|entity| entities.contains(entity))
        .collect();

    let files: Vec<(SeedEntity, PathBuf)> = selected
        .iter()
        .map(|entity| (*entity, dir.join(entity.file_name())))
        .collect();
    if let Some((_, missing)) = files.iter().find(|(_, path)| !path.is_file()) {
        return Err(Error::MissingSeedFile(missing.clone()));
    }

    conn.transaction::<_, Error, _>(|conn| {
        for entity in selected.iter().rev() {
            let cleared = entity.clear(conn)?;
            log::info!("Cleared {} rows for {}", cleared, entity);
        }

        let mut report = SeedReport::default();
        for (entity, path) in &files {
            let inserted = entity.load(conn, path)?;
            log::info!("Seeded {} rows from {}", inserted, entity);
            report.loaded.push((*entity, inserted));
        }

        Ok(report)
    })
}

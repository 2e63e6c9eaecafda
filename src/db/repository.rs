//! Repository functions for the dashboard queries and seeding

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use super::models::*;
use super::schema::*;

/// Number of products on the popular products card
pub const POPULAR_PRODUCTS_LIMIT: i64 = 15;
/// Number of rows on each summary card
pub const SUMMARY_LIMIT: i64 = 5;

// ============================================================================
// Dashboard Repository
// ============================================================================

pub fn get_popular_products(conn: &mut SqliteConnection, limit: i64) -> QueryResult<Vec<Product>> {
    products::table
        .order(products::stock_quantity.desc())
        .limit(limit)
        .load(conn)
}

pub fn get_sales_summary(conn: &mut SqliteConnection, limit: i64) -> QueryResult<Vec<SalesSummary>> {
    sales_summary::table
        .order(sales_summary::date.desc())
        .limit(limit)
        .load(conn)
}

pub fn get_purchase_summary(
    conn: &mut SqliteConnection,
    limit: i64,
) -> QueryResult<Vec<PurchaseSummary>> {
    purchase_summary::table
        .order(purchase_summary::date.desc())
        .limit(limit)
        .load(conn)
}

pub fn get_expense_summary(
    conn: &mut SqliteConnection,
    limit: i64,
) -> QueryResult<Vec<ExpenseSummary>> {
    expense_summary::table
        .order(expense_summary::date.desc())
        .limit(limit)
        .load(conn)
}

pub fn get_expense_by_category(
    conn: &mut SqliteConnection,
    limit: i64,
) -> QueryResult<Vec<ExpenseByCategory>> {
    expense_by_category::table
        .order(expense_by_category::date.desc())
        .limit(limit)
        .load(conn)
}

// ============================================================================
// Product Repository
// ============================================================================

/// Products whose name contains `search`, or every product when no search is given
pub fn get_products(conn: &mut SqliteConnection, search: Option<&str>) -> QueryResult<Vec<Product>> {
    let mut query = products::table.order(products::name.asc()).into_boxed();

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", escape_like(term));
        query = query.filter(products::name.like(pattern).escape('\\'));
    }

    query.load(conn)
}

/// Escape LIKE wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// Seeding
// ============================================================================

pub fn insert_products(conn: &mut SqliteConnection, rows: &[Product]) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(products::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_users(conn: &mut SqliteConnection, rows: &[User]) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(users::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_sales(conn: &mut SqliteConnection, rows: &[Sale]) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(sales::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_purchases(conn: &mut SqliteConnection, rows: &[Purchase]) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(purchases::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_expenses(conn: &mut SqliteConnection, rows: &[Expense]) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(expenses::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_sales_summary(conn: &mut SqliteConnection, rows: &[SalesSummary]) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(sales_summary::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_purchase_summary(
    conn: &mut SqliteConnection,
    rows: &[PurchaseSummary],
) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(purchase_summary::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_expense_summary(
    conn: &mut SqliteConnection,
    rows: &[ExpenseSummary],
) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(expense_summary::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

pub fn insert_expense_by_category(
    conn: &mut SqliteConnection,
    rows: &[ExpenseByCategory],
) -> QueryResult<usize> {
    let mut inserted = 0;
    for row in rows {
        inserted += diesel::insert_into(expense_by_category::table).values(row).execute(conn)?;
    }
    Ok(inserted)
}

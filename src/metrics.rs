//! The aggregated dashboard payload served on `GET /dashboard`

use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

use crate::db::models::{ExpenseByCategory, ExpenseSummary, Product, PurchaseSummary, SalesSummary};
use crate::db::repository::{self, POPULAR_PRODUCTS_LIMIT, SUMMARY_LIMIT};
use crate::error::Result;

/// Everything the dashboard cards render, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    /// Highest stock quantity first
    pub popular_products: Vec<Product>,
    pub sales_summary: Vec<SalesSummary>,
    pub purchase_summary: Vec<PurchaseSummary>,
    pub expense_summary: Vec<ExpenseSummary>,
    pub expense_by_category_summary: Vec<ExpenseByCategory>,
}

impl DashboardMetrics {
    /// Load the dashboard from the database
    pub fn load(conn: &mut SqliteConnection) -> Result<Self> {
        Ok(Self {
            popular_products: repository::get_popular_products(conn, POPULAR_PRODUCTS_LIMIT)?,
            sales_summary: repository::get_sales_summary(conn, SUMMARY_LIMIT)?,
            purchase_summary: repository::get_purchase_summary(conn, SUMMARY_LIMIT)?,
            expense_summary: repository::get_expense_summary(conn, SUMMARY_LIMIT)?,
            expense_by_category_summary: repository::get_expense_by_category(conn, SUMMARY_LIMIT)?,
        })
    }
}

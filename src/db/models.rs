//! Database models for the inventory store
//!
//! These structs map to the database tables defined in schema.rs. They double
//! as the JSON records served by the metrics endpoint and read from seed files,
//! so field names are camelCase on the wire.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::*;
use crate::wire::{decimal_string, timestamp};

// ============================================================================
// Product
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub rating: Option<f64>,
    pub stock_quantity: i32,
}

// ============================================================================
// User
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

// ============================================================================
// Sale / Purchase / Expense
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = sales)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub sale_id: String,
    pub product_id: String,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub quantity: i32,
    pub unit_price: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub purchase_id: String,
    pub product_id: String,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub quantity: i32,
    pub unit_cost: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = expenses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub expense_id: String,
    pub category: String,
    pub amount: f64,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
}

// ============================================================================
// Summaries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = sales_summary)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub sales_summary_id: String,
    pub total_value: f64,
    pub change_percentage: Option<f64>,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = purchase_summary)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    pub purchase_summary_id: String,
    pub total_purchased: f64,
    pub change_percentage: Option<f64>,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = expense_summary)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub expense_summary_id: String,
    pub total_expenses: f64,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
}

/// Amount is decimal text, never a float, from the seed file to the client.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = expense_by_category)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ExpenseByCategory {
    pub expense_by_category_id: String,
    pub expense_summary_id: String,
    pub category: String,
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub amount: String,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
}

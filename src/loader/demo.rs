//! Built-in ERP demo catalog: stock levels, customer balances and sales
//! orders of a building-materials distributor.

use crate::codec::LogicalValue;
use crate::records::RowValues;
use crate::schema::{FieldSpec, FieldType};

use super::bulk::{SampleRows, TableSpec};

/// Table definitions plus their sample rows
#[derive(Debug, Clone)]
pub struct Catalog {
    pub tables: Vec<TableSpec>,
    pub rows: SampleRows,
}

pub const STOCK: &str = "erp_stock";
pub const CUSTOMER_BALANCES: &str = "erp_customer_balances";
pub const SALES_ORDERS: &str = "erp_sales_orders";

const ORDER_STATES: [&str; 6] = [
    "New",
    "Awaiting Approval",
    "Approved",
    "In Production",
    "Preparing",
    "Delivered",
];

pub fn erp_catalog() -> Catalog {
    let tables = vec![
        TableSpec::new(STOCK, "ERP Stock Levels")
            .field(FieldSpec::new("material_code", FieldType::ShortText).required(true))
            .field(FieldSpec::new("material_name", FieldType::ShortText))
            .field(FieldSpec::new("quantity", FieldType::Number))
            .field(FieldSpec::new("unit", FieldType::ShortText))
            .field(FieldSpec::new("warehouse", FieldType::ShortText))
            .field(FieldSpec::new("minimum_stock", FieldType::Number)),
        TableSpec::new(CUSTOMER_BALANCES, "ERP Customer Balances")
            .field(FieldSpec::new("customer_code", FieldType::ShortText).required(true))
            .field(FieldSpec::new("customer_name", FieldType::ShortText))
            .field(FieldSpec::new("debit", FieldType::Number))
            .field(FieldSpec::new("credit", FieldType::Number))
            .field(FieldSpec::new("balance", FieldType::Number))
            .field(FieldSpec::new("last_transaction", FieldType::DateTime)),
        TableSpec::new(SALES_ORDERS, "ERP Sales Orders")
            .field(FieldSpec::new("order_no", FieldType::ShortText).required(true))
            .field(FieldSpec::new("customer_code", FieldType::ShortText))
            .field(FieldSpec::new("customer_name", FieldType::ShortText))
            .field(FieldSpec::new("order_date", FieldType::DateTime))
            .field(FieldSpec::new("delivery_date", FieldType::DateTime))
            .field(FieldSpec::new("total_amount", FieldType::Number))
            .field(FieldSpec::new("status", FieldType::single_select(ORDER_STATES))),
    ];

    let mut rows = SampleRows::new();
    rows.insert(STOCK.to_string(), stock_rows());
    rows.insert(CUSTOMER_BALANCES.to_string(), balance_rows());
    rows.insert(SALES_ORDERS.to_string(), order_rows());

    Catalog { tables, rows }
}

fn row<const N: usize>(pairs: [(&str, LogicalValue); N]) -> RowValues {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn stock_rows() -> Vec<RowValues> {
    [
        ("MAT001", "Cement 42.5R", 1500, "TON", "WH-01", 500),
        ("MAT002", "Rebar Ø12", 250, "TON", "WH-01", 100),
        ("MAT003", "Sand", 3000, "M3", "WH-02", 1000),
        ("MAT004", "Gravel", 2500, "M3", "WH-02", 800),
        ("MAT005", "Brick", 50000, "PCS", "WH-03", 10000),
        ("MAT006", "Plaster", 120, "TON", "WH-01", 50),
        ("MAT007", "Paint", 800, "L", "WH-04", 200),
        ("MAT008", "Ceramic Tile", 5000, "M2", "WH-03", 1500),
    ]
    .into_iter()
    .map(|(code, name, quantity, unit, warehouse, minimum)| {
        row([
            ("material_code", LogicalValue::text(code)),
            ("material_name", LogicalValue::text(name)),
            ("quantity", LogicalValue::from(quantity as i64)),
            ("unit", LogicalValue::text(unit)),
            ("warehouse", LogicalValue::text(warehouse)),
            ("minimum_stock", LogicalValue::from(minimum as i64)),
        ])
    })
    .collect()
}

fn balance_rows() -> Vec<RowValues> {
    [
        ("CUS001", "ABC İnşaat A.Ş.", 150000, 75000, -75000, "2024-01-15"),
        ("CUS002", "XYZ Yapı Ltd.", 85000, 120000, 35000, "2024-01-20"),
        ("CUS003", "Mega İnşaat", 320000, 280000, -40000, "2024-01-18"),
        ("CUS004", "Güven Yapı", 45000, 45000, 0, "2024-01-22"),
        ("CUS005", "Star İnşaat", 200000, 150000, -50000, "2024-01-25"),
        ("CUS006", "Doğa Yapı", 60000, 90000, 30000, "2024-01-23"),
    ]
    .into_iter()
    .map(|(code, name, debit, credit, balance, last)| {
        row([
            ("customer_code", LogicalValue::text(code)),
            ("customer_name", LogicalValue::text(name)),
            ("debit", LogicalValue::from(debit as i64)),
            ("credit", LogicalValue::from(credit as i64)),
            ("balance", LogicalValue::from(balance as i64)),
            // Bare dates are read as midnight UTC.
            ("last_transaction", LogicalValue::text(last)),
        ])
    })
    .collect()
}

fn order_rows() -> Vec<RowValues> {
    [
        ("ORD001", "CUS001", "ABC İnşaat A.Ş.", "2024-01-10", "2024-01-25", 75000, "Delivered"),
        ("ORD002", "CUS002", "XYZ Yapı Ltd.", "2024-01-12", "2024-01-28", 120000, "Preparing"),
        ("ORD003", "CUS003", "Mega İnşaat", "2024-01-15", "2024-02-01", 280000, "Awaiting Approval"),
        ("ORD004", "CUS001", "ABC İnşaat A.Ş.", "2024-01-18", "2024-02-05", 95000, "In Production"),
        ("ORD005", "CUS004", "Güven Yapı", "2024-01-20", "2024-02-10", 45000, "Preparing"),
        ("ORD006", "CUS005", "Star İnşaat", "2024-01-22", "2024-02-08", 150000, "Approved"),
        ("ORD007", "CUS006", "Doğa Yapı", "2024-01-24", "2024-02-12", 90000, "Preparing"),
        ("ORD008", "CUS002", "XYZ Yapı Ltd.", "2024-01-25", "2024-02-15", 65000, "New"),
    ]
    .into_iter()
    .map(|(order, code, name, ordered, delivery, total, status)| {
        row([
            ("order_no", LogicalValue::text(order)),
            ("customer_code", LogicalValue::text(code)),
            ("customer_name", LogicalValue::text(name)),
            ("order_date", LogicalValue::text(ordered)),
            ("delivery_date", LogicalValue::text(delivery)),
            ("total_amount", LogicalValue::from(total as i64)),
            ("status", LogicalValue::Choice(status.to_string())),
        ])
    })
    .collect()
}

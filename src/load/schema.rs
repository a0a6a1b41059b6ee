// src/load/schema.rs

use crate::error::{EtlError, Result};
use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use regex::Regex;

/// Column name and ClickHouse type of the target table, in insert order.
pub const TARGET_COLUMNS: &[(&str, &str)] = &[
    ("customer_id", "UInt32"),
    ("first_name", "String"),
    ("last_name", "String"),
    ("full_name", "String"),
    ("company", "String"),
    ("city", "String"),
    ("country", "String"),
    ("phone_1", "String"),
    ("phone_2", "String"),
    ("email", "String"),
    ("subscription_date", "DateTime"),
    ("website", "String"),
];

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex")
});

pub fn expected_columns() -> Vec<&'static str> {
    TARGET_COLUMNS.iter().map(|(name, _)| *name).collect()
}

/// Table names are spliced into SQL, so only plain identifiers
/// (optionally `db.table`) are accepted.
pub fn validate_table_name(table: &str) -> Result<()> {
    if TABLE_NAME.is_match(table) {
        Ok(())
    } else {
        Err(EtlError::InvalidTableName(table.to_string()))
    }
}

/// Every target column absent from `batch`, in target order.
pub fn missing_columns(batch: &RecordBatch) -> Vec<String> {
    let schema = batch.schema();
    TARGET_COLUMNS
        .iter()
        .filter(|(name, _)| schema.index_of(name).is_err())
        .map(|(name, _)| name.to_string())
        .collect()
}

pub fn check_columns(batch: &RecordBatch) -> Result<()> {
    let missing = missing_columns(batch);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::SchemaMismatch { missing })
    }
}

pub fn create_table_sql(table: &str) -> String {
    let cols: Vec<String> = TARGET_COLUMNS
        .iter()
        .map(|(name, ty)| format!("    {} {}", name, ty))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)\nENGINE = MergeTree()\nORDER BY customer_id",
        table,
        cols.join(",\n")
    )
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT count(*) AS cnt FROM {}", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, UInt32Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_table_names() {
        for ok in ["customers", "customers_test", "analytics.customers", "_t1"] {
            assert!(validate_table_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "1abc", "customers; DROP TABLE x", "a.b.c", "cust-omers"] {
            assert!(validate_table_name(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_missing_columns_lists_all() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("customer_id", DataType::UInt32, true),
            Field::new("first_name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt32Array::from(vec![1])) as ArrayRef,
                Arc::new(arrow::array::StringArray::from(vec!["A"])),
            ],
        )
        .unwrap();

        let missing = missing_columns(&batch);
        assert_eq!(missing.len(), 10);
        assert_eq!(missing[0], "last_name");
        assert!(missing.contains(&"subscription_date".to_string()));
        assert!(missing.contains(&"website".to_string()));
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("customers");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS customers ("));
        assert!(sql.contains("customer_id UInt32,"));
        assert!(sql.contains("subscription_date DateTime,"));
        assert!(sql.contains("website String\n)"));
        assert!(sql.ends_with("ENGINE = MergeTree()\nORDER BY customer_id"));
    }
}

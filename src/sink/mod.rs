// src/sink/mod.rs
pub mod clickhouse;
pub mod memory;

pub use clickhouse::ClickHouseSink;
pub use memory::MemorySink;

use crate::error::Result;
use chrono::NaiveDateTime;

/// ClickHouse `DateTime` text layout.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One cell in the sink's insert format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    UInt32(u32),
    String(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::UInt32(v) => serde_json::Value::from(*v),
            Value::String(s) => serde_json::Value::from(s.as_str()),
            Value::DateTime(dt) => serde_json::Value::from(dt.format(DATETIME_FORMAT).to_string()),
        }
    }
}

/// The three operations the loader needs from an analytical store.
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Run a statement that returns nothing (DDL).
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Bulk-insert `rows`, each laid out in `columns` order, in one call.
    async fn insert(&self, table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Result<()>;

    /// Run a query and return its result rows as text cells.
    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>>;
}

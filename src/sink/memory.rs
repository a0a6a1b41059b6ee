// src/sink/memory.rs

use super::{Sink, Value};
use crate::error::{EtlError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};
use tracing::debug;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+TABLE\s+IF\s+NOT\s+EXISTS\s+([\w.]+)\s*\((.*)\)\s*ENGINE")
        .expect("valid regex")
});
static DROP_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*DROP\s+TABLE\s+IF\s+EXISTS\s+([\w.]+)\s*;?\s*$").expect("valid regex")
});
static SELECT_ONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*SELECT\s+1\s*;?\s*$").expect("valid regex"));
static COUNT_ROWS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*SELECT\s+count\(\s*\*\s*\)(?:\s+AS\s+\w+)?\s+FROM\s+([\w.]+)\s*;?\s*$")
        .expect("valid regex")
});

#[derive(Debug, Default, Clone)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemoryTable>,
    statements: Vec<String>,
    insert_calls: usize,
}

/// An in-process stand-in for ClickHouse that understands just the
/// statements the loader issues. Used by `--dry-run` and by tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<State>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| EtlError::Sink("memory sink lock poisoned".into()))
    }

    /// Snapshot of `table`, if it exists.
    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.lock().ok()?.tables.get(name).cloned()
    }

    /// Every statement passed to `execute` or `query`, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().map(|s| s.statements.clone()).unwrap_or_default()
    }

    pub fn insert_calls(&self) -> usize {
        self.lock().map(|s| s.insert_calls).unwrap_or_default()
    }
}

/// Column names out of a `name Type, name Type` list.
fn column_names(defs: &str) -> Vec<String> {
    defs.split(',')
        .filter_map(|d| d.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

impl Sink for MemorySink {
    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.statements.push(sql.to_string());

        if let Some(caps) = CREATE_TABLE.captures(sql) {
            let name = caps[1].to_string();
            let columns = column_names(&caps[2]);
            state
                .tables
                .entry(name)
                .or_insert_with(|| MemoryTable {
                    columns,
                    rows: Vec::new(),
                });
            return Ok(());
        }
        if let Some(caps) = DROP_TABLE.captures(sql) {
            state.tables.remove(&caps[1]);
            return Ok(());
        }
        Err(EtlError::Sink(format!("unsupported statement: {}", sql.trim())))
    }

    async fn insert(&self, table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Result<()> {
        let mut state = self.lock()?;
        state.insert_calls += 1;

        let target = state
            .tables
            .get_mut(table)
            .ok_or_else(|| EtlError::Sink(format!("table {table} does not exist")))?;

        let positions: Vec<usize> = columns
            .iter()
            .map(|c| {
                target
                    .columns
                    .iter()
                    .position(|tc| tc == c)
                    .ok_or_else(|| EtlError::Sink(format!("no column {c} in table {table}")))
            })
            .collect::<Result<_>>()?;

        let width = target.columns.len();
        for row in rows {
            if row.len() != columns.len() {
                return Err(EtlError::Sink(format!(
                    "row has {} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            let mut stored = vec![Value::Null; width];
            for (pos, value) in positions.iter().zip(row) {
                stored[*pos] = value;
            }
            target.rows.push(stored);
        }
        debug!(table, rows = target.rows.len(), "memory insert");
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut state = self.lock()?;
        state.statements.push(sql.to_string());

        if SELECT_ONE.is_match(sql) {
            return Ok(vec![vec!["1".to_string()]]);
        }
        let caps = COUNT_ROWS
            .captures(sql)
            .ok_or_else(|| EtlError::Sink(format!("unsupported query: {}", sql.trim())))?;
        let name = &caps[1];
        let count = state
            .tables
            .get(name)
            .map(|t| t.rows.len())
            .ok_or_else(|| EtlError::Sink(format!("table {name} does not exist")))?;
        Ok(vec![vec![count.to_string()]])
    }
}

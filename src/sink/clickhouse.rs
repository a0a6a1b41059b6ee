// src/sink/clickhouse.rs

use super::{Sink, Value};
use crate::config::ClickHouseConfig;
use crate::error::{EtlError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// ClickHouse over its HTTP interface.
pub struct ClickHouseSink {
    client: Client,
    endpoint: Url,
    username: String,
    password: String,
    database: Option<String>,
}

impl ClickHouseSink {
    pub fn new(cfg: &ClickHouseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint()?,
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            database: cfg.database.clone(),
        })
    }

    /// POST `body`, with `query` (if any) in the URL. Returns the response text.
    async fn post(&self, query: Option<&str>, body: String) -> Result<String> {
        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("X-ClickHouse-User", &self.username)
            .header("X-ClickHouse-Key", &self.password);
        if let Some(db) = &self.database {
            req = req.header("X-ClickHouse-Database", db);
        }
        if let Some(q) = query {
            req = req.query(&[("query", q)]);
        }

        let resp = req.body(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(EtlError::Sink(format!(
                "ClickHouse returned {}: {}",
                status,
                text.trim()
            )));
        }
        Ok(text)
    }
}

impl Sink for ClickHouseSink {
    #[instrument(level = "debug", skip(self))]
    async fn execute(&self, sql: &str) -> Result<()> {
        self.post(None, sql.to_string()).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    async fn insert(&self, table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Result<()> {
        let statement = insert_statement(table, columns);
        let body = json_each_row(columns, &rows)?;
        debug!(bytes = body.len(), "sending insert");
        self.post(Some(&statement), body).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let text = self
            .post(None, format!("{} FORMAT TabSeparated", sql.trim_end_matches(';')))
            .await?;
        Ok(parse_tab_separated(&text))
    }
}

fn insert_statement(table: &str, columns: &[&str]) -> String {
    format!(
        "INSERT INTO {} ({}) FORMAT JSONEachRow",
        table,
        columns.join(", ")
    )
}

/// One JSON object per line, keyed by column name.
fn json_each_row(columns: &[&str], rows: &[Vec<Value>]) -> Result<String> {
    let mut body = String::new();
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(EtlError::Sink(format!(
                "row {} has {} values for {} columns",
                idx,
                row.len(),
                columns.len()
            )));
        }
        let obj: serde_json::Map<String, serde_json::Value> = columns
            .iter()
            .zip(row)
            .map(|(c, v)| (c.to_string(), v.to_json()))
            .collect();
        body.push_str(&serde_json::Value::Object(obj).to_string());
        body.push('\n');
    }
    Ok(body)
}

/// Split a TabSeparated response into rows, undoing ClickHouse's escapes.
pub fn parse_tab_separated(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|l| !l.is_empty())
        .map(|line| line.split('\t').map(unescape_tsv).collect())
        .collect()
}

fn unescape_tsv(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

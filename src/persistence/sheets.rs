use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Ledger, LedgerError, LedgerResult, Rows};
use crate::config::SheetsConfig;

/// Google Sheets v4 values API, authenticated with a bearer token
#[derive(Clone)]
pub struct SheetsLedger {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Sheets returns numbers and booleans when a cell was not written as text
fn render_cell(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetsLedger {
    pub fn new(api_base: &str, spreadsheet_id: &str, access_token: &str) -> LedgerResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// `None` when the spreadsheet id or token is missing
    pub fn from_config(config: &SheetsConfig) -> Option<LedgerResult<Self>> {
        config
            .credentials()
            .map(|(id, token)| Self::new(&config.api_base, id, token))
    }

    fn values_url(&self, range: &str, action: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}{}",
            self.api_base, self.spreadsheet_id, range, action
        )
    }

    async fn send<T: DeserializeOwned + Default>(&self, request: RequestBuilder) -> LedgerResult<T> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LedgerError::Api {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&body).map_err(|e| LedgerError::Decode(format!("{}: {}", e, body)))
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn read(&self, range: &str) -> LedgerResult<Rows> {
        let request = self.client.get(self.values_url(range, ""));
        let values: ValueRange = self.send(request).await?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(render_cell).collect())
            .collect())
    }

    async fn update(&self, range: &str, rows: Rows) -> LedgerResult<()> {
        let request = self
            .client
            .put(self.values_url(range, ""))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }));
        let _: Value = self.send(request).await?;
        tracing::debug!("Updated {}", range);
        Ok(())
    }

    async fn append(&self, range: &str, rows: Rows) -> LedgerResult<()> {
        let count = rows.len();
        let request = self
            .client
            .post(self.values_url(range, ":append"))
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({
                "majorDimension": "ROWS",
                "values": rows,
            }));
        let _: Value = self.send(request).await?;
        tracing::debug!("Appended {} rows to {}", count, range);
        Ok(())
    }

    async fn clear(&self, range: &str) -> LedgerResult<()> {
        let request = self
            .client
            .post(self.values_url(range, ":clear"))
            .json(&json!({}));
        let _: Value = self.send(request).await?;
        tracing::debug!("Cleared {}", range);
        Ok(())
    }
}

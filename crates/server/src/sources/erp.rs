//! ERPNext REST client
//!
//! Talks to the Frappe API with token authentication. Callers that want
//! records regardless of connectivity go through the `*_or_demo` helpers,
//! which fall back to bundled sample data.

use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use template::{flatten_object, Record};

use super::demo;
use crate::config::ErpConfig;
use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Records plus whether they came from the bundled demo set
#[derive(Debug, Clone, Serialize)]
pub struct ErpRecords {
    pub records: Vec<Record>,
    pub demo: bool,
}

/// Result of a connectivity check
#[derive(Debug, Clone, Serialize)]
pub struct ErpStatus {
    pub configured: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ErpClient {
    http: Client,
    config: ErpConfig,
}

impl ErpClient {
    pub fn new(config: ErpConfig) -> AppResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| AppError::Erp(format!("invalid ERP base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Erp("ERP base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> AppResult<Value> {
        tracing::debug!(%url, "ERP request");
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.config.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Name of the user the API key belongs to
    pub async fn logged_user(&self) -> AppResult<String> {
        let url = self.url(&["api", "method", "frappe.auth.get_logged_user"])?;
        let body = self.get_json(url, &[]).await?;
        body.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::Erp("unexpected response from get_logged_user".to_string()))
    }

    /// Documents of a doctype with all their fields
    pub async fn list_documents(
        &self,
        doctype: &str,
        filters: Option<&Value>,
        limit: usize,
    ) -> AppResult<Vec<Record>> {
        let url = self.url(&["api", "resource", doctype])?;
        let mut query = vec![
            ("fields", r#"["*"]"#.to_string()),
            ("limit_page_length", limit.to_string()),
        ];
        if let Some(filters) = filters {
            query.push(("filters", filters.to_string()));
        }

        let body = self.get_json(url, &query).await?;
        match body.get("data") {
            Some(Value::Array(items)) => Ok(items.iter().filter_map(object_to_record).collect()),
            _ => Err(AppError::Erp(format!("unexpected response listing {doctype}"))),
        }
    }

    pub async fn get_document(&self, doctype: &str, name: &str) -> AppResult<Record> {
        let url = self.url(&["api", "resource", doctype, name])?;
        let body = self.get_json(url, &[]).await?;
        body.get("data")
            .and_then(object_to_record)
            .ok_or_else(|| AppError::Erp(format!("unexpected response for {doctype} {name}")))
    }

    /// Run a query report and return its rows keyed by column
    pub async fn run_report(&self, report: &str, filters: Option<&Value>) -> AppResult<Vec<Record>> {
        let url = self.url(&["api", "method", "frappe.desk.query_report.run"])?;
        let filters = filters.cloned().unwrap_or_else(|| Value::Object(Map::new()));
        let query = [
            ("report_name", report.to_string()),
            ("filters", filters.to_string()),
        ];

        let body = self.get_json(url, &query).await?;
        let message = body
            .get("message")
            .ok_or_else(|| AppError::Erp(format!("unexpected response running {report}")))?;
        Ok(report_rows(message))
    }
}

fn object_to_record(value: &Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(flatten_object(map.clone())),
        _ => None,
    }
}

/// Field name of a report column
///
/// Columns are either objects with `fieldname`/`label` or legacy
/// `"Label:Type/Options:Width"` strings.
fn column_name(column: &Value) -> Option<String> {
    let name = match column {
        Value::Object(map) => map
            .get("fieldname")
            .or_else(|| map.get("label"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(spec) => spec.split(':').next().map(|s| s.trim().to_string()),
        _ => None,
    };
    name.filter(|name| !name.is_empty())
}

/// Rows of a `query_report.run` message
///
/// Array rows are keyed by the column list; object rows are used as they are.
fn report_rows(message: &Value) -> Vec<Record> {
    let columns: Vec<String> = message
        .get("columns")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .enumerate()
                .map(|(idx, col)| column_name(col).unwrap_or_else(|| format!("column_{}", idx + 1)))
                .collect()
        })
        .unwrap_or_default();

    let Some(rows) = message.get("result").and_then(Value::as_array) else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(flatten_object(map.clone())),
            Value::Array(cells) => {
                let map: Map<String, Value> = columns
                    .iter()
                    .zip(cells)
                    .map(|(name, cell)| (name.clone(), cell.clone()))
                    .collect();
                Some(flatten_object(map))
            }
            _ => None,
        })
        .collect()
}

/// Connectivity check that never fails
pub async fn status(client: Option<&ErpClient>) -> ErpStatus {
    let Some(client) = client else {
        return ErpStatus {
            configured: false,
            connected: false,
            user: None,
            base_url: None,
            error: None,
        };
    };

    match client.logged_user().await {
        Ok(user) => ErpStatus {
            configured: true,
            connected: true,
            user: Some(user),
            base_url: Some(client.base_url().to_string()),
            error: None,
        },
        Err(e) => {
            tracing::warn!("ERP status check failed: {e}");
            ErpStatus {
                configured: true,
                connected: false,
                user: None,
                base_url: Some(client.base_url().to_string()),
                error: Some(e.to_string()),
            }
        }
    }
}

pub async fn documents_or_demo(
    client: Option<&ErpClient>,
    doctype: &str,
    filters: Option<&Value>,
    limit: usize,
) -> ErpRecords {
    if let Some(client) = client {
        match client.list_documents(doctype, filters, limit).await {
            Ok(records) => return ErpRecords { records, demo: false },
            Err(e) => tracing::warn!("ERP list of {doctype} failed, serving demo data: {e}"),
        }
    }
    let mut records = demo::documents(doctype);
    records.truncate(limit);
    ErpRecords { records, demo: true }
}

/// One document, from ERP or the demo set; `None` when neither has it
pub async fn document_or_demo(
    client: Option<&ErpClient>,
    doctype: &str,
    name: &str,
) -> Option<(Record, bool)> {
    if let Some(client) = client {
        match client.get_document(doctype, name).await {
            Ok(record) => return Some((record, false)),
            Err(e) => tracing::warn!("ERP fetch of {doctype} {name} failed, serving demo data: {e}"),
        }
    }
    demo::document(doctype, name).map(|record| (record, true))
}

pub async fn report_or_demo(
    client: Option<&ErpClient>,
    report: &str,
    filters: Option<&Value>,
) -> ErpRecords {
    if let Some(client) = client {
        match client.run_report(report, filters).await {
            Ok(records) => return ErpRecords { records, demo: false },
            Err(e) => tracing::warn!("ERP report {report} failed, serving demo data: {e}"),
        }
    }
    ErpRecords {
        records: demo::report(report),
        demo: true,
    }
}

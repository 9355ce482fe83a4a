//! # REST Transport
//!
//! Table-level access to a PostgREST-style service (`/rest/v1/<table>`).
//!
//! ```text
//! select  GET    /rest/v1/checklists?select=id,nome&user_id=eq.u1&order=created_at.desc
//! insert  POST   /rest/v1/checklists              Prefer: return=representation
//! update  PATCH  /rest/v1/checklists?id=eq.7&user_id=eq.u1   Prefer: return=minimal,count=exact
//! delete  DELETE /rest/v1/checklists?id=eq.7&user_id=eq.u1   Prefer: return=minimal,count=exact
//! upsert  POST   /rest/v1/users?on_conflict=id    Prefer: resolution=merge-duplicates
//! ```
//!
//! Every request carries the project key as `apikey` and a bearer token
//! (the signed-in user's access token, or the key itself).

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;

use super::MaybeSendSync;
use crate::codec::Row;
use crate::config::RemoteConfig;
use crate::error::{Error, Result};

/// Filters, projection and ordering for one table request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestQuery {
    /// Columns to return; all when `None`
    pub select: Option<Vec<String>>,
    /// `column = value` filters, all of which must match
    pub eq: Vec<(String, String)>,
    /// `(column, descending)` sort keys, in priority order
    pub order: Vec<(String, bool)>,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl RestQuery {
    /// Match every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Return only `columns`
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Require `column = value`
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }

    /// Sort descending by `column`
    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), true));
        self
    }

    /// Return at most `n` rows
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// PostgREST query-string parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(columns) = &self.select {
            params.push(("select".to_string(), columns.join(",")));
        }
        for (column, value) in &self.eq {
            params.push((column.clone(), format!("eq.{}", value)));
        }
        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|(c, desc)| format!("{}.{}", c, if *desc { "desc" } else { "asc" }))
                .collect();
            params.push(("order".to_string(), order.join(",")));
        }
        if let Some(n) = self.limit {
            params.push(("limit".to_string(), n.to_string()));
        }
        params
    }
}

/// Table operations against the remote service
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RestTransport: MaybeSendSync {
    /// Rows matching `query`
    async fn select(&self, table: &str, query: &RestQuery) -> Result<Vec<Row>>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Set `columns` on every row matching `query`; returns the number of rows
    async fn update(&self, table: &str, query: &RestQuery, columns: Row) -> Result<usize>;

    /// Delete every row matching `query`; returns the number of rows
    async fn delete(&self, table: &str, query: &RestQuery) -> Result<usize>;

    /// Insert or merge one row keyed by `on_conflict`
    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<()>;
}

// ============================================================================
// HTTP
// ============================================================================

/// [`RestTransport`] over HTTP with `reqwest`
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl HttpTransport {
    /// Build a transport; fails with `NotConfigured` unless URL and key are set
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let (Some(base_url), Some(api_key)) = (config.url.clone(), config.api_key.clone()) else {
            return Err(Error::NotConfigured(
                "remote URL and API key are required".into(),
            ));
        };
        let bearer = config.bearer().unwrap_or(api_key.as_str()).to_string();

        #[cfg(not(target_arch = "wasm32"))]
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        #[cfg(target_arch = "wasm32")]
        let client = reqwest::Client::new();

        Ok(Self {
            client,
            base_url,
            api_key,
            bearer,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    async fn checked(&self, request: RequestBuilder, table: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                table,
                status = status.as_u16(),
                message = %message,
                "Remote request rejected"
            );
            return Err(Error::RemoteRejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn send(&self, request: RequestBuilder, table: &str) -> Result<Vec<Row>> {
        let body = self.checked(request, table).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(rows_from(serde_json::from_str(&body)?))
    }

    /// Send without a response body and read the affected row count
    async fn send_counted(&self, request: RequestBuilder, table: &str) -> Result<usize> {
        let request = request.header("Prefer", "return=minimal,count=exact");
        let response = self.checked(request, table).await?;
        Ok(response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(count_from_content_range)
            .unwrap_or_default())
    }
}

/// Total from a `Content-Range` header such as `0-2/3` or `*/0`
fn count_from_content_range(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

fn rows_from(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        Value::Object(row) => vec![row],
        _ => Vec::new(),
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl RestTransport for HttpTransport {
    async fn select(&self, table: &str, query: &RestQuery) -> Result<Vec<Row>> {
        let request = self.request(Method::GET, table).query(&query.to_params());
        self.send(request, table).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&row);
        self.send(request, table)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::SerializationError(format!("insert into {} returned no row", table)))
    }

    async fn update(&self, table: &str, query: &RestQuery, columns: Row) -> Result<usize> {
        let request = self
            .request(Method::PATCH, table)
            .query(&query.to_params())
            .json(&columns);
        self.send_counted(request, table).await
    }

    async fn delete(&self, table: &str, query: &RestQuery) -> Result<usize> {
        let request = self.request(Method::DELETE, table).query(&query.to_params());
        self.send_counted(request, table).await
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<()> {
        let request = self
            .request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);
        self.send(request, table).await.map(|_| ())
    }
}

// ============================================================================
// FAKE
// ============================================================================


#[cfg(test)]
mod tests {
    use super::fake::MemoryTransport;
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_query_params() {
        let query = RestQuery::new()
            .select(["id", "nome"])
            .eq("user_id", "u1")
            .order_desc("created_at")
            .order_desc("id")
            .limit(1);
        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "id,nome".to_string()),
                ("user_id".to_string(), "eq.u1".to_string()),
                ("order".to_string(), "created_at.desc,id.desc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
        assert!(RestQuery::new().to_params().is_empty());
    }

    #[test]
    fn test_http_transport_requires_configuration() {
        assert!(matches!(
            HttpTransport::new(&RemoteConfig::default()),
            Err(Error::NotConfigured(_))
        ));
        assert!(HttpTransport::new(&RemoteConfig::new("https://x.example", "anon")).is_ok());
    }

    #[test]
    fn test_count_from_content_range() {
        assert_eq!(count_from_content_range("0-0/1"), Some(1));
        assert_eq!(count_from_content_range("*/0"), Some(0));
        assert_eq!(count_from_content_range("0-24/3573"), Some(3573));
        assert_eq!(count_from_content_range("0-0/*"), None);
    }

    #[test]
    fn test_rows_from_accepts_array_or_object() {
        assert_eq!(rows_from(json!([{"id": 1}, 2, {"id": 3}])).len(), 2);
        assert_eq!(rows_from(json!({"id": 1})).len(), 1);
        assert!(rows_from(json!(null)).is_empty());
    }

    #[tokio::test]
    async fn test_fake_folds_column_names() {
        let transport = MemoryTransport::new();
        let stored = transport
            .insert("checklists", row(json!({"corFibra": "azul", "user_id": "u1"})))
            .await
            .unwrap();
        assert_eq!(stored["corfibra"], json!("azul"));
        assert_eq!(stored["id"], json!(1));

        let found = transport
            .select("checklists", &RestQuery::new().eq("id", "1").eq("user_id", "u1"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].get("corFibra").is_none());
    }

    #[tokio::test]
    async fn test_fake_upsert_merges_on_key() {
        let transport = MemoryTransport::new();
        transport
            .upsert("users", row(json!({"id": "u1", "phone": "1"})), "id")
            .await
            .unwrap();
        transport
            .upsert("users", row(json!({"id": "u1", "first_name": "Ana"})), "id")
            .await
            .unwrap();
        let rows = transport.rows("users");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["phone"], json!("1"));
        assert_eq!(rows[0]["first_name"], json!("Ana"));
    }
}

// # Zone.ee Record Store
//
// This crate provides a Zone.ee API v2 record store for the dnssync system.
//
// - One HTTP request per store call
// - No retry, backoff or caching (failures are reported to SyncEngine)
// - HTTP timeout configured (30 seconds)
// - 404 is reported as `Error::NotFound` so the engine can treat it as
//   "empty" on list and "already gone" on delete
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - Store creation fails fast if the user name or key is empty
//
// ## API Reference
//
// - List:   GET    `/dns/{zone}/{type}`
// - Create: POST   `/dns/{zone}/{type}` (answers with an array)
// - Update: PUT    `/dns/{zone}/{type}/{id}`
// - Delete: DELETE `/dns/{zone}/{type}/{id}`
//
// `{type}` is the lowercase record type; authentication is HTTP Basic.

use async_trait::async_trait;
use dnssync_core::config::StoreConfig;
use dnssync_core::traits::{RecordStore, RecordStoreFactory};
use dnssync_core::{Error, RecordId, RecordType, Result, StoreRegistry, Zone, ZoneRecord};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Zone.ee API base URL
pub const ZONEEE_API_BASE: &str = "https://api.zone.eu/v2";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Record as returned by the API
///
/// Fields such as `resource_url`, `delete` and `modify` are ignored.
#[derive(Debug, Deserialize)]
struct WireRecord {
    /// Documented as a string; some answers carry a number
    #[serde(default)]
    id: Option<serde_json::Value>,
    name: String,
    #[serde(default)]
    destination: String,
    #[serde(default)]
    priority: Option<u16>,
    #[serde(default)]
    weight: Option<u16>,
    #[serde(default)]
    port: Option<u16>,
}

impl WireRecord {
    fn into_record(self) -> Result<ZoneRecord> {
        let id = match self.id {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(raw)) => Some(parse_id(&raw)?),
            Some(serde_json::Value::Number(n)) => Some(parse_id(&n.to_string())?),
            Some(other) => {
                return Err(Error::decode(format!(
                    "record {} has an id of unexpected shape: {}",
                    self.name, other
                )));
            }
        };
        Ok(ZoneRecord {
            id,
            name: self.name,
            destination: self.destination,
            priority: self.priority,
            weight: self.weight,
            port: self.port,
        })
    }
}

fn parse_id(raw: &str) -> Result<RecordId> {
    RecordId::parse(raw)
        .map_err(|e| Error::decode(format!("remote returned an unusable record id: {}", e)))
}

/// Create/update request body
#[derive(Debug, Serialize)]
struct WirePayload<'a> {
    name: &'a str,
    destination: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

impl<'a> From<&'a ZoneRecord> for WirePayload<'a> {
    fn from(record: &'a ZoneRecord) -> Self {
        Self {
            name: &record.name,
            destination: &record.destination,
            priority: record.priority,
            weight: record.weight,
            port: record.port,
        }
    }
}

/// Zone.ee record store
///
/// Stateless and single-shot: every trait call maps to one HTTP request.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct ZoneEeStore {
    /// API user name
    username: String,

    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API base URL without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ZoneEeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneEeStore")
            .field("username", &self.username)
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ZoneEeStore {
    /// Create a new Zone.ee store
    ///
    /// # Parameters
    ///
    /// - `username`: Zone.ee account user name
    /// - `api_key`: Zone.ee API key
    /// - `base_url`: Override for [`ZONEEE_API_BASE`] (tests, proxies)
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: if credentials are empty
    /// - `Err(Error::Transport)`: if the HTTP client cannot be built
    pub fn new(
        username: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        let username = username.into();
        let api_key = api_key.into();
        if username.is_empty() || api_key.is_empty() {
            return Err(Error::config("Zone.ee username and API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| ZONEEE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            username,
            api_key,
            base_url,
            client,
        })
    }

    /// `/dns/{zone}/{type}`
    fn collection_url(&self, zone: &Zone, record_type: RecordType) -> String {
        format!(
            "{}/dns/{}/{}",
            self.base_url,
            zone.name(),
            record_type.path_segment()
        )
    }

    /// `/dns/{zone}/{type}/{id}`
    fn record_url(&self, zone: &Zone, record_type: RecordType, id: &RecordId) -> String {
        format!("{}/{}", self.collection_url(zone, record_type), id)
    }

    /// Send one request and return the response body of a 2xx answer
    ///
    /// # Returns
    ///
    /// - `Err(Error::Transport)`: request could not be sent or read
    /// - `Err(Error::NotFound)`: status 404
    /// - `Err(Error::RemoteApi)`: any other non-2xx status
    async fn send(
        &self,
        method: Method,
        url: &str,
        payload: Option<&WirePayload<'_>>,
    ) -> Result<String> {
        tracing::debug!("Zone.ee request: {} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url)
            .basic_auth(&self.username, Some(&self.api_key))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} {} failed: {}", method, url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response body: {}", e)))?;
        tracing::debug!("Zone.ee response: {} {} -> {}", method, url, status);

        match status {
            s if s.is_success() => Ok(body),
            StatusCode::NOT_FOUND => Err(Error::not_found(format!("{} {}", method, url))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!("Zone.ee authentication failed: check API user and key");
                Err(Error::remote_api(status.as_u16(), body))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("Zone.ee rate limit exceeded");
                Err(Error::remote_api(status.as_u16(), body))
            }
            _ => Err(Error::remote_api(status.as_u16(), body)),
        }
    }
}

/// Parse an array answer; an empty body is an empty array
fn decode_records(body: &str) -> Result<Vec<ZoneRecord>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let wire: Vec<WireRecord> = serde_json::from_str(body)
        .map_err(|e| Error::decode(format!("Failed to parse record list: {}", e)))?;
    wire.into_iter().map(WireRecord::into_record).collect()
}

#[async_trait]
impl RecordStore for ZoneEeStore {
    async fn list(&self, zone: &Zone, record_type: RecordType) -> Result<Vec<ZoneRecord>> {
        let url = self.collection_url(zone, record_type);
        let body = self.send(Method::GET, &url, None).await?;
        let records = decode_records(&body)?;
        tracing::debug!("Zone.ee listed {} {} record(s) in {}", records.len(), record_type, zone);
        Ok(records)
    }

    async fn create(
        &self,
        zone: &Zone,
        record_type: RecordType,
        record: &ZoneRecord,
    ) -> Result<ZoneRecord> {
        let url = self.collection_url(zone, record_type);
        let payload = WirePayload::from(record);
        let body = self.send(Method::POST, &url, Some(&payload)).await?;

        decode_records(&body)?.into_iter().next().ok_or_else(|| {
            Error::decode(format!(
                "create of {} {} returned no record",
                record_type, record.name
            ))
        })
    }

    async fn update(
        &self,
        zone: &Zone,
        record_type: RecordType,
        id: &RecordId,
        record: &ZoneRecord,
    ) -> Result<()> {
        let url = self.record_url(zone, record_type, id);
        let payload = WirePayload::from(record);
        self.send(Method::PUT, &url, Some(&payload)).await?;
        Ok(())
    }

    async fn delete(&self, zone: &Zone, record_type: RecordType, id: &RecordId) -> Result<()> {
        let url = self.record_url(zone, record_type, id);
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "zoneee"
    }
}

/// Factory for creating Zone.ee stores
pub struct ZoneEeFactory;

impl RecordStoreFactory for ZoneEeFactory {
    fn create(&self, config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
        match config {
            StoreConfig::Zoneee {
                username,
                api_key,
                base_url,
            } => {
                if base_url.is_some() {
                    tracing::info!("Zone.ee API base URL overridden");
                }
                Ok(Arc::new(ZoneEeStore::new(
                    username.clone(),
                    api_key.clone(),
                    base_url.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for Zone.ee store")),
        }
    }
}

/// Register the Zone.ee store with a registry
///
/// # Example
///
/// ```rust
/// use dnssync_core::StoreRegistry;
///
/// let registry = StoreRegistry::new();
/// dnssync_store_zoneee::register(&registry);
/// assert!(registry.has_store("zoneee"));
/// ```
pub fn register(registry: &StoreRegistry) {
    registry.register_store("zoneee", Box::new(ZoneEeFactory));
}

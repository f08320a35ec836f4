//! HTTP client for the permit service.
//!
//! Thin, typed wrappers over the service's JSON endpoints. Responses are
//! accepted either wrapped in an envelope (`{"ok": true, "fields": {...}}`)
//! or bare; [`unwrap_envelope`] is the single place that decides which.
//! Nothing here retries: a failed call surfaces once and the user decides.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::config::ApiConfig;
use crate::context::{CatalogForm, DocumentContext};
use crate::error::EditorError;
use crate::fields::CompanyProfile;
use crate::packet::{GenerateResult, PacketRequest, ProjectSummary};
use crate::persist::OverridePayload;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<ApiError> for EditorError {
    fn from(err: ApiError) -> Self {
        let status = match &err {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidBaseUrl(_) | ApiError::InvalidJson(_) => None,
        };
        Self::RemoteFailure { status, message: err.to_string() }
    }
}

/// Return the payload under the first of `keys` present on an object
/// response, or the response itself when none is.
#[must_use]
pub fn unwrap_envelope(value: Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(mut map) => {
            for key in keys {
                if let Some(inner) = map.remove(*key) {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn into_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Client bound to one service base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `config`.
    ///
    /// # Errors
    ///
    /// Fails when the base URL is not absolute http(s) or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }

        #[allow(unused_mut)]
        let mut builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)));
        }
        Ok(Self { http: builder.build()?, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an `/api/...` path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn template_path(doc: &DocumentContext, file: &str, company_key: Option<&str>) -> String {
        let mut path = format!(
            "/api/template/{}/{}/{file}",
            urlencoding::encode(&doc.city),
            urlencoding::encode(&doc.form)
        );
        if let Some(key) = company_key.map(str::trim).filter(|k| !k.is_empty()) {
            path.push_str("?company_key=");
            path.push_str(&urlencoding::encode(key));
        }
        path
    }

    /// URL of the blank document, for hosts that rasterize from a URL.
    #[must_use]
    pub fn template_blank_url(&self, doc: &DocumentContext) -> String {
        self.url(&Self::template_path(doc, "blank.pdf", None))
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(status = status.as_u16(), error = %err, "failed to read error body");
                String::new()
            }
        };
        tracing::warn!(status = status.as_u16(), %body, "remote call failed");
        Err(ApiError::Status { status: status.as_u16(), body })
    }

    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        tracing::debug!(path, "GET");
        let response = self.http.get(self.url(path)).send().await?;
        Ok(Self::checked(response).await?.json::<Value>().await?)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        tracing::debug!(path, "POST");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Ok(Self::checked(response).await?.json::<Value>().await?)
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        tracing::debug!(path, "GET bytes");
        let response = self.http.get(self.url(path)).send().await?;
        Ok(Self::checked(response).await?.bytes().await?.to_vec())
    }

    async fn post_bytes<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Vec<u8>, ApiError> {
        tracing::debug!(path, "POST bytes");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Ok(Self::checked(response).await?.bytes().await?.to_vec())
    }

    fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
        Ok(serde_json::from_value(value)?)
    }

    // ---------------------------------------------------------
    // Catalog
    // ---------------------------------------------------------

    /// Cities with at least one form.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn cities(&self) -> Result<Vec<String>, ApiError> {
        let value = unwrap_envelope(self.get_json("/api/catalog/cities").await?, &["cities", "data"]);
        Self::decode(value)
    }

    /// Forms offered for `city`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn forms(&self, city: &str) -> Result<Vec<CatalogForm>, ApiError> {
        let path = format!("/api/catalog/{}/forms", urlencoding::encode(city.trim()));
        let value = unwrap_envelope(self.get_json(&path).await?, &["forms", "data"]);
        Self::decode(value)
    }

    // ---------------------------------------------------------
    // Templates
    // ---------------------------------------------------------

    /// Raw bytes of the blank document.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn template_blank(&self, doc: &DocumentContext) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&Self::template_path(doc, "blank.pdf", None)).await
    }

    /// Template field values, with the company override applied server-side.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn template_fields(
        &self,
        doc: &DocumentContext,
        company_key: Option<&str>,
    ) -> Result<Map<String, Value>, ApiError> {
        let value = self.get_json(&Self::template_path(doc, "fields.json", company_key)).await?;
        Ok(into_object(unwrap_envelope(value, &["fields", "data"])))
    }

    /// Template layer records, in document space.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn template_layers(&self, doc: &DocumentContext, company_key: Option<&str>) -> Result<Vec<Value>, ApiError> {
        let value = self.get_json(&Self::template_path(doc, "layers.json", company_key)).await?;
        Ok(into_array(unwrap_envelope(value, &["layers", "data"])))
    }

    // ---------------------------------------------------------
    // Companies
    // ---------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn companies(&self) -> Result<Vec<CompanyProfile>, ApiError> {
        let value = unwrap_envelope(self.get_json("/api/companies").await?, &["companies", "data"]);
        Self::decode(value)
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn company(&self, company_key: &str) -> Result<CompanyProfile, ApiError> {
        let path = format!("/api/companies/{}", urlencoding::encode(company_key.trim()));
        let value = unwrap_envelope(self.get_json(&path).await?, &["company", "data"]);
        Self::decode(value)
    }

    /// Create or merge a company record.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn upsert_company(&self, company_key: &str, data: &Map<String, Value>) -> Result<CompanyProfile, ApiError> {
        let body = json!({ "company_key": company_key.trim(), "data": data });
        let value = unwrap_envelope(self.post_json("/api/companies/upsert", &body).await?, &["company", "data"]);
        Self::decode(value)
    }

    // ---------------------------------------------------------
    // Overrides, packets, projects
    // ---------------------------------------------------------

    /// Persist the edited overlay for one document.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn save_override(&self, payload: &OverridePayload) -> Result<Value, ApiError> {
        self.post_json("/api/override", payload).await
    }

    /// Generate filled documents server-side.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn generate_company(&self, request: &PacketRequest) -> Result<GenerateResult, ApiError> {
        Self::decode(self.post_json("/api/generate-company", request).await?)
    }

    /// Generate and download the packet archive.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn download_company(&self, request: &PacketRequest) -> Result<Vec<u8>, ApiError> {
        self.post_bytes("/api/download-company", request).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        let value = unwrap_envelope(self.get_json("/api/projects").await?, &["projects", "data"]);
        Self::decode(value)
    }
}

//! Packet generation requests built from the session.

#[cfg(test)]
#[path = "packet_test.rs"]
mod packet_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::{SessionContext, non_blank};
use crate::error::EditorError;

/// Body of `/api/generate-company` and `/api/download-company`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRequest {
    pub company_key: String,
    pub city: String,
    pub form_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roof_key: Option<String>,
}

impl PacketRequest {
    /// Build from the session, checking company, city and forms in that order.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ContextIncomplete`] naming the first missing piece.
    pub fn from_session(session: &SessionContext) -> Result<Self, EditorError> {
        let company_key = session.require_company()?.to_owned();
        let city = session.require_city()?.to_owned();
        let form_keys = session
            .require_form_keys()?
            .iter()
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty())
            .collect();
        let opt = |v: &Option<String>| non_blank(v.as_deref()).map(str::to_owned);
        Ok(Self {
            company_key,
            city,
            form_keys,
            job_key: opt(&session.job_key),
            owner_key: opt(&session.owner_key),
            roof_key: opt(&session.roof_key),
        })
    }
}

/// Download name for a packet: `{city}_{project}.zip`.
#[must_use]
pub fn packet_file_name(session: &SessionContext) -> String {
    let city = file_name_part(session.city.as_deref(), "city");
    let project = file_name_part(session.project_name.as_deref(), "packet");
    format!("{city}_{project}.zip")
}

/// `raw` made safe as one path component: separators, reserved and control
/// characters become `_`, and leading dots are dropped. Blank input (or input
/// that is nothing but dots) yields `fallback`.
#[must_use]
pub fn file_name_part(raw: Option<&str>, fallback: &str) -> String {
    let cleaned: String = non_blank(raw)
        .unwrap_or_default()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim();
    if cleaned.is_empty() { fallback.to_owned() } else { cleaned.to_owned() }
}

/// Result of a server-side generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_folder: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Row of `/api/projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company_key: Option<String>,
    #[serde(default)]
    pub forms_count: usize,
}

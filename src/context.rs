//! Navigation context shared across screens.
//!
//! [`SessionContext`] is the `pf_session` record: which company, city and
//! forms the user picked, plus the job data typed on the project screen.
//! It is always patched, never replaced, so keys written by other screens
//! (or by newer clients) survive a round trip through
//! [`SessionContext::patch`].
//!
//! [`DocumentContext`] is the (city, form) pair that identifies one editable
//! document; it doubles as the preset scope key.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EditorError;
use crate::storage::{ScopedStore, load_json, save_json};

/// Local-storage scope holding the session record.
pub const SESSION_SCOPE: &str = "pf_session";

/// Trimmed, non-empty view of an optional string.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The `pf_session` record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub form_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roof_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roof_area_sqft: Option<String>,

    // Company fallbacks, consulted after the fetched profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roof_key: Option<String>,

    /// Keys this client does not model; written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionContext {
    /// Load from `store`. Absent or malformed state yields an empty session.
    pub fn load<S: ScopedStore + ?Sized>(store: &S) -> Self {
        load_json(store, SESSION_SCOPE)
    }

    /// Persist the whole record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save<S: ScopedStore + ?Sized>(&self, store: &mut S) -> Result<(), EditorError> {
        save_json(store, SESSION_SCOPE, self)
    }

    /// Load, let `edit` change some fields, save, and return the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn patch<S, F>(store: &mut S, edit: F) -> Result<Self, EditorError>
    where
        S: ScopedStore + ?Sized,
        F: FnOnce(&mut Self),
    {
        let mut session = Self::load(store);
        edit(&mut session);
        session.save(store)?;
        Ok(session)
    }

    /// Company key, required by every company-scoped call.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ContextIncomplete`] when no company was picked.
    pub fn require_company(&self) -> Result<&str, EditorError> {
        non_blank(self.company_key.as_deref()).ok_or(EditorError::ContextIncomplete("company"))
    }

    /// City, required by catalog and document calls.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ContextIncomplete`] when no city was picked.
    pub fn require_city(&self) -> Result<&str, EditorError> {
        non_blank(self.city.as_deref()).ok_or(EditorError::ContextIncomplete("city"))
    }

    /// Selected form keys.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ContextIncomplete`] when none were picked.
    pub fn require_form_keys(&self) -> Result<&[String], EditorError> {
        if self.form_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(EditorError::ContextIncomplete("form_keys"));
        }
        Ok(&self.form_keys)
    }

    /// The document currently being edited.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ContextIncomplete`] when city or form is missing.
    pub fn document(&self) -> Result<DocumentContext, EditorError> {
        let city = self.require_city()?;
        let form = non_blank(self.form_key.as_deref()).ok_or(EditorError::ContextIncomplete("form"))?;
        Ok(DocumentContext::new(city, form))
    }

    /// Overwrite the job fields, trimming each.
    pub fn set_job_data(&mut self, data: &JobData) {
        self.job_address = Some(data.job_address.trim().to_owned());
        self.job_zip = Some(data.job_zip.trim().to_owned());
        self.roof_category = Some(data.roof_category.trim().to_owned());
        self.roof_area_sqft = Some(data.roof_area_sqft.trim().to_owned());
    }

    /// Job fields as currently stored.
    #[must_use]
    pub fn job_data(&self) -> JobData {
        let get = |v: &Option<String>| v.clone().unwrap_or_default();
        JobData {
            job_address: get(&self.job_address),
            job_zip: get(&self.job_zip),
            roof_category: get(&self.roof_category),
            roof_area_sqft: get(&self.roof_area_sqft),
        }
    }
}

/// Project-level job data typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobData {
    pub job_address: String,
    pub job_zip: String,
    pub roof_category: String,
    pub roof_area_sqft: String,
}

/// Identity of one editable document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentContext {
    pub city: String,
    pub form: String,
}

impl DocumentContext {
    #[must_use]
    pub fn new(city: &str, form: &str) -> Self {
        Self { city: city.trim().to_owned(), form: form.trim().to_owned() }
    }

    /// Local-storage scope for this document under `prefix`.
    #[must_use]
    pub fn scope_key(&self, prefix: &str) -> String {
        format!("{prefix}::{}::{}", self.city, self.form)
    }
}

/// A form offered by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogForm {
    pub form_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl CatalogForm {
    /// Display label: the name, else the key.
    #[must_use]
    pub fn label(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or(&self.form_key)
    }
}

/// Forms the editor may open: the catalog filtered to the session's
/// `form_keys`, or the whole catalog when none were picked.
#[must_use]
pub fn allowed_forms(catalog: Vec<CatalogForm>, session: &SessionContext) -> Vec<CatalogForm> {
    if session.form_keys.is_empty() {
        return catalog;
    }
    catalog.into_iter().filter(|f| session.form_keys.contains(&f.form_key)).collect()
}

/// Form to open first: the session's form when allowed, else the first one.
#[must_use]
pub fn initial_form<'a>(forms: &'a [CatalogForm], session: &SessionContext) -> Option<&'a str> {
    let preferred = non_blank(session.form_key.as_deref());
    preferred
        .and_then(|key| forms.iter().find(|f| f.form_key == key))
        .or_else(|| forms.first())
        .map(|f| f.form_key.as_str())
}

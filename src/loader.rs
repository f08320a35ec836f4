//! Document loading: fetch template data, then hand it to the session.
//!
//! Template fields and layers are fetched concurrently; the company profile
//! afterwards and best-effort, since a missing profile only means fewer
//! values to fill. The split between [`fetch_document`] and
//! [`EditorCore::finish_load`] lets browser hosts release their borrow of
//! the session while the requests are in flight; [`load_document`] runs
//! both halves for hosts that can hold it.

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;

use crate::api::ApiClient;
use crate::context::{DocumentContext, SessionContext, non_blank};
use crate::error::EditorError;
use crate::fields::CompanyProfile;
use crate::session::{EditorCore, LoadOutcome, LoadedDocument};
use crate::viewport::Rasterizer;

/// Fetch everything the editor needs for `doc`.
///
/// # Errors
///
/// Fails when either template request fails. A failed company lookup is
/// logged and replaced by an empty profile.
pub async fn fetch_document(
    api: &ApiClient,
    doc: &DocumentContext,
    company_key: Option<&str>,
) -> Result<LoadedDocument, EditorError> {
    let company_key = non_blank(company_key);
    let (template_fields, template_layers) =
        futures::try_join!(api.template_fields(doc, company_key), api.template_layers(doc, company_key))?;

    let company = match company_key {
        Some(key) => match api.company(key).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(company = key, error = %err, "company lookup failed; continuing without profile");
                CompanyProfile::default()
            }
        },
        None => CompanyProfile::default(),
    };

    tracing::info!(
        city = %doc.city,
        form = %doc.form,
        fields = template_fields.len(),
        layers = template_layers.len(),
        "template fetched"
    );
    Ok(LoadedDocument { template_fields, template_layers, company })
}

/// Load the session's current document into `core`.
///
/// # Errors
///
/// Fails when the session names no document, a fetch fails, or the first
/// page cannot be rasterized.
pub async fn load_document<R: Rasterizer + ?Sized>(
    core: &mut EditorCore,
    api: &ApiClient,
    rasterizer: &mut R,
    session: &SessionContext,
) -> Result<LoadOutcome, EditorError> {
    let doc = session.document()?;
    let token = core.begin_load();
    let loaded = fetch_document(api, &doc, session.company_key.as_deref()).await?;
    core.finish_load(token, doc, loaded, session, rasterizer)
}

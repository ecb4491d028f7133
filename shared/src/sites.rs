//! Per-client site documents: validation against the template schema and
//! persistence in the `sites` collection.

use crate::error::{Error, Result};
use crate::session::SessionState;
use crate::store::{self, DocumentStore, SITES};
use crate::templates;
use crate::types::{SiteDocument, SiteDraft};
use std::collections::BTreeMap;

/// Validate a draft against its template and build the document to store.
pub fn build_site(
    client_id: &str,
    draft: SiteDraft,
    updated_by: &str,
) -> Result<SiteDocument> {
    let template = templates::find_template(&draft.template_id)
        .ok_or_else(|| Error::UnknownTemplate(draft.template_id.clone()))?;
    let schema = templates::resolve(template.template_type.as_str(), template.variation_id);

    let mut fields = BTreeMap::new();
    let mut missing = Vec::new();
    for field in &schema {
        let value = draft
            .fields
            .get(field.key)
            .map(|value| value.trim())
            .unwrap_or_default();
        if value.is_empty() {
            if field.required {
                missing.push(field.key.to_string());
            }
            continue;
        }
        fields.insert(field.key.to_string(), value.to_string());
    }
    if !missing.is_empty() {
        return Err(Error::MissingFields(missing));
    }

    for key in draft.fields.keys() {
        if !schema.iter().any(|field| field.key == key.as_str()) {
            tracing::warn!("Dropping field {} not in template {}", key, template.id);
        }
    }

    let slots = templates::image_slots(template.template_type);
    let images = draft
        .images
        .into_iter()
        .filter(|(slot, reference)| {
            let known = slots.contains(&slot.as_str());
            if !known {
                tracing::warn!("Dropping image slot {} not in template {}", slot, template.id);
            }
            known && !reference.trim().is_empty()
        })
        .collect();

    Ok(SiteDocument {
        client_id: client_id.to_string(),
        template_id: template.id.to_string(),
        template_type: template.template_type,
        variation_id: template.variation_id.to_string(),
        fields,
        images,
        updated_at: chrono::Utc::now().to_rfc3339(),
        updated_by: updated_by.to_string(),
    })
}

/// Save a client's site. Admin only.
pub async fn save_site<S: DocumentStore>(
    state: &SessionState,
    store: &S,
    client_id: &str,
    draft: SiteDraft,
) -> Result<SiteDocument> {
    let admin = state.require_admin()?;
    let document = build_site(client_id, draft, &admin.uid)?;

    store::write(store, SITES, client_id, &document).await?;
    tracing::info!(
        "Site saved for client {} with template {}",
        client_id,
        document.template_id
    );
    Ok(document)
}

/// Load a client's site. Admins may read any site, clients only their own.
pub async fn load_site<S: DocumentStore>(
    state: &SessionState,
    store: &S,
    client_id: &str,
) -> Result<Option<SiteDocument>> {
    let user = state.require_user()?;
    if !user.is_admin() && user.uid != client_id {
        return Err(Error::Forbidden);
    }
    store::read(store, SITES, client_id).await
}

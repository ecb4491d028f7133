use crate::config::Assets;
use crate::error::{Error, Result};
use crate::session::SessionState;
use crate::storage::ObjectStorage;
use crate::templates;
use crate::types::TemplateType;
use image::ImageFormat;

/// Upper bound for a single uploaded image
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// A single path segment: no separators, no dot-only names.
fn is_key_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.contains(['/', '\\'])
        && segment.chars().any(|c| c != '.')
}

/// Extension and content type for the image formats accepted on upload.
fn accepted_format(bytes: &[u8]) -> Result<(&'static str, &'static str)> {
    let format = image::guess_format(bytes)
        .map_err(|e| Error::InvalidImage(format!("unrecognized image data: {}", e)))?;

    match format {
        ImageFormat::Png => Ok(("png", "image/png")),
        ImageFormat::Jpeg => Ok(("jpg", "image/jpeg")),
        ImageFormat::Gif => Ok(("gif", "image/gif")),
        ImageFormat::WebP => Ok(("webp", "image/webp")),
        other => Err(Error::InvalidImage(format!("unsupported format {:?}", other))),
    }
}

/// Store an image for one of a client's image slots and return its reference.
pub async fn upload_image<O: ObjectStorage>(
    state: &SessionState,
    storage: &O,
    client_id: &str,
    slot: &str,
    bytes: Vec<u8>,
) -> Result<String> {
    state.require_admin()?;

    if !is_key_segment(client_id) {
        return Err(Error::InvalidClientId(client_id.to_string()));
    }
    let known_slot = TemplateType::ALL
        .iter()
        .any(|template_type| templates::image_slots(*template_type).contains(&slot));
    if !known_slot {
        return Err(Error::UnknownImageSlot(slot.to_string()));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidImage("empty upload".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(Error::InvalidImage(format!(
            "{} bytes exceeds the {} byte limit",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }

    let (extension, content_type) = accepted_format(&bytes)?;

    // Key: clients/{client_id}/{slot}/{image_id}.{ext}
    let key = format!(
        "clients/{}/{}/{}.{}",
        client_id,
        slot,
        uuid::Uuid::new_v4(),
        extension
    );

    let stored = storage.put(&key, bytes, content_type).await?;
    tracing::info!("Image stored for client {} slot {}: {}", client_id, slot, stored);
    Ok(stored)
}

/// Rewrite a stored image reference into a URL a browser can load.
pub fn resolve_image_url(raw: &str, assets: &Assets) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") || raw.starts_with("data:") {
        return Some(raw.to_string());
    }

    let key = match raw.strip_prefix("s3://") {
        // s3://{bucket}/{key}
        Some(rest) => rest.split_once('/').map(|(_, key)| key).unwrap_or(""),
        None => raw.trim_start_matches('/'),
    };
    if key.is_empty() {
        return None;
    }

    Some(format!("{}/{}", assets.base_url.trim_end_matches('/'), key))
}

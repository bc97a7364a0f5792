//! Resource locators.

use crate::error::{MergeError, MergeResult};
use crate::platform::ArtifactKind;
use url::Url;

/// Classify a locator as a flow or tabular document by its first path
/// segment (`/document/...` or `/spreadsheets/...`).
pub fn classify_locator(locator: &str) -> MergeResult<ArtifactKind> {
    let unrecognized = || MergeError::UnrecognizedLocatorKind(locator.to_string());

    let url = Url::parse(locator.trim()).map_err(|_| unrecognized())?;
    let first = url
        .path_segments()
        .and_then(|mut segments| segments.next())
        .ok_or_else(unrecognized)?;

    match first {
        "document" => Ok(ArtifactKind::FlowDocument),
        "spreadsheets" => Ok(ArtifactKind::TabularDocument),
        _ => Err(unrecognized()),
    }
}

/// Extract the entity id from a file or folder locator: the `id` query
/// parameter when present, otherwise the longest path segment.
pub fn entity_id_from_locator(locator: &str) -> MergeResult<String> {
    let url = Url::parse(locator.trim())
        .map_err(|_| MergeError::UnrecognizedLocatorKind(locator.to_string()))?;

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "id") {
        return Ok(id.into_owned());
    }

    url.path_segments()
        .into_iter()
        .flatten()
        .fold(None::<&str>, |longest, segment| match longest {
            Some(current) if current.len() >= segment.len() => Some(current),
            _ => Some(segment),
        })
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MergeError::UnrecognizedLocatorKind(locator.to_string()))
}

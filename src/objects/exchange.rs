//! Annotation exchange operations.
//!
//! Round-trips annotation objects between the remote hierarchy and the
//! local model via the interchange format. Reads and deletes treat an
//! unresolvable hierarchy as empty content: they warn and return empty /
//! do nothing. Writes fail instead, since silently dropping new objects
//! would lose data. A missing session is always a configuration error.

use serde_json::Value;
use tracing::warn;

use crate::error::ObjectError;
use crate::gateway::{
    resolve_hierarchy, session_or_default, ObjectSelector, RemoteHandle, Session,
};

use super::interchange;
use super::model::{Feature, ImageObject, ObjectType};

/// Objects per interchange batch.
///
/// Matches the remote side's chunking of large object sets, keeping each
/// payload's string length bounded.
pub const FEATURE_BATCH_SIZE: usize = 1000;

// =============================================================================
// Read Path
// =============================================================================

/// Fetch objects from the hierarchy as raw interchange features.
///
/// `input` may be an image-data or hierarchy handle; with `None` the
/// session's currently open image is used. An unresolvable hierarchy warns
/// and yields an empty list. `kind` of `None` selects every object.
pub fn get_features(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
    kind: Option<ObjectType>,
) -> Result<Vec<Feature>, ObjectError> {
    let session = session_or_default(session)?;
    let Some(hierarchy) = resolve_hierarchy(&session, input)? else {
        warn!("no object hierarchy found");
        return Ok(Vec::new());
    };

    let selector = match kind {
        Some(kind) => ObjectSelector::Kind(kind),
        None => ObjectSelector::All,
    };
    let Some(objects) = session.gateway().select_objects(&hierarchy, selector)? else {
        // Selection source absent, e.g. no TMA grid exists.
        return Ok(Vec::new());
    };

    let mut features = Vec::new();
    for batch in session
        .gateway()
        .to_feature_collections(&objects, FEATURE_BATCH_SIZE)?
    {
        let parsed = interchange::parse(&batch)?;
        features.extend(interchange::unwrap_features(parsed).into_iter().map(Feature));
    }
    Ok(features)
}

/// Fetch objects from the hierarchy, decoded to [`ImageObject`]s.
pub fn get_objects(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
    kind: Option<ObjectType>,
) -> Result<Vec<ImageObject>, ObjectError> {
    Ok(get_features(session, input, kind)?
        .iter()
        .map(ImageObject::from_feature)
        .collect())
}

/// Fetch all annotation-category objects.
pub fn get_annotations(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<Vec<ImageObject>, ObjectError> {
    get_objects(session, input, Some(ObjectType::Annotation))
}

/// Fetch all detection-category objects.
pub fn get_detections(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<Vec<ImageObject>, ObjectError> {
    get_objects(session, input, Some(ObjectType::Detection))
}

/// Fetch all cell-category objects.
pub fn get_cells(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<Vec<ImageObject>, ObjectError> {
    get_objects(session, input, Some(ObjectType::Cell))
}

/// Fetch all tile-category objects.
pub fn get_tiles(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<Vec<ImageObject>, ObjectError> {
    get_objects(session, input, Some(ObjectType::Tile))
}

/// Fetch all TMA cores. Yields an empty list when no TMA grid exists.
pub fn get_tma_cores(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<Vec<ImageObject>, ObjectError> {
    get_objects(session, input, Some(ObjectType::TmaCore))
}

// =============================================================================
// Write Path
// =============================================================================

/// Send features to the remote side and append them to the hierarchy.
///
/// The whole list is encoded as one interchange payload; NaN measurement
/// values are emitted as-is. An empty list is a no-op. Unlike the read
/// path, an unresolvable image-data is an error here.
pub fn add_features(
    session: Option<&Session>,
    features: &[Feature],
    input: Option<&RemoteHandle>,
) -> Result<(), ObjectError> {
    if features.is_empty() {
        return Ok(());
    }
    let session = session_or_default(session)?;
    let Some(hierarchy) = resolve_hierarchy(&session, input)? else {
        return Err(ObjectError::MissingImageData);
    };

    let payload = Value::Array(
        features
            .iter()
            .map(|feature| Value::Object(feature.0.clone()))
            .collect(),
    );
    let text = interchange::to_string(&payload)?;
    let objects = session.gateway().to_remote_objects(&text)?;
    session.gateway().insert_objects(&hierarchy, &objects)?;
    Ok(())
}

/// Send decoded objects to the remote side.
pub fn add_objects(
    session: Option<&Session>,
    objects: &[ImageObject],
    input: Option<&RemoteHandle>,
) -> Result<(), ObjectError> {
    let features: Vec<Feature> = objects.iter().map(ImageObject::to_feature).collect();
    add_features(session, &features, input)
}

// =============================================================================
// Delete Paths
// =============================================================================

/// Remove every object from the hierarchy in one remote call.
pub fn delete_all_objects(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<(), ObjectError> {
    let session = session_or_default(session)?;
    let Some(hierarchy) = resolve_hierarchy(&session, input)? else {
        warn!("no object hierarchy found, nothing to delete");
        return Ok(());
    };
    session.gateway().clear_all_objects(&hierarchy)?;
    Ok(())
}

/// Remove all annotation-category objects.
pub fn delete_annotations(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<(), ObjectError> {
    delete_kind(session, input, ObjectType::Annotation)
}

/// Remove all detection-category objects.
pub fn delete_detections(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<(), ObjectError> {
    delete_kind(session, input, ObjectType::Detection)
}

/// Remove all cell-category objects.
pub fn delete_cells(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<(), ObjectError> {
    delete_kind(session, input, ObjectType::Cell)
}

/// Remove all tile-category objects.
pub fn delete_tiles(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
) -> Result<(), ObjectError> {
    delete_kind(session, input, ObjectType::Tile)
}

fn delete_kind(
    session: Option<&Session>,
    input: Option<&RemoteHandle>,
    kind: ObjectType,
) -> Result<(), ObjectError> {
    let session = session_or_default(session)?;
    let Some(hierarchy) = resolve_hierarchy(&session, input)? else {
        warn!(kind = kind.as_str(), "no object hierarchy found, nothing to delete");
        return Ok(());
    };
    let Some(objects) = session
        .gateway()
        .select_objects(&hierarchy, ObjectSelector::Kind(kind))?
    else {
        return Ok(());
    };
    session.gateway().remove_objects(&hierarchy, &objects)?;
    Ok(())
}

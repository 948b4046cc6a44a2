//! Annotation object layer.
//!
//! - [`model`] - the local object model and feature conversions
//! - [`interchange`] - the lenient GeoJSON-superset text format
//! - [`exchange`] - read/write/delete operations against the hierarchy

mod exchange;
pub mod interchange;
mod model;

pub use exchange::{
    add_features, add_objects, delete_all_objects, delete_annotations, delete_cells,
    delete_detections, delete_tiles, get_annotations, get_cells, get_detections, get_features,
    get_objects, get_tiles, get_tma_cores, FEATURE_BATCH_SIZE,
};
pub use model::{Classification, Feature, Geometry, ImageObject, ObjectType};

//! Local annotation object model.
//!
//! [`ImageObject`] is the decoded, in-memory form of one remote annotation:
//! a value object with no remote identity. [`Feature`] is the interchange
//! form, a thin wrapper over the feature's JSON object that supports the
//! top-level-then-`properties` fallback lookup the remote side relies on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::interchange;

// =============================================================================
// Object Types
// =============================================================================

/// Category tag for an annotation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Annotation,
    Detection,
    Tile,
    Cell,
    TmaCore,
}

impl ObjectType {
    /// The interchange string for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Annotation => "annotation",
            ObjectType::Detection => "detection",
            ObjectType::Tile => "tile",
            ObjectType::Cell => "cell",
            ObjectType::TmaCore => "tma_core",
        }
    }

    /// Parse an interchange string, case-insensitively.
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "annotation" => Some(ObjectType::Annotation),
            "detection" => Some(ObjectType::Detection),
            "tile" => Some(ObjectType::Tile),
            "cell" => Some(ObjectType::Cell),
            "tma_core" => Some(ObjectType::TmaCore),
            _ => None,
        }
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// A GeoJSON geometry, optionally pinned to a z-slice and timepoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// The GeoJSON geometry object (`{"type": ..., "coordinates": ...}`).
    pub value: Value,

    /// Z-slice index, when the feature carried a plane.
    pub z: Option<i32>,

    /// Timepoint index, when the feature carried a plane.
    pub t: Option<i32>,
}

impl Geometry {
    /// Wrap a geometry with no plane information.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            z: None,
            t: None,
        }
    }

    /// Wrap a geometry pinned to a plane.
    pub fn with_plane(value: Value, z: Option<i32>, t: Option<i32>) -> Self {
        Self { value, z, t }
    }

    /// The GeoJSON geometry type name, e.g. `"Polygon"`.
    pub fn geometry_type(&self) -> Option<&str> {
        self.value.get("type").and_then(Value::as_str)
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classification label with an optional display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub name: String,

    /// RGB components in `0..=255`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

impl Classification {
    /// A classification with no display color.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    /// Decode from an interchange value: either a bare name string or an
    /// object with `name` and optional `color`.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::new(name.clone())),
            Value::Object(obj) => {
                let name = obj.get("name")?.as_str()?.to_string();
                Some(Self {
                    name,
                    color: obj.get("color").and_then(rgb_from_value),
                })
            }
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::String(self.name.clone()));
        if let Some(color) = self.color {
            obj.insert("color".to_string(), rgb_to_value(color));
        }
        Value::Object(obj)
    }
}

/// Decode an RGB triple from either a `[r, g, b]` array or a packed 24-bit
/// integer.
fn rgb_from_value(value: &Value) -> Option<[u8; 3]> {
    match value {
        Value::Array(parts) if parts.len() == 3 => {
            let mut rgb = [0u8; 3];
            for (slot, part) in rgb.iter_mut().zip(parts) {
                *slot = part.as_i64()?.clamp(0, 255) as u8;
            }
            Some(rgb)
        }
        Value::Number(n) => {
            let packed = n.as_i64()?;
            // Packed colors may be signed 32-bit with an alpha byte; keep
            // the low 24 bits.
            let packed = (packed as u32) & 0x00FF_FFFF;
            Some([
                ((packed >> 16) & 0xFF) as u8,
                ((packed >> 8) & 0xFF) as u8,
                (packed & 0xFF) as u8,
            ])
        }
        _ => None,
    }
}

fn rgb_to_value(rgb: [u8; 3]) -> Value {
    Value::Array(rgb.iter().map(|&c| Value::from(c)).collect())
}

// =============================================================================
// Features
// =============================================================================

/// One feature in interchange form.
///
/// Wraps the feature's JSON object so fields can live either at the top
/// level or nested under `properties`, as the remote side emits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature(pub Map<String, Value>);

impl Feature {
    /// Look up a field at the top level, then under `properties`.
    pub fn property(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(name) {
            return Some(value);
        }
        self.0
            .get("properties")
            .and_then(Value::as_object)
            .and_then(|props| props.get(name))
    }

    /// The nested `properties` object, if present.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.0.get("properties").and_then(Value::as_object)
    }
}

// =============================================================================
// Image Objects
// =============================================================================

/// One decoded annotation object.
///
/// Everything the feature carried that is not modeled explicitly lands in
/// [`extra_properties`](Self::extra_properties).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageObject {
    /// Primary geometry, pinned to the feature's plane when one was given.
    pub geometry: Option<Geometry>,

    /// Identifier assigned by the remote side, if any.
    pub id: Option<Value>,

    /// Classification label.
    pub classification: Option<Classification>,

    /// Display name.
    pub name: Option<String>,

    /// Display color.
    pub color: Option<[u8; 3]>,

    /// Measurement values; NaN is a legitimate value here.
    pub measurements: BTreeMap<String, f64>,

    /// Category tag.
    pub object_type: Option<ObjectType>,

    /// Secondary (nucleus) geometry for cell objects.
    pub nucleus_geometry: Option<Geometry>,

    /// Remaining non-null feature properties.
    pub extra_properties: Map<String, Value>,
}

/// Property names consumed by the explicit [`ImageObject`] fields.
const CONSUMED_PROPERTIES: &[&str] = &[
    "geometry",
    "id",
    "classification",
    "name",
    "color",
    "measurements",
    "object_type",
    "nucleusGeometry",
    "plane",
];

impl ImageObject {
    /// Decode a feature into an image object.
    pub fn from_feature(feature: &Feature) -> Self {
        let plane = feature.property("plane").cloned();
        let plane_z = plane
            .as_ref()
            .and_then(|p| p.get("z"))
            .and_then(Value::as_i64)
            .map(|z| z as i32);
        let plane_t = plane
            .as_ref()
            .and_then(|p| p.get("t"))
            .and_then(Value::as_i64)
            .map(|t| t as i32);

        let geometry = feature
            .property("geometry")
            .filter(|v| !v.is_null())
            .map(|v| Geometry::with_plane(v.clone(), plane_z, plane_t));

        let nucleus_geometry = feature
            .property("nucleusGeometry")
            .filter(|v| !v.is_null())
            .map(|v| Geometry::with_plane(v.clone(), plane_z, plane_t));

        let measurements = feature
            .property("measurements")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| interchange::value_to_f64(v).map(|f| (k.clone(), f)))
                    .collect()
            })
            .unwrap_or_default();

        let extra_properties = feature
            .properties()
            .map(|props| {
                props
                    .iter()
                    .filter(|(k, v)| !CONSUMED_PROPERTIES.contains(&k.as_str()) && !v.is_null())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            geometry,
            id: feature.property("id").filter(|v| !v.is_null()).cloned(),
            classification: feature
                .property("classification")
                .and_then(Classification::from_value),
            name: feature
                .property("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            color: feature.property("color").and_then(rgb_from_value),
            measurements,
            object_type: feature
                .property("object_type")
                .and_then(Value::as_str)
                .and_then(ObjectType::from_str_lenient),
            nucleus_geometry,
            extra_properties,
        }
    }

    /// Encode as a feature for the write path.
    ///
    /// Plane indices are emitted as a `plane` property; the nucleus geometry
    /// goes to the feature top level, mirroring what the remote side emits.
    pub fn to_feature(&self) -> Feature {
        let mut feature = Map::new();
        feature.insert("type".to_string(), Value::String("Feature".to_string()));
        if let Some(id) = &self.id {
            feature.insert("id".to_string(), id.clone());
        }
        if let Some(geometry) = &self.geometry {
            feature.insert("geometry".to_string(), geometry.value.clone());
        }
        if let Some(nucleus) = &self.nucleus_geometry {
            feature.insert("nucleusGeometry".to_string(), nucleus.value.clone());
        }

        let mut properties = Map::new();
        if let Some(object_type) = self.object_type {
            properties.insert(
                "object_type".to_string(),
                Value::String(object_type.as_str().to_string()),
            );
        }
        if let Some(classification) = &self.classification {
            properties.insert("classification".to_string(), classification.to_value());
        }
        if let Some(name) = &self.name {
            properties.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(color) = self.color {
            properties.insert("color".to_string(), rgb_to_value(color));
        }
        if !self.measurements.is_empty() {
            let measurements: Map<String, Value> = self
                .measurements
                .iter()
                .map(|(k, &v)| (k.clone(), interchange::number_value(v)))
                .collect();
            properties.insert("measurements".to_string(), Value::Object(measurements));
        }
        if let Some(plane) = self.plane_value() {
            properties.insert("plane".to_string(), plane);
        }
        for (k, v) in &self.extra_properties {
            properties.entry(k.clone()).or_insert_with(|| v.clone());
        }
        feature.insert("properties".to_string(), Value::Object(properties));
        Feature(feature)
    }

    fn plane_value(&self) -> Option<Value> {
        let geometry = self.geometry.as_ref()?;
        if geometry.z.is_none() && geometry.t.is_none() {
            return None;
        }
        let mut plane = Map::new();
        if let Some(z) = geometry.z {
            plane.insert("z".to_string(), Value::from(z));
        }
        if let Some(t) = geometry.t {
            plane.insert("t".to_string(), Value::from(t));
        }
        Some(Value::Object(plane))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cell_feature() -> Feature {
        let value = json!({
            "type": "Feature",
            "id": "7e3f",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 0]]]},
            "nucleusGeometry": {"type": "Polygon", "coordinates": [[[3, 3], [6, 3], [6, 6], [3, 3]]]},
            "properties": {
                "object_type": "cell",
                "classification": {"name": "Tumor", "color": [200, 0, 0]},
                "name": "Cell 1",
                "measurements": {"area": 42.5},
                "plane": {"z": 2, "t": 0},
                "custom_score": 0.93,
                "ignored_null": null
            }
        });
        match value {
            Value::Object(obj) => Feature(obj),
            _ => unreachable!(),
        }
    }

    #[test]
    fn property_lookup_falls_back_to_properties() {
        let feature = cell_feature();
        assert!(feature.property("geometry").is_some());
        assert_eq!(feature.property("name"), Some(&json!("Cell 1")));
        assert_eq!(feature.property("missing"), None);
    }

    #[test]
    fn feature_decodes_to_image_object() {
        let object = ImageObject::from_feature(&cell_feature());

        assert_eq!(object.object_type, Some(ObjectType::Cell));
        assert_eq!(object.name.as_deref(), Some("Cell 1"));
        assert_eq!(object.id, Some(json!("7e3f")));
        assert_eq!(
            object.classification,
            Some(Classification {
                name: "Tumor".to_string(),
                color: Some([200, 0, 0]),
            })
        );
        assert_eq!(object.measurements.get("area"), Some(&42.5));

        let geometry = object.geometry.as_ref().unwrap();
        assert_eq!(geometry.geometry_type(), Some("Polygon"));
        assert_eq!(geometry.z, Some(2));
        assert_eq!(geometry.t, Some(0));

        let nucleus = object.nucleus_geometry.as_ref().unwrap();
        assert_eq!(nucleus.z, Some(2));
    }

    #[test]
    fn extras_keep_unconsumed_non_null_properties() {
        let object = ImageObject::from_feature(&cell_feature());
        assert_eq!(object.extra_properties.get("custom_score"), Some(&json!(0.93)));
        assert!(!object.extra_properties.contains_key("ignored_null"));
        assert!(!object.extra_properties.contains_key("plane"));
        assert!(!object.extra_properties.contains_key("measurements"));
    }

    #[test]
    fn object_round_trips_through_a_feature() {
        let original = ImageObject::from_feature(&cell_feature());
        let decoded = ImageObject::from_feature(&original.to_feature());

        assert_eq!(decoded.geometry, original.geometry);
        assert_eq!(decoded.classification, original.classification);
        assert_eq!(decoded.measurements, original.measurements);
        assert_eq!(decoded.object_type, original.object_type);
        assert_eq!(decoded.nucleus_geometry, original.nucleus_geometry);
        assert_eq!(decoded.extra_properties, original.extra_properties);
    }

    #[test]
    fn classification_accepts_bare_strings_and_packed_colors() {
        assert_eq!(
            Classification::from_value(&json!("Stroma")),
            Some(Classification::new("Stroma"))
        );
        assert_eq!(
            Classification::from_value(&json!({"name": "Tumor", "color": 0xFF8000})),
            Some(Classification {
                name: "Tumor".to_string(),
                color: Some([255, 128, 0]),
            })
        );
        assert_eq!(Classification::from_value(&json!(17)), None);
    }

    #[test]
    fn packed_signed_colors_keep_low_24_bits() {
        // -1 is what a packed white with alpha looks like after a signed
        // 32-bit round trip.
        assert_eq!(rgb_from_value(&json!(-1)), Some([255, 255, 255]));
    }

    #[test]
    fn object_type_strings_round_trip() {
        for ty in [
            ObjectType::Annotation,
            ObjectType::Detection,
            ObjectType::Tile,
            ObjectType::Cell,
            ObjectType::TmaCore,
        ] {
            assert_eq!(ObjectType::from_str_lenient(ty.as_str()), Some(ty));
        }
        assert_eq!(ObjectType::from_str_lenient("TMA_Core"), Some(ObjectType::TmaCore));
        assert_eq!(ObjectType::from_str_lenient("unknown"), None);
    }
}

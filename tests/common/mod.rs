//! Shared test support: an in-memory gateway backed by a synthetic image
//! pyramid and an object store.
//!
//! The mock renders deterministic pixels for any requested region and
//! encodes them exactly as the remote side would (multi-plane TIFF, one
//! plane per channel; single-directory RGB TIFF for packed RGB), so all
//! three transport strategies can be exercised against identical content.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Map, Value};
use tiff::encoder::{colortype, TiffEncoder};

use wsi_bridge::error::GatewayError;
use wsi_bridge::gateway::{
    ChannelDescription, Gateway, LevelDescription, ObjectSelector, RegionRequest, RemoteHandle,
    RemoteTypeTag, ServerDescription, Session,
};
use wsi_bridge::objects::interchange;

static TRACING: std::sync::Once = std::sync::Once::new();

/// Install a tracing subscriber honoring `RUST_LOG`, once per process.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

const IMAGE_DATA_ID: u64 = 1;
const HIERARCHY_ID: u64 = 2;
const SERVER_ID: u64 = 3;

// =============================================================================
// Synthetic Images
// =============================================================================

/// Description of the synthetic image the mock serves.
#[derive(Debug, Clone)]
pub struct MockImage {
    pub levels: Vec<LevelDescription>,
    pub downsamples: Vec<f64>,
    pub n_channels: u32,
    pub is_rgb: bool,
    pub pixel_type: &'static str,
}

impl MockImage {
    /// A three-level packed RGB pyramid. The middle level has a
    /// non-integral downsample, so block extents round imperfectly.
    pub fn rgb() -> Self {
        Self {
            levels: vec![
                LevelDescription {
                    width: 480,
                    height: 360,
                },
                LevelDescription {
                    width: 200,
                    height: 150,
                },
                LevelDescription {
                    width: 120,
                    height: 90,
                },
            ],
            downsamples: vec![1.0, 2.4, 4.0],
            n_channels: 3,
            is_rgb: true,
            pixel_type: "UINT8",
        }
    }

    /// A three-level, three-channel fluorescence pyramid (uint16 planes).
    pub fn fluorescence() -> Self {
        Self {
            n_channels: 3,
            is_rgb: false,
            pixel_type: "UINT16",
            ..Self::rgb()
        }
    }
}

/// Deterministic pixel value at full-resolution coordinates.
fn pixel_value(x: f64, y: f64, c: u32) -> u16 {
    let xi = x.round() as i64;
    let yi = y.round() as i64;
    ((xi * 7 + yi * 13 + c as i64 * 101).rem_euclid(251)) as u16
}

/// Render and encode one region the way the remote writer would.
fn encode_region(image: &MockImage, region: &RegionRequest) -> Vec<u8> {
    let d = region.downsample;
    // The remote side truncates when mapping a scaled region back to level
    // pixels, which is what produces off-by-one shapes at coarse levels.
    let out_w = ((region.width as f64 / d).floor() as u32).max(1);
    let out_h = ((region.height as f64 / d).floor() as u32).max(1);

    let mut buf = Cursor::new(Vec::new());
    let mut encoder = TiffEncoder::new(&mut buf).expect("in-memory TIFF encoder");

    if image.is_rgb {
        let mut data = Vec::with_capacity((out_w * out_h * 3) as usize);
        for j in 0..out_h {
            for i in 0..out_w {
                let fx = region.x as f64 + i as f64 * d;
                let fy = region.y as f64 + j as f64 * d;
                for c in 0..3 {
                    data.push(pixel_value(fx, fy, c) as u8);
                }
            }
        }
        encoder
            .write_image::<colortype::RGB8>(out_w, out_h, &data)
            .expect("encode RGB region");
    } else {
        for c in 0..image.n_channels {
            let mut plane = Vec::with_capacity((out_w * out_h) as usize);
            for j in 0..out_h {
                for i in 0..out_w {
                    let fx = region.x as f64 + i as f64 * d;
                    let fy = region.y as f64 + j as f64 * d;
                    plane.push(pixel_value(fx, fy, c));
                }
            }
            encoder
                .write_image::<colortype::Gray16>(out_w, out_h, &plane)
                .expect("encode channel plane");
        }
    }
    buf.into_inner()
}

// =============================================================================
// Mock Gateway
// =============================================================================

struct MockState {
    image: Option<MockImage>,
    tma_grid: bool,
    objects: Vec<(u64, Value)>,
    next_object_id: u64,
    selections: HashMap<u64, Vec<u64>>,
    pending_inserts: HashMap<u64, Vec<Value>>,
}

pub struct MockGateway {
    state: Mutex<MockState>,
    next_handle: AtomicU64,
    description_calls: AtomicUsize,
}

impl MockGateway {
    /// A gateway with one open image and an empty object store.
    pub fn with_image(image: MockImage) -> Arc<Self> {
        init_tracing();
        Arc::new(Self {
            state: Mutex::new(MockState {
                image: Some(image),
                tma_grid: false,
                objects: Vec::new(),
                next_object_id: 1,
                selections: HashMap::new(),
                pending_inserts: HashMap::new(),
            }),
            next_handle: AtomicU64::new(100),
            description_calls: AtomicUsize::new(0),
        })
    }

    /// A gateway with no open image.
    pub fn empty() -> Arc<Self> {
        let gateway = Self::with_image(MockImage::rgb());
        gateway.state.lock().unwrap().image = None;
        gateway
    }

    pub fn session(self: &Arc<Self>) -> Session {
        Session::new(Arc::clone(self) as Arc<dyn Gateway>)
    }

    pub fn image_data_handle() -> RemoteHandle {
        RemoteHandle::new(IMAGE_DATA_ID)
    }

    pub fn hierarchy_handle() -> RemoteHandle {
        RemoteHandle::new(HIERARCHY_ID)
    }

    pub fn server_handle() -> RemoteHandle {
        RemoteHandle::new(SERVER_ID)
    }

    /// Enable the TMA grid (absent by default).
    pub fn set_tma_grid(&self, present: bool) {
        self.state.lock().unwrap().tma_grid = present;
    }

    /// Seed one object directly into the store.
    pub fn push_object(&self, object_type: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_object_id;
        state.next_object_id += 1;
        let feature = json!({
            "type": "Feature",
            "id": format!("obj-{id}"),
            "geometry": {"type": "Point", "coordinates": [id, id]},
            "properties": {"object_type": object_type, "name": name}
        });
        state.objects.push((id, feature));
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    /// Names of stored objects, in hierarchy order.
    pub fn object_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter_map(|(_, obj)| {
                obj.get("properties")?
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect()
    }

    /// How many times the server description was fetched.
    pub fn description_calls(&self) -> usize {
        self.description_calls.load(Ordering::SeqCst)
    }

    fn fresh_handle(&self) -> RemoteHandle {
        RemoteHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    fn object_type_of(value: &Value) -> Option<&str> {
        value.get("properties")?.get("object_type")?.as_str()
    }
}

impl Gateway for MockGateway {
    fn type_tag(&self, handle: &RemoteHandle) -> Result<Option<RemoteTypeTag>, GatewayError> {
        Ok(match handle.id() {
            IMAGE_DATA_ID => Some(RemoteTypeTag::ImageData),
            HIERARCHY_ID => Some(RemoteTypeTag::ObjectHierarchy),
            SERVER_ID => Some(RemoteTypeTag::ImageServer),
            _ => None,
        })
    }

    fn current_image_data(&self) -> Result<Option<RemoteHandle>, GatewayError> {
        let state = self.state.lock().unwrap();
        Ok(state.image.as_ref().map(|_| Self::image_data_handle()))
    }

    fn image_server(&self, image_data: &RemoteHandle) -> Result<RemoteHandle, GatewayError> {
        if image_data.id() != IMAGE_DATA_ID {
            return Err(GatewayError::call("image_server", "not an image-data handle"));
        }
        Ok(Self::server_handle())
    }

    fn object_hierarchy(&self, image_data: &RemoteHandle) -> Result<RemoteHandle, GatewayError> {
        if image_data.id() != IMAGE_DATA_ID {
            return Err(GatewayError::call(
                "object_hierarchy",
                "not an image-data handle",
            ));
        }
        Ok(Self::hierarchy_handle())
    }

    fn server_description(
        &self,
        server: &RemoteHandle,
    ) -> Result<ServerDescription, GatewayError> {
        if server.id() != SERVER_ID {
            return Err(GatewayError::call("server_description", "unknown server"));
        }
        self.description_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let image = state
            .image
            .as_ref()
            .ok_or_else(|| GatewayError::call("server_description", "no image open"))?;
        Ok(ServerDescription {
            name: "mock slide.ome.tif".to_string(),
            path: "remote-entry:mock".to_string(),
            uris: vec!["file:///data/mock%20slide.ome.tif".to_string()],
            pixel_type: image.pixel_type.to_string(),
            is_rgb: image.is_rgb,
            downsamples: image.downsamples.clone(),
            levels: image.levels.clone(),
            n_channels: image.n_channels,
            n_z_slices: 1,
            n_timepoints: 1,
            pixel_width_microns: Some(0.25),
            pixel_height_microns: Some(0.25),
            z_spacing_microns: None,
            channels: (0..image.n_channels)
                .map(|c| ChannelDescription {
                    name: format!("Channel {}", c + 1),
                    color: 0xFF8000 >> (8 * (c % 3)),
                })
                .collect(),
        })
    }

    fn write_image_region(
        &self,
        server: &RemoteHandle,
        region: &RegionRequest,
        path: &Path,
        format: &str,
    ) -> Result<(), GatewayError> {
        let bytes = self.read_image_bytes(server, region, format)?;
        std::fs::write(path, &bytes)
            .map_err(|e| GatewayError::call("write_image_region", e.to_string()))
    }

    fn read_image_bytes(
        &self,
        server: &RemoteHandle,
        region: &RegionRequest,
        _format: &str,
    ) -> Result<Bytes, GatewayError> {
        if server.id() != SERVER_ID {
            return Err(GatewayError::call("read_image_bytes", "unknown server"));
        }
        let state = self.state.lock().unwrap();
        let image = state
            .image
            .as_ref()
            .ok_or_else(|| GatewayError::call("read_image_bytes", "no image open"))?;
        Ok(Bytes::from(encode_region(image, region)))
    }

    fn read_image_base64(
        &self,
        server: &RemoteHandle,
        region: &RegionRequest,
        format: &str,
    ) -> Result<String, GatewayError> {
        Ok(STANDARD.encode(self.read_image_bytes(server, region, format)?))
    }

    fn select_objects(
        &self,
        hierarchy: &RemoteHandle,
        selector: ObjectSelector,
    ) -> Result<Option<RemoteHandle>, GatewayError> {
        if hierarchy.id() != HIERARCHY_ID {
            return Err(GatewayError::call("select_objects", "unknown hierarchy"));
        }
        let mut state = self.state.lock().unwrap();
        let wanted: Vec<u64> = match selector {
            ObjectSelector::All => state.objects.iter().map(|(id, _)| *id).collect(),
            ObjectSelector::Kind(kind) => {
                if kind == wsi_bridge::objects::ObjectType::TmaCore && !state.tma_grid {
                    return Ok(None);
                }
                state
                    .objects
                    .iter()
                    .filter(|(_, obj)| Self::object_type_of(obj) == Some(kind.as_str()))
                    .map(|(id, _)| *id)
                    .collect()
            }
        };
        let handle = self.fresh_handle();
        state.selections.insert(handle.id(), wanted);
        Ok(Some(handle))
    }

    fn to_feature_collections(
        &self,
        objects: &RemoteHandle,
        batch_size: usize,
    ) -> Result<Vec<String>, GatewayError> {
        let state = self.state.lock().unwrap();
        let ids = state
            .selections
            .get(&objects.id())
            .ok_or_else(|| GatewayError::call("to_feature_collections", "unknown object list"))?;
        let by_id: HashMap<u64, &Value> =
            state.objects.iter().map(|(id, obj)| (*id, obj)).collect();

        let mut collections = Vec::new();
        for chunk in ids.chunks(batch_size.max(1)) {
            let features: Vec<Value> = chunk
                .iter()
                .filter_map(|id| by_id.get(id).map(|obj| (*obj).clone()))
                .collect();
            let collection = json!({"type": "FeatureCollection", "features": features});
            let text = interchange::to_string(&collection)
                .map_err(|e| GatewayError::call("to_feature_collections", e.to_string()))?;
            collections.push(text);
        }
        Ok(collections)
    }

    fn to_remote_objects(&self, feature_json: &str) -> Result<RemoteHandle, GatewayError> {
        let parsed = interchange::parse(feature_json)
            .map_err(|e| GatewayError::call("to_remote_objects", e.to_string()))?;
        let features: Vec<Value> = interchange::unwrap_features(parsed)
            .into_iter()
            .map(Value::Object)
            .collect();
        let handle = self.fresh_handle();
        self.state
            .lock()
            .unwrap()
            .pending_inserts
            .insert(handle.id(), features);
        Ok(handle)
    }

    fn insert_objects(
        &self,
        hierarchy: &RemoteHandle,
        objects: &RemoteHandle,
    ) -> Result<(), GatewayError> {
        if hierarchy.id() != HIERARCHY_ID {
            return Err(GatewayError::call("insert_objects", "unknown hierarchy"));
        }
        let mut state = self.state.lock().unwrap();
        let features = state
            .pending_inserts
            .remove(&objects.id())
            .ok_or_else(|| GatewayError::call("insert_objects", "unknown object list"))?;
        for mut feature in features {
            let id = state.next_object_id;
            state.next_object_id += 1;
            // The application reassigns identifiers on insertion.
            if let Some(obj) = feature.as_object_mut() {
                obj.insert("id".to_string(), json!(format!("obj-{id}")));
            }
            state.objects.push((id, feature));
        }
        Ok(())
    }

    fn remove_objects(
        &self,
        hierarchy: &RemoteHandle,
        objects: &RemoteHandle,
    ) -> Result<(), GatewayError> {
        if hierarchy.id() != HIERARCHY_ID {
            return Err(GatewayError::call("remove_objects", "unknown hierarchy"));
        }
        let mut state = self.state.lock().unwrap();
        let doomed = state
            .selections
            .remove(&objects.id())
            .ok_or_else(|| GatewayError::call("remove_objects", "unknown object list"))?;
        state.objects.retain(|(id, _)| !doomed.contains(id));
        Ok(())
    }

    fn clear_all_objects(&self, hierarchy: &RemoteHandle) -> Result<(), GatewayError> {
        if hierarchy.id() != HIERARCHY_ID {
            return Err(GatewayError::call("clear_all_objects", "unknown hierarchy"));
        }
        self.state.lock().unwrap().objects.clear();
        Ok(())
    }
}

/// Build a feature with a polygon geometry, classification and measurements.
pub fn polygon_feature(
    name: &str,
    object_type: &str,
    classification: &str,
    measurements: &[(&str, f64)],
) -> wsi_bridge::objects::Feature {
    let measurements: Map<String, Value> = measurements
        .iter()
        .map(|(k, v)| (k.to_string(), interchange::number_value(*v)))
        .collect();
    let value = json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [100.0, 0.0], [100.0, 80.0], [0.0, 0.0]]]
        },
        "properties": {
            "object_type": object_type,
            "name": name,
            "classification": {"name": classification, "color": [200, 50, 50]},
            "measurements": measurements,
            "plane": {"z": 0, "t": 0}
        }
    });
    match value {
        Value::Object(obj) => wsi_bridge::objects::Feature(obj),
        _ => unreachable!(),
    }
}

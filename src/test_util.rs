//! Fixtures shared by unit tests.

use std::{cell::RefCell, sync::Once};

use glam::{Quat, Vec2, Vec3};

use crate::{
    animation::{AnimationClip, Channel, ChannelValues, Interpolation},
    asset_pipeline::gltf_asset::{AssetNode, GltfAsset},
    material::Material,
    model::{Model, ModelPrimitive, Vertex},
};

pub fn box_model(min: Vec3, max: Vec3) -> Model {
    let corners = crate::math::bounds::AABB::new(min, max).corners();
    let vertices = corners
        .iter()
        .map(|&position| Vertex {
            position,
            normal: Vec3::Y,
            tex_coords: Vec2::ZERO,
        })
        .collect();

    Model {
        name: "Box".to_string(),
        primitives: vec![ModelPrimitive::new(
            0,
            vertices,
            vec![0, 1, 2, 2, 1, 3, 4, 6, 5, 5, 6, 7],
            Some(0),
        )],
    }
}

/// Two nested nodes sharing one box mesh spanning `min..max`, plus
/// `clip_count` one-second clips that slide the child along +Y.
pub fn box_asset(min: Vec3, max: Vec3, clip_count: usize) -> GltfAsset {
    let node = |name: &str, children: Vec<usize>| AssetNode {
        name: name.to_string(),
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        mesh: Some(0),
        children,
    };

    let clips = (0..clip_count)
        .map(|index| {
            AnimationClip::new(
                format!("Clip {index}"),
                vec![Channel {
                    node: 1,
                    interpolation: Interpolation::Linear,
                    times: vec![0.0, 1.0],
                    values: ChannelValues::Translation(vec![Vec3::ZERO, Vec3::Y]),
                }],
            )
        })
        .collect();

    GltfAsset {
        name: "Box asset".to_string(),
        nodes: vec![node("Box", vec![1]), node("Box child", vec![])],
        roots: vec![0],
        meshes: vec![Some(box_model(min, max))],
        materials: vec![Material::default()],
        clips,
    }
}

struct CaptureLogger;

thread_local! {
    static CAPTURED: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        CAPTURED.with(|captured| {
            captured
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT_LOGGER: Once = Once::new();

/// Starts capturing log records emitted on the current thread.
pub fn capture_logs() {
    INIT_LOGGER.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });

    CAPTURED.with(|captured| captured.borrow_mut().clear());
}

pub fn captured_logs(level: log::Level) -> Vec<String> {
    CAPTURED.with(|captured| {
        captured
            .borrow()
            .iter()
            .filter(|(record_level, _)| *record_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}

/// Writes a one-triangle glTF with an external buffer and a one-second
/// translation clip into a fresh temp directory; returns the `.gltf` path.
pub fn write_triangle_gltf(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("village-viewer-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let floats: [f32; 17] = [
        // Positions
        0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
        // Keyframe times
        0.0, 1.0, //
        // Translations
        0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
    ];
    let bytes: Vec<u8> = floats.iter().flat_map(|f| f.to_le_bytes()).collect();
    std::fs::write(dir.join("triangle.bin"), &bytes).unwrap();

    let json = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Triangle", "mesh": 0 }],
        "meshes": [{ "name": "Triangle", "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{ "uri": "triangle.bin", "byteLength": 68 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [2.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [1.0] },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
        ],
        "animations": [{
            "name": "Bounce",
            "samplers": [{ "input": 1, "output": 2, "interpolation": "LINEAR" }],
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }]
        }]
    }"#;

    let path = dir.join("triangle.gltf");
    std::fs::write(&path, json).unwrap();
    path
}

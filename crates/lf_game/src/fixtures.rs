//! In-memory assets shared by the unit tests.

use std::collections::HashMap;
use std::io;

use glam::Vec3;
use lf_render::Geometry;
use serde_json::json;

use crate::assets::AssetSource;

#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), bytes);
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

/// Character, building and font at their default config paths.
pub fn scene_source() -> MemorySource {
    let mut source = MemorySource::default();
    source.insert("models/soldier.glb", box_model_glb(&["Idle", "Walk", "Run"]));
    source.insert("models/building.glb", box_model_glb(&[]));
    source.insert(
        "fonts/bruno_ace_regular.json",
        typeface_json("CHINEDU?").into_bytes(),
    );
    source
}

/// Typeface JSON where every listed glyph is a 600x700 rectangle.
pub fn typeface_json(chars: &str) -> String {
    let glyphs: serde_json::Map<String, serde_json::Value> = chars
        .chars()
        .map(|c| {
            (
                c.to_string(),
                json!({ "ha": 700, "x_min": 0, "x_max": 600, "o": "m 0 0 l 600 0 l 600 700 l 0 700 z" }),
            )
        })
        .collect();
    json!({ "familyName": "Fixture Sans", "resolution": 1000, "glyphs": glyphs }).to_string()
}

/// A red box spanning x in [2.5, 3.5], y in [0, 2], z in [-0.5, 0.5] (the
/// node carries the +3 x offset), with one 1-second clip per name.
pub fn box_model_glb(clip_names: &[&str]) -> Vec<u8> {
    let geometry = Geometry::cuboid(Vec3::new(0.5, 1.0, 0.5))
        .transformed(glam::Mat4::from_translation(Vec3::Y));
    let mut bin = Vec::new();
    for p in &geometry.positions {
        bin.extend(p.to_array().iter().flat_map(|f| f.to_le_bytes()));
    }
    for n in &geometry.normals {
        bin.extend(n.to_array().iter().flat_map(|f| f.to_le_bytes()));
    }
    for i in &geometry.indices {
        bin.extend(i.to_le_bytes());
    }
    let times_offset = bin.len();
    for t in [0.0_f32, 1.0] {
        bin.extend(t.to_le_bytes());
    }
    let values_offset = bin.len();
    for v in [0.0_f32, 0.0, 0.0, 0.0, 0.5, 0.0] {
        bin.extend(v.to_le_bytes());
    }

    let vertex_bytes = geometry.positions.len() * 12;
    let animations: Vec<_> = clip_names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
                "samplers": [{ "input": 3, "output": 4 }]
            })
        })
        .collect();

    let mut doc = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Box", "mesh": 0, "translation": [3.0, 0.0, 0.0] }],
        "meshes": [{
            "name": "Box",
            "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2, "material": 0 }]
        }],
        "materials": [{ "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }],
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": vertex_bytes },
            { "buffer": 0, "byteOffset": vertex_bytes, "byteLength": vertex_bytes },
            { "buffer": 0, "byteOffset": vertex_bytes * 2, "byteLength": geometry.indices.len() * 4 },
            { "buffer": 0, "byteOffset": times_offset, "byteLength": 8 },
            { "buffer": 0, "byteOffset": values_offset, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": geometry.positions.len(), "type": "VEC3",
              "min": [-0.5, 0.0, -0.5], "max": [0.5, 2.0, 0.5] },
            { "bufferView": 1, "componentType": 5126, "count": geometry.normals.len(), "type": "VEC3" },
            { "bufferView": 2, "componentType": 5125, "count": geometry.indices.len(), "type": "SCALAR" },
            { "bufferView": 3, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
            { "bufferView": 4, "componentType": 5126, "count": 2, "type": "VEC3" }
        ]
    });
    if !animations.is_empty() {
        doc["animations"] = serde_json::Value::Array(animations);
    }
    glb(&doc.to_string(), &bin)
}

/// Wrap a JSON document and binary chunk in a GLB container.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = json.as_bytes().to_vec();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let mut bin_chunk = bin.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend(b"glTF");
    out.extend(2u32.to_le_bytes());
    out.extend((total as u32).to_le_bytes());
    out.extend((json_chunk.len() as u32).to_le_bytes());
    out.extend(0x4E4F_534Au32.to_le_bytes());
    out.extend(json_chunk);
    out.extend((bin_chunk.len() as u32).to_le_bytes());
    out.extend(0x004E_4942u32.to_le_bytes());
    out.extend(bin_chunk);
    out
}

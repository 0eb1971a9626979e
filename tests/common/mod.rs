#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

/// Minimal 24-bit BMP with the given dimensions; enough for header probing.
pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// Writes a real JPEG so that source extensions match their content.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    image::RgbImage::new(width, height)
        .save(path)
        .expect("write jpeg file");
}

/// A polygon region as it appears in a VIA export.
pub fn polygon_region(xs: &[i32], ys: &[i32], label: Option<&str>) -> Value {
    let attributes = match label {
        Some(label) => json!({ "Type": label }),
        None => json!({}),
    };
    json!({
        "shape_attributes": {
            "name": "polygon",
            "all_points_x": xs,
            "all_points_y": ys,
        },
        "region_attributes": attributes,
    })
}

pub fn square_region(label: Option<&str>) -> Value {
    polygon_region(&[0, 10, 10, 0], &[0, 0, 10, 10], label)
}

/// One VIA entry keyed the way the annotator keys them.
pub fn entry(filename: &str, regions: Vec<Value>) -> (String, Value) {
    (
        format!("{}1234", filename),
        json!({
            "filename": filename,
            "size": 1234,
            "regions": regions,
            "file_attributes": {},
        }),
    )
}

/// Serializes entries as a VIA export, keeping the given key order.
pub fn document_json(entries: &[(String, Value)]) -> String {
    let body: Vec<String> = entries
        .iter()
        .map(|(id, value)| {
            format!(
                "{}: {}",
                serde_json::to_string(id).expect("serialize id"),
                serde_json::to_string(value).expect("serialize entry")
            )
        })
        .collect();
    format!("{{{}}}", body.join(","))
}

pub fn write_document(path: &Path, entries: &[(String, Value)]) {
    fs::write(path, document_json(entries)).expect("write annotations");
}

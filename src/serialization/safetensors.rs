//! `SafeTensors` format implementation for model serialization.
//!
//! Implements the `SafeTensors` layout:
//! ```text
//! [8-byte header: u64 metadata length (little-endian)]
//! [JSON metadata: tensor names, dtypes, shapes, data_offsets,
//!  optional __metadata__ string map]
//! [Raw tensor data: F32 values in little-endian]
//! ```
//!
//! Only F32 tensors are produced or consumed here; that is all a
//! stored nearest-neighbor model needs, and F32 little-endian bytes
//! round-trip without precision loss.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Metadata for a single tensor in `SafeTensors` format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorMetadata {
    /// Data type of the tensor (always "F32" here).
    pub dtype: String,
    /// Shape of the tensor (e.g., `[n_samples, n_features]`).
    pub shape: Vec<usize>,
    /// Data offsets `[start, end]` in the raw data section.
    pub data_offsets: [usize; 2],
}

/// Complete tensor metadata mapping.
/// Uses `BTreeMap` for deterministic JSON serialization (sorted keys).
pub type SafeTensorsMetadata = BTreeMap<String, TensorMetadata>;

/// User metadata from the `__metadata__` header section.
/// `SafeTensors` stores arbitrary string-to-string metadata there.
pub type UserMetadata = BTreeMap<String, String>;

/// Saves tensors plus user metadata to `SafeTensors` format,
/// overwriting any existing file wholesale.
///
/// # Arguments
///
/// * `path` - File path to write to
/// * `tensors` - Map of tensor names to (data, shape) tuples
/// * `user_metadata` - String map written under `__metadata__`
///
/// # Errors
///
/// Returns [`Error::Io`] if file writing fails and
/// [`Error::CorruptStore`] if JSON serialization fails.
pub fn save_safetensors<P: AsRef<Path>>(
    path: P,
    tensors: &BTreeMap<String, (Vec<f32>, Vec<usize>)>,
    user_metadata: &UserMetadata,
) -> Result<()> {
    let mut header = serde_json::Map::new();

    if !user_metadata.is_empty() {
        let meta_obj: serde_json::Map<String, serde_json::Value> = user_metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        header.insert(
            "__metadata__".to_string(),
            serde_json::Value::Object(meta_obj),
        );
    }

    let mut raw_data = Vec::new();
    let mut current_offset = 0;

    // BTreeMap already provides sorted iteration, so offsets are
    // deterministic for a given tensor set.
    for (name, (data, shape)) in tensors {
        let start_offset = current_offset;
        let data_size = data.len() * 4; // F32 = 4 bytes
        let end_offset = current_offset + data_size;

        let tensor_meta = serde_json::to_value(TensorMetadata {
            dtype: "F32".to_string(),
            shape: shape.clone(),
            data_offsets: [start_offset, end_offset],
        })
        .map_err(|e| Error::corrupt_store(format!("JSON serialization failed: {e}")))?;
        header.insert(name.clone(), tensor_meta);

        for &value in data {
            raw_data.extend_from_slice(&value.to_le_bytes());
        }
        current_offset = end_offset;
    }

    let metadata_json = serde_json::to_string(&header)
        .map_err(|e| Error::corrupt_store(format!("JSON serialization failed: {e}")))?;
    let metadata_bytes = metadata_json.as_bytes();
    let metadata_len = metadata_bytes.len() as u64;

    let mut output = Vec::new();
    output.extend_from_slice(&metadata_len.to_le_bytes());
    output.extend_from_slice(metadata_bytes);
    output.extend_from_slice(&raw_data);

    fs::write(path, output)?;
    Ok(())
}

/// Loads tensors from `SafeTensors` format.
///
/// # Returns
///
/// `(metadata, user_metadata, raw_data)` where `raw_data` is the raw
/// tensor byte section.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and
/// [`Error::CorruptStore`] if the header, JSON metadata, or data
/// section is malformed.
pub fn load_safetensors<P: AsRef<Path>>(
    path: P,
) -> Result<(SafeTensorsMetadata, UserMetadata, Vec<u8>)> {
    let bytes = fs::read(path)?;
    let metadata_len = validate_and_read_header(&bytes)?;
    let (metadata, user_metadata) = parse_metadata(&bytes, metadata_len)?;
    let raw_data = bytes[8 + metadata_len..].to_vec();
    Ok((metadata, user_metadata, raw_data))
}

/// Extracts a tensor's F32 values from the raw data section.
///
/// # Errors
///
/// Returns [`Error::CorruptStore`] if the offsets are out of bounds,
/// misaligned, or the dtype is not F32.
pub fn extract_tensor(raw_data: &[u8], meta: &TensorMetadata) -> Result<Vec<f32>> {
    if meta.dtype != "F32" {
        return Err(Error::corrupt_store(format!(
            "unsupported dtype: {}",
            meta.dtype
        )));
    }

    let [start, end] = meta.data_offsets;
    if end < start || end > raw_data.len() {
        return Err(Error::corrupt_store(format!(
            "tensor data offsets [{start}, {end}] out of bounds (data len {})",
            raw_data.len()
        )));
    }

    let tensor_bytes = &raw_data[start..end];
    if tensor_bytes.len() % 4 != 0 {
        return Err(Error::corrupt_store(
            "tensor byte length is not a multiple of 4",
        ));
    }

    Ok(tensor_bytes
        .chunks_exact(4)
        .map(|chunk| {
            f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        })
        .collect())
}

/// Validates the 8-byte header and returns the metadata length.
fn validate_and_read_header(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < 8 {
        return Err(Error::corrupt_store(format!(
            "file too short for header: {} bytes",
            bytes.len()
        )));
    }

    let metadata_len = u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]) as usize;

    // metadata_len comes straight from the file; 8 + metadata_len can
    // overflow on a hostile header, so compare against the remainder.
    if metadata_len > bytes.len().saturating_sub(8) {
        return Err(Error::corrupt_store(format!(
            "metadata length {metadata_len} exceeds file size {}",
            bytes.len()
        )));
    }

    Ok(metadata_len)
}

/// Parses the JSON metadata section, splitting off `__metadata__`.
fn parse_metadata(bytes: &[u8], metadata_len: usize) -> Result<(SafeTensorsMetadata, UserMetadata)> {
    let metadata_json = std::str::from_utf8(&bytes[8..8 + metadata_len])
        .map_err(|e| Error::corrupt_store(format!("metadata is not valid UTF-8: {e}")))?;

    let header: serde_json::Map<String, serde_json::Value> = serde_json::from_str(metadata_json)
        .map_err(|e| Error::corrupt_store(format!("JSON parse failed: {e}")))?;

    let mut metadata = SafeTensorsMetadata::new();
    let mut user_metadata = UserMetadata::new();

    for (key, value) in header {
        if key == "__metadata__" {
            let obj = value.as_object().ok_or_else(|| {
                Error::corrupt_store("__metadata__ is not a JSON object")
            })?;
            for (k, v) in obj {
                let s = v.as_str().ok_or_else(|| {
                    Error::corrupt_store(format!("__metadata__ value for '{k}' is not a string"))
                })?;
                user_metadata.insert(k.clone(), s.to_string());
            }
        } else {
            let tensor_meta: TensorMetadata = serde_json::from_value(value).map_err(|e| {
                Error::corrupt_store(format!("invalid tensor metadata for '{key}': {e}"))
            })?;
            metadata.insert(key, tensor_meta);
        }
    }

    Ok((metadata, user_metadata))
}

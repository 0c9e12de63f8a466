//! Per-transform buffer dumps, driven by environment variables.
//!
//! Setting `SFE_DUMP_<CLASS>` (e.g. `SFE_DUMP_RDFT=1`) makes the executor
//! serialize that class's output buffers to `<dir>/<class>.bin` on every
//! invocation. The directory comes from the engine configuration, the
//! `SFE_DUMP_DIR` variable, or defaults to the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::arena::BufferView;
use crate::error::SfeResult;

/// Environment variable prefix for dump requests.
const PREFIX: &str = "SFE_DUMP_";

/// Uppercases a class name and replaces every non-alphanumeric run with an
/// underscore, so `"ArrayInt16 -> ArrayRealFloat"` becomes
/// `ARRAYINT16_ARRAYREALFLOAT`.
pub fn sanitize_class(class: &str) -> String {
    let mut out = String::with_capacity(class.len());
    let mut last_underscore = true;
    for c in class.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// True when the environment requests dumps for this transform class.
pub fn requested(class: &str) -> bool {
    match std::env::var(format!("{PREFIX}{}", sanitize_class(class))) {
        Ok(value) => !value.is_empty() && value != "0",
        Err(_) => false,
    }
}

/// Dump directory: engine configuration first, then `SFE_DUMP_DIR`, then
/// the working directory.
pub fn directory(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    std::env::var_os("SFE_DUMP_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Writes the payloads of every buffer, concatenated, to
/// `<dir>/<class>.bin`.
pub fn write(class: &str, buffers: &BufferView<'_>, dir: &Path) -> SfeResult<PathBuf> {
    let path = dir.join(format!("{}.bin", sanitize_class(class)));
    let mut bytes = Vec::with_capacity(buffers.count() * buffers.format().unaligned_byte_size());
    for i in 0..buffers.count() {
        bytes.extend_from_slice(buffers.bytes(i));
    }
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, Binding, BufferViewMut};
    use crate::format::{BufferFormat, FormatId};

    #[test]
    fn class_names_sanitize_deterministically() {
        assert_eq!(sanitize_class("RDFT"), "RDFT");
        assert_eq!(sanitize_class("ComplexMagnitude"), "COMPLEXMAGNITUDE");
        assert_eq!(
            sanitize_class("ArrayInt16 -> ArrayRealFloat"),
            "ARRAYINT16_ARRAYREALFLOAT"
        );
    }

    #[test]
    fn writes_payloads_back_to_back() {
        let dir = tempfile::tempdir().unwrap();
        let fmt = BufferFormat::new(FormatId::Real, 2, 16000).unwrap();
        let binding = Binding::new(0, 2, fmt);
        let mut arena = Arena::new(binding.byte_len()).unwrap();
        {
            let mut view = BufferViewMut::new(&binding, arena.bytes_mut());
            view.real_mut(0).copy_from_slice(&[1.0, 2.0]);
            view.real_mut(1).copy_from_slice(&[3.0, 4.0]);
        }
        let view = crate::arena::BufferView::new(&binding, arena.bytes());
        let path = write("Energy", &view, dir.path()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 16);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0]);
    }
}

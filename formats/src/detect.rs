//! Recognizes the fixture file formats from their leading bytes.

use std::{
    fmt::{self, Display},
    fs::File,
    io::Read,
    path::Path,
};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Onnx,
    SafeTensors,
    Npy,
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileFormat::Onnx => "onnx",
            FileFormat::SafeTensors => "safetensors",
            FileFormat::Npy => "npy",
        };

        f.write_str(s)
    }
}

/// Guesses the format of a file from its first bytes.
///
/// * npy files start with `\x93NUMPY`.
/// * safetensors files start with the little endian length of their JSON header, which opens
///   with `{`.
/// * ONNX models start with the tag of `ir_version`, field 1 as a varint (`0x08`).
pub fn detect(bytes: &[u8]) -> Option<FileFormat> {
    sniff(bytes, bytes.len() as u64)
}

/// Reads just enough of the file at `path` to guess its format.
pub fn detect_file<P: AsRef<Path>>(path: P) -> Result<Option<FileFormat>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();

    let mut head = Vec::with_capacity(16);
    file.take(16).read_to_end(&mut head)?;

    Ok(sniff(&head, len))
}

/// `head` is the start of a file holding `len` bytes in total.
fn sniff(head: &[u8], len: u64) -> Option<FileFormat> {
    if head.starts_with(b"\x93NUMPY") {
        return Some(FileFormat::Npy);
    }

    if let [a, b, c, d, e, f, g, h, b'{', ..] = head {
        let header_len = u64::from_le_bytes([*a, *b, *c, *d, *e, *f, *g, *h]);
        if header_len > 0 && header_len <= len.saturating_sub(8) {
            return Some(FileFormat::SafeTensors);
        }
    }

    if head.len() > 4 && head[0] == 0x08 {
        return Some(FileFormat::Onnx);
    }

    None
}

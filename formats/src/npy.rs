//! NumPy `.npy` files holding little endian `float32` arrays in C order.

use std::{fs, path::Path};

use log::debug;
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::{FormatErr, Result, le_f32s};

const MAGIC: &[u8] = b"\x93NUMPY";
const DESCR: &str = "<f4";
const ALIGNMENT: usize = 64;

/// Encodes an array as a version 1.0 `.npy` file.
///
/// The header is padded with spaces so the data starts on a 64 byte boundary, like NumPy does.
pub fn encode<S, D>(array: &ArrayBase<S, D>) -> Vec<u8>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let mut header = format!(
        "{{'descr': '{DESCR}', 'fortran_order': False, 'shape': {}, }}",
        shape_repr(array.shape())
    );

    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat_n(' ', padding));
    header.push('\n');

    let mut bytes = Vec::with_capacity(unpadded + padding + array.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    // `iter` walks the array in logical (row-major) order whatever its memory layout.
    bytes.extend(array.iter().flat_map(|v| v.to_le_bytes()));
    bytes
}

/// Decodes a `.npy` file holding a C ordered `<f4` array.
pub fn decode(bytes: &[u8]) -> Result<ArrayD<f32>> {
    let Some(rest) = bytes.strip_prefix(MAGIC) else {
        return Err(FormatErr::Npy("missing magic string".into()));
    };

    let (header_len, rest) = match rest {
        [1, 0, a, b, rest @ ..] => (u16::from_le_bytes([*a, *b]) as usize, rest),
        [2 | 3, 0, a, b, c, d, rest @ ..] => (u32::from_le_bytes([*a, *b, *c, *d]) as usize, rest),
        [major, minor, ..] => {
            return Err(FormatErr::Npy(format!(
                "unsupported format version {major}.{minor}"
            )));
        }
        _ => return Err(FormatErr::Npy("truncated preamble".into())),
    };

    if rest.len() < header_len {
        return Err(FormatErr::Npy("truncated header".into()));
    }
    let (header, data) = rest.split_at(header_len);
    let header =
        std::str::from_utf8(header).map_err(|_| FormatErr::Npy("header is not utf-8".into()))?;

    let descr = header_value(header, "descr")?
        .strip_prefix('\'')
        .and_then(|v| v.split('\'').next())
        .ok_or_else(|| FormatErr::Npy("malformed descr".into()))?;
    if descr != DESCR {
        return Err(FormatErr::Npy(format!("unsupported dtype {descr}")));
    }

    if !header_value(header, "fortran_order")?.starts_with("False") {
        return Err(FormatErr::Npy("fortran ordered arrays are not supported".into()));
    }

    let shape = parse_shape(header_value(header, "shape")?)?;
    let nbytes = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|len| len.checked_mul(4))
        .ok_or_else(|| FormatErr::Npy(format!("shape {shape:?} is too large")))?;

    if data.len() < nbytes {
        return Err(FormatErr::Npy(format!(
            "expected {nbytes} bytes of data, found {}",
            data.len()
        )));
    }

    Ok(ArrayD::from_shape_vec(
        IxDyn(&shape),
        le_f32s(&data[..nbytes]),
    )?)
}

/// Writes an array to `path`, replacing any previous file.
///
/// # Returns
/// The amount of bytes written.
pub fn write_npy<P, S, D>(path: P, array: &ArrayBase<S, D>) -> Result<usize>
where
    P: AsRef<Path>,
    S: Data<Elem = f32>,
    D: Dimension,
{
    let bytes = encode(array);
    fs::write(&path, &bytes)?;
    debug!("wrote {} ({} bytes)", path.as_ref().display(), bytes.len());
    Ok(bytes.len())
}

pub fn read_npy<P: AsRef<Path>>(path: P) -> Result<ArrayD<f32>> {
    decode(&fs::read(path)?)
}

/// Python's tuple notation: `()`, `(4,)`, `(1, 2)`.
fn shape_repr(shape: &[usize]) -> String {
    match shape {
        [n] => format!("({n},)"),
        dims => {
            let dims: Vec<_> = dims.iter().map(usize::to_string).collect();
            format!("({})", dims.join(", "))
        }
    }
}

/// Returns the text right after `'key':` in the header dict.
fn header_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let pattern = format!("'{key}':");
    let start = header
        .find(&pattern)
        .ok_or_else(|| FormatErr::Npy(format!("header has no {key}")))?;

    Ok(header[start + pattern.len()..].trim_start())
}

fn parse_shape(value: &str) -> Result<Vec<usize>> {
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.split(')').next())
        .ok_or_else(|| FormatErr::Npy("malformed shape".into()))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            d.parse()
                .map_err(|_| FormatErr::Npy(format!("invalid dimension {d}")))
        })
        .collect()
}

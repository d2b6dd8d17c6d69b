pub mod detect;
pub mod error;
pub mod npy;
pub mod onnx;
pub mod weights;

pub use error::{FormatErr, Result};

/// Reads packed little endian `f32`s, `bytes` must hold a whole number of them.
pub(crate) fn le_f32s(bytes: &[u8]) -> Vec<f32> {
    bytemuck::allocation::pod_collect_to_vec::<u8, u32>(bytes)
        .into_iter()
        .map(|bits| f32::from_bits(u32::from_le(bits)))
        .collect()
}

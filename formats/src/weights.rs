//! Flat parameter maps stored as safetensors, available behind the `safetensors` feature.

use std::path::Path;

use machine_learning::arch::StateDict;

use crate::Result;
#[cfg(not(feature = "safetensors"))]
use crate::FormatErr;

/// Tells whether this build can read and write safetensors files.
pub fn is_available() -> bool {
    cfg!(feature = "safetensors")
}

/// Writes every tensor of the state dict as `F32`, tagged with `{"format": "pt"}` metadata.
///
/// # Arguments
/// * `state` - The named parameters to store.
/// * `path` - Where to write the file, any previous file is replaced.
#[cfg(feature = "safetensors")]
pub fn save_state_dict<P: AsRef<Path>>(state: &StateDict, path: P) -> Result<()> {
    use std::collections::HashMap;

    use log::debug;
    use safetensors::{Dtype, tensor::TensorView};

    let views = state
        .iter()
        .map(|(name, (data, shape))| {
            let bytes = bytemuck::cast_slice(data.as_slice());
            Ok((name.as_str(), TensorView::new(Dtype::F32, shape.clone(), bytes)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let metadata = Some(HashMap::from([("format".to_string(), "pt".to_string())]));
    safetensors::serialize_to_file(
        views.iter().map(|(name, view)| (*name, view)),
        &metadata,
        path.as_ref(),
    )?;

    debug!(
        "wrote {} tensors to {}",
        state.len(),
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(not(feature = "safetensors"))]
pub fn save_state_dict<P: AsRef<Path>>(_state: &StateDict, _path: P) -> Result<()> {
    Err(FormatErr::Unavailable("safetensors"))
}

/// Reads back every `F32` tensor of a safetensors file.
#[cfg(feature = "safetensors")]
pub fn load_state_dict<P: AsRef<Path>>(path: P) -> Result<StateDict> {
    use safetensors::{Dtype, SafeTensors};

    use crate::{FormatErr, le_f32s};

    let bytes = std::fs::read(path)?;
    let tensors = SafeTensors::deserialize(&bytes)?;
    let mut state = StateDict::new();

    for (name, view) in tensors.tensors() {
        if view.dtype() != Dtype::F32 {
            return Err(FormatErr::SafeTensors(format!(
                "tensor {name} is {:?}, expected F32",
                view.dtype()
            )));
        }

        state.insert(name, (le_f32s(view.data()), view.shape().to_vec()));
    }

    Ok(state)
}

#[cfg(not(feature = "safetensors"))]
pub fn load_state_dict<P: AsRef<Path>>(_path: P) -> Result<StateDict> {
    Err(FormatErr::Unavailable("safetensors"))
}

#[cfg(feature = "safetensors")]
impl From<safetensors::SafeTensorError> for crate::FormatErr {
    fn from(value: safetensors::SafeTensorError) -> Self {
        Self::SafeTensors(format!("{value:?}"))
    }
}

mod dense;
mod layer;
mod softmax;

pub use dense::Dense;
pub use layer::Layer;
pub use softmax::{Softmax, softmax_rows};

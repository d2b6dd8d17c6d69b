use super::ParamGen;

/// Yields the same value a fixed number of times, used to pin a model's parameters to known
/// constants.
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to yield.
    /// * `limit` - How many values to yield before running dry.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        let take = n.min(self.remaining);
        self.remaining -= take;
        Some(vec![self.value; take])
    }
}

//! Recurrent smoothing of intensity vectors
//!
//! A gated low-pass filter over a stream of intensity vectors. A stale
//! stimulus decays away, a sustained one takes over, and every value
//! stays in `[0, 1]`.
//!
//! Per category, with `x` the normalized input, `x'` the previous input and
//! `h'` the previous output:
//!
//! ```text
//! u = sigmoid(-1 + 0.5 x' - 0.5 h')        update gate
//! r = sigmoid( 1 - 0.3 x' + 0.3 h')        reset gate
//! h = clamp01(u h' + (1 - u) clamp01(x - 0.1 r h'))
//! ```

use crate::emotion::IntensityVector;

/// Totals at or below this are treated as "no signal" and not normalized
pub const NORMALIZE_EPSILON: f32 = 1e-6;

const UPDATE_BIAS: f32 = -1.0;
const UPDATE_INPUT_WEIGHT: f32 = 0.5;
const UPDATE_STATE_WEIGHT: f32 = -0.5;
const RESET_BIAS: f32 = 1.0;
const RESET_INPUT_WEIGHT: f32 = -0.3;
const RESET_STATE_WEIGHT: f32 = 0.3;
const CANDIDATE_INPUT_WEIGHT: f32 = 1.0;
const CANDIDATE_RESET_WEIGHT: f32 = -0.1;

/// Bounded rational squashing function, `(1 + x / (1 + |x|)) / 2`.
///
/// Maps ℝ onto (0, 1) with `sigmoid(0) = 0.5`. This is not the logistic
/// function and must not be replaced by it.
pub fn sigmoid(x: f32) -> f32 {
    (1.0 + x / (1.0 + x.abs())) / 2.0
}

/// Hard clamp to `[0, 1]`; NaN maps to 0
pub fn clamp01(y: f32) -> f32 {
    if y.is_nan() || y <= 0.0 {
        0.0
    } else if y >= 1.0 {
        1.0
    } else {
        y
    }
}

/// Intensity as the filter accepts it: negative and non-finite values are 0
fn sanitize(x: f32) -> f32 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Scale `v` so its entries sum to 1, unless the total is near zero.
///
/// Negative, NaN and infinite entries count as 0, so the result is always
/// finite and within `[0, 1]`.
pub fn normalize(v: &IntensityVector) -> IntensityVector {
    let clean: IntensityVector = v.iter().map(|(k, x)| (k, sanitize(x))).collect();
    let total = clean.sum();
    if total <= NORMALIZE_EPSILON || !total.is_finite() {
        return clean;
    }
    clean.iter().map(|(k, x)| (k, x / total)).collect()
}

/// One smoothing cell step for a single category
fn step_one(x_new: f32, x_prev: f32, h_prev: f32) -> f32 {
    let u = sigmoid(UPDATE_BIAS + UPDATE_INPUT_WEIGHT * x_prev + UPDATE_STATE_WEIGHT * h_prev);
    let r = sigmoid(RESET_BIAS + RESET_INPUT_WEIGHT * x_prev + RESET_STATE_WEIGHT * h_prev);
    let candidate = clamp01(CANDIDATE_INPUT_WEIGHT * x_new + CANDIDATE_RESET_WEIGHT * r * h_prev);
    clamp01(u * h_prev + (1.0 - u) * candidate)
}

/// Smoothing state for one stream of intensity vectors.
///
/// Not synchronized: a filter belongs to exactly one mapper and is driven
/// by a single caller at a time.
#[derive(Clone, Debug, Default)]
pub struct RecurrentFilter {
    /// X(t-1): previous normalized input
    prev_input: IntensityVector,
    /// H(t-1): previous smoothed output
    prev_output: IntensityVector,
}

impl RecurrentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one input vector, returning the new smoothed vector.
    ///
    /// Categories remembered from earlier steps but missing from `input`
    /// are fed a zero so they fade out instead of vanishing.
    pub fn step(&mut self, input: &IntensityVector) -> &IntensityVector {
        let mut x = normalize(input);
        for key in self.prev_output.keys() {
            if !x.contains(key) {
                x.insert(key, 0.0);
            }
        }

        let h: IntensityVector = x
            .iter()
            .map(|(key, x_new)| {
                let x_prev = self.prev_input.get(key);
                let h_prev = self.prev_output.get(key);
                (key, step_one(x_new, x_prev, h_prev))
            })
            .collect();

        self.prev_input = x;
        self.prev_output = h;
        &self.prev_output
    }

    /// Last smoothed output (empty before the first step)
    pub fn state(&self) -> &IntensityVector {
        &self.prev_output
    }

    /// Last normalized input (empty before the first step)
    pub fn last_input(&self) -> &IntensityVector {
        &self.prev_input
    }

    pub fn reset(&mut self) {
        self.prev_input = IntensityVector::new();
        self.prev_output = IntensityVector::new();
    }
}

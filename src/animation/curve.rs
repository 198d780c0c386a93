//! Spatial curves controlling how depth effects strengthen away from the center image.
//!
//! A *decay* curve `g(value, angle)` starts at `1.0` for the center image (`angle == 0`) and
//! reaches `value` one slot away (`angle == 1`). It drives visual scale and alpha fade.
//!
//! An *increase* curve `h(value, angle)` starts at `0.0` and reaches `value` one slot away. It
//! drives blur radius growth.
//!
//! The variants differ only in how fast they approach (or overshoot past) those anchors for
//! angles beyond one slot.

use std::f64::consts::LN_2;

use crate::animation::ease::normalize_name;

/// Shape of a depth-effect curve.
///
/// Deserializes from a name; unknown names resolve to [`SideCurve::Exponential`]. Selections that
/// feed an increase curve use [`SideCurve::increase_from_name`] instead, which defaults to
/// [`SideCurve::Linear`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SideCurve {
    /// Constant rate.
    Linear,
    /// Geometric: each slot multiplies by `value`.
    #[default]
    Exponential,
    /// Fast near the center, flattening out further away.
    Logarithmic,
    /// Slow near the center, accelerating further away.
    Quadratic,
    /// Square-root rate; between linear and logarithmic.
    Sqrt,
}

const CURVE_NAMES: &[(&str, SideCurve)] = &[
    ("linear", SideCurve::Linear),
    ("exponential", SideCurve::Exponential),
    ("logarithmic", SideCurve::Logarithmic),
    ("quadratic", SideCurve::Quadratic),
    ("sqrt", SideCurve::Sqrt),
];

impl SideCurve {
    /// Every curve, in name-table order.
    pub const ALL: [SideCurve; 5] = [
        Self::Linear,
        Self::Exponential,
        Self::Logarithmic,
        Self::Quadratic,
        Self::Sqrt,
    ];

    fn lookup(name: &str) -> Option<Self> {
        let key = normalize_name(name);
        let key = match key.as_str() {
            "exp" => "exponential",
            "log" => "logarithmic",
            "quad" => "quadratic",
            "square_root" => "sqrt",
            other => other,
        };
        CURVE_NAMES
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, c)| *c)
    }

    /// Resolve a curve used for decay effects; unknown names give [`SideCurve::Exponential`].
    pub fn decay_from_name(name: &str) -> Self {
        Self::lookup(name).unwrap_or(Self::Exponential)
    }

    /// Resolve a curve used for increase effects; unknown names give [`SideCurve::Linear`].
    pub fn increase_from_name(name: &str) -> Self {
        Self::lookup(name).unwrap_or(Self::Linear)
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::Logarithmic => "logarithmic",
            Self::Quadratic => "quadratic",
            Self::Sqrt => "sqrt",
        }
    }

    /// Normalized progress `s(angle)` with `s(0) = 0` and `s(1) = 1`.
    fn progress(self, angle: f64) -> f64 {
        let a = angle.max(0.0);
        match self {
            Self::Linear => a,
            Self::Exponential => a.exp2() - 1.0,
            Self::Logarithmic => (1.0 + a).ln() / LN_2,
            Self::Quadratic => a * a,
            Self::Sqrt => a.sqrt(),
        }
    }

    /// Decay from `1.0` at `angle == 0` toward `value` at `angle == 1`.
    ///
    /// Clamped at `0.0`; callers treat a zero result as "nothing left to draw".
    pub fn decay(self, value: f64, angle: f64) -> f64 {
        let a = angle.max(0.0);
        let out = match self {
            Self::Exponential => {
                if a == 0.0 {
                    1.0
                } else {
                    value.max(0.0).powf(a)
                }
            }
            _ => 1.0 - (1.0 - value) * self.progress(a),
        };
        out.max(0.0)
    }

    /// Increase from `0.0` at `angle == 0` toward `value` at `angle == 1`.
    pub fn increase(self, value: f64, angle: f64) -> f64 {
        value * self.progress(angle)
    }
}

impl From<String> for SideCurve {
    fn from(name: String) -> Self {
        Self::decay_from_name(&name)
    }
}

impl From<SideCurve> for String {
    fn from(c: SideCurve) -> Self {
        c.name().to_owned()
    }
}

/// Pure exponential layout scale used for horizontal placement.
///
/// Independent of the configured visual-scale curve so that spacing between images stays uniform
/// whichever scale curve is selected.
pub fn position_scale(side_scale: f64, angle: f64) -> f64 {
    SideCurve::Exponential.decay(side_scale, angle.abs())
}

/// Angle at which an effect starting `start` slots from the center sees `angle`.
///
/// `start == 1` means the effect is active from the first neighbor onward.
pub fn effective_angle(angle: f64, start: u32) -> f64 {
    (angle.abs() - (f64::from(start.max(1)) - 1.0)).max(0.0)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/curve.rs"]
mod tests;

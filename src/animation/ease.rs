use std::f64::consts::PI;

/// Easing functions used to map normalized transition progress.
///
/// Deserializes from a name; unknown names fall back to [`Ease::InOutCubic`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Ease {
    /// Linear interpolation.
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in/out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in/out.
    #[default]
    InOutCubic,
    /// Sine ease-in.
    InSine,
    /// Sine ease-out.
    OutSine,
    /// Sine ease-in/out.
    InOutSine,
}

const EASE_NAMES: &[(&str, Ease)] = &[
    ("linear", Ease::Linear),
    ("ease_in_quad", Ease::InQuad),
    ("ease_out_quad", Ease::OutQuad),
    ("ease_in_out_quad", Ease::InOutQuad),
    ("ease_in_cubic", Ease::InCubic),
    ("ease_out_cubic", Ease::OutCubic),
    ("ease_in_out_cubic", Ease::InOutCubic),
    ("ease_in_sine", Ease::InSine),
    ("ease_out_sine", Ease::OutSine),
    ("ease_in_out_sine", Ease::InOutSine),
];

impl Ease {
    /// Every easing, in name-table order.
    pub const ALL: [Ease; 10] = [
        Self::Linear,
        Self::InQuad,
        Self::OutQuad,
        Self::InOutQuad,
        Self::InCubic,
        Self::OutCubic,
        Self::InOutCubic,
        Self::InSine,
        Self::OutSine,
        Self::InOutSine,
    ];

    /// Resolve an easing by name.
    ///
    /// Matching ignores case, `-`/space separators, CamelCase and an optional `ease_` prefix, so
    /// `ease_in_out_cubic`, `in-out-cubic` and `InOutCubic` are equivalent. Unknown names
    /// resolve to the default ([`Ease::InOutCubic`]).
    pub fn from_name(name: &str) -> Self {
        let key = normalize_name(name);
        let key = key.strip_prefix("ease_").unwrap_or(&key);
        EASE_NAMES
            .iter()
            .find(|(n, _)| n.strip_prefix("ease_").unwrap_or(n) == key)
            .map(|(_, e)| *e)
            .unwrap_or_default()
    }

    /// Canonical name of this easing.
    pub fn name(self) -> &'static str {
        EASE_NAMES
            .iter()
            .find(|(_, e)| *e == self)
            .map(|(n, _)| *n)
            .unwrap_or("ease_in_out_cubic")
    }

    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::InSine => 1.0 - (t * PI / 2.0).cos(),
            Self::OutSine => (t * PI / 2.0).sin(),
            Self::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
        }
    }
}

impl From<String> for Ease {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<Ease> for String {
    fn from(e: Ease) -> Self {
        e.name().to_owned()
    }
}

/// Lowercase, snake-case form of a user-supplied curve or easing name.
pub(crate) fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.trim().chars() {
        if ch == '-' || ch == ' ' || ch == '_' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;

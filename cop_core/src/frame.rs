//! Classification of raw device lines into frames.
//!
//! The firmware emits two record shapes:
//!
//! - `a,b,c,d`: four raw sensor weights, e.g. `1.25,0.98,-0.02,1.10`
//! - `(x, y)`: a center-of-pressure pair, e.g. `(0.125, -0.300)`
//!
//! Both patterns are anchored at the start of the line only. Trailing bytes
//! (stray carriage returns, partial echoes) do not prevent a match.
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // literal patterns
static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d+\.\d+),(-?\d+\.\d+),(-?\d+\.\d+),(-?\d+\.\d+)").expect("weight pattern")
});

#[allow(clippy::expect_used)] // literal patterns
static COP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((-?\d+\.\d+), (-?\d+\.\d+)\)").expect("cop pattern"));

/// Per-sensor weights in device units, already clamped at the noise floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightReading {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl WeightReading {
    pub fn as_array(&self) -> [f64; 4] {
        [self.a, self.b, self.c, self.d]
    }

    pub fn total(&self) -> f64 {
        self.a + self.b + self.c + self.d
    }

    /// Host-side CoP from the four corners (A front-left, B front-right,
    /// C back-right, D back-left). An unloaded plate maps to the origin.
    pub fn center_of_pressure(&self) -> (f64, f64) {
        let total = self.total();
        if total == 0.0 {
            return (0.0, 0.0);
        }
        let x = ((self.b + self.c) - (self.a + self.d)) / total;
        let y = ((self.c + self.d) - (self.a + self.b)) / total;
        (x, y)
    }
}

/// One classified line from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Weights(WeightReading),
    /// Firmware-computed CoP, nominally within `[-1, 1]` on both axes.
    Cop { x: f64, y: f64 },
    Unrecognized { raw: String },
}

/// Negative raw readings are sensor noise around an unloaded cell.
#[inline]
fn clamp_noise_floor(v: f64) -> f64 {
    if v.is_sign_negative() { 0.0 } else { v }
}

fn captures_f64<const N: usize>(caps: &regex::Captures<'_>) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let v: f64 = caps.get(i + 1)?.as_str().parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        *slot = v;
    }
    Some(out)
}

/// Classify one trimmed line. Never fails: anything that is not a well-formed
/// weight or CoP record comes back as [`Frame::Unrecognized`].
pub fn parse(line: &str) -> Frame {
    if let Some(caps) = WEIGHT_RE.captures(line) {
        if let Some([a, b, c, d]) = captures_f64::<4>(&caps) {
            return Frame::Weights(WeightReading {
                a: clamp_noise_floor(a),
                b: clamp_noise_floor(b),
                c: clamp_noise_floor(c),
                d: clamp_noise_floor(d),
            });
        }
    } else if let Some(caps) = COP_RE.captures(line)
        && let Some([x, y]) = captures_f64::<2>(&caps)
    {
        return Frame::Cop { x, y };
    }
    Frame::Unrecognized {
        raw: line.to_string(),
    }
}

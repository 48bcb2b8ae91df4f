//! # Scalers
//!
//! Interpolation algorithms a resize filter can hand to the host. The
//! optimizer only compares them; the host decides how each one is sampled.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    NearestNeighbour,
    Bilinear,
    /// Bicubic with adjustable sharpness (0.0 to 1.0)
    Bicubic { sharpness: f32 },
    /// Windowed sinc
    Lanczos { taps: u8, anti_ringing: bool },
    Spline { taps: u8, anti_ringing: bool },
    /// Radial (EWA) jinc
    Jinc { taps: u8, anti_ringing: bool },
}

impl Scaler {
    pub fn description(&self) -> String {
        let (name, taps, anti_ringing) = match self {
            Scaler::NearestNeighbour => return "Nearest neighbour".to_string(),
            Scaler::Bilinear => return "Bilinear".to_string(),
            Scaler::Bicubic { sharpness } => return format!("Bicubic ({sharpness:.2})"),
            Scaler::Lanczos { taps, anti_ringing } => ("Lanczos", taps, anti_ringing),
            Scaler::Spline { taps, anti_ringing } => ("Spline", taps, anti_ringing),
            Scaler::Jinc { taps, anti_ringing } => ("Jinc", taps, anti_ringing),
        };
        if *anti_ringing {
            format!("{name}{taps} AR")
        } else {
            format!("{name}{taps}")
        }
    }
}

impl fmt::Display for Scaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

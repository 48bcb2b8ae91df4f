//! YUV colorimetric standards used by the conversion filters.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum YuvColorimetric {
    Bt601,    // SD (NTSC/PAL)
    #[default]
    Bt709,    // HD
    Bt2020Nc, // UHD, non-constant luminance
    Bt2020C,  // UHD, constant luminance
}

impl YuvColorimetric {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bt601 => "BT.601",
            Self::Bt709 => "BT.709",
            Self::Bt2020Nc => "BT.2020 NCL",
            Self::Bt2020C => "BT.2020 CL",
        }
    }
}

impl fmt::Display for YuvColorimetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_hd_standard() {
        assert_eq!(YuvColorimetric::default(), YuvColorimetric::Bt709);
        assert_eq!(YuvColorimetric::default().to_string(), "BT.709");
    }

    #[test]
    fn serializes_by_variant_name() {
        let json = serde_json::to_string(&YuvColorimetric::Bt2020Nc).unwrap();
        assert_eq!(json, "\"Bt2020Nc\"");
    }
}

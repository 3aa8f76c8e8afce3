//! Image-derived colour naming.
//!
//! Two decision tables exist and disagree on the same input; neither is
//! authoritative. Shades with a catalog code should go through
//! [`crate::official`] instead.

use crate::category::ColorCategory;
use crate::color::{Rgb, to_hsv};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maps a dominant colour to a category. First matching rule wins.
pub trait ColorNamer {
    fn name(&self, rgb: Rgb) -> ColorCategory;

    /// Short label written into reports.
    fn algorithm(&self) -> &'static str;
}

/// Which decision table to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeuristicVersion {
    V1,
    #[default]
    V2,
}

impl HeuristicVersion {
    pub fn namer(self) -> Box<dyn ColorNamer> {
        match self {
            Self::V1 => Box::new(RgbHeuristic),
            Self::V2 => Box::new(HsvHeuristic),
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

impl FromStr for HeuristicVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" | "rgb" => Ok(Self::V1),
            "v2" | "2" | "hsv" => Ok(Self::V2),
            other => Err(crate::Error::Invalid(format!(
                "unknown heuristic '{other}', expected v1 or v2"
            ))),
        }
    }
}

/// Channel-dominance rules on raw RGB.
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbHeuristic;

impl ColorNamer for RgbHeuristic {
    fn name(&self, rgb: Rgb) -> ColorCategory {
        use ColorCategory::*;
        let [r, g, b] = rgb.map(i32::from);

        if r > 220 && g > 220 && b > 220 {
            return White;
        }
        if r < 50 && g < 50 && b < 50 {
            return Black;
        }
        if (r - g).abs() < 30 && (g - b).abs() < 30 && (r - b).abs() < 30 && (50..=180).contains(&r)
        {
            return Grey;
        }
        if r > 180 && g > 140 && b > 100 && r > b && (r - g).abs() < 50 {
            return Nude;
        }
        if r > g && g > b && r < 180 && g < 140 {
            return Brown;
        }

        let max = r.max(g).max(b);
        if r == max {
            if g > 150 && b < 100 {
                Gold
            } else if g > 100 && b > 100 {
                if r > 200 && g > 150 { Pink } else { Purple }
            } else if g < 100 && b < 100 {
                Red
            } else if b > g {
                Purple
            } else if g > 100 {
                Orange
            } else {
                Red
            }
        } else if g == max {
            if r > 150 {
                Gold
            } else if b > 100 {
                Blue
            } else {
                Green
            }
        } else if r > 150 && g > 150 {
            Blue
        } else if r > 100 {
            Purple
        } else {
            Blue
        }
    }

    fn algorithm(&self) -> &'static str {
        "RGB dominance"
    }
}

/// Hue bands with saturation/value refinements.
#[derive(Debug, Clone, Copy, Default)]
pub struct HsvHeuristic;

impl ColorNamer for HsvHeuristic {
    fn name(&self, rgb: Rgb) -> ColorCategory {
        use ColorCategory::*;
        let hsv = to_hsv(rgb);
        let hue = hsv.h;
        let sat = hsv.s * 100.0;
        let val = hsv.v * 100.0;

        // achromatic
        if sat < 15.0 {
            return if val > 85.0 {
                White
            } else if val < 20.0 {
                Black
            } else if val > 60.0 {
                Silver
            } else {
                Grey
            };
        }
        if sat < 25.0 {
            return if val > 70.0 {
                Nude
            } else if val < 30.0 {
                Black
            } else {
                Grey
            };
        }

        match hue {
            h if !(15.0..345.0).contains(&h) => {
                if sat < 40.0 && val > 60.0 {
                    Pink
                } else {
                    Red
                }
            }
            h if h < 25.0 => {
                if sat < 45.0 {
                    Pink
                } else {
                    Red
                }
            }
            h if h < 45.0 => {
                if val > 75.0 {
                    Orange
                } else if sat < 40.0 {
                    Nude
                } else {
                    Orange
                }
            }
            h if h < 60.0 => {
                if sat > 40.0 {
                    Gold
                } else {
                    Yellow
                }
            }
            h if h < 75.0 => Yellow,
            h if h < 90.0 => {
                if sat > 40.0 {
                    Green
                } else {
                    Yellow
                }
            }
            h if h < 150.0 => Green,
            h if h < 180.0 => {
                if sat > 40.0 {
                    Blue
                } else {
                    Green
                }
            }
            h if h < 250.0 => {
                if sat < 30.0 && val > 60.0 {
                    Silver
                } else {
                    Blue
                }
            }
            h if h < 290.0 => Purple,
            h if h < 320.0 => {
                if sat < 45.0 || val > 75.0 {
                    Pink
                } else {
                    Purple
                }
            }
            _ => {
                if sat > 50.0 && val < 60.0 {
                    Red
                } else {
                    Pink
                }
            }
        }
    }

    fn algorithm(&self) -> &'static str {
        "HSV + Center Crop + Saturation Filter"
    }
}

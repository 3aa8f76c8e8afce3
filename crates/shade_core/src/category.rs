use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Colour bucket assigned to a shade.
///
/// Variant order is the display order used when grouping reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColorCategory {
    White,
    Silver,
    Nude,
    Pink,
    Red,
    Orange,
    #[serde(alias = "Golden")]
    Gold,
    Yellow,
    Brown,
    Green,
    Blue,
    Purple,
    #[serde(alias = "Gray")]
    Grey,
    Black,
    Transparent,
    Other,
    /// Shade code absent from the official table.
    Special,
}

impl ColorCategory {
    pub const ALL: [ColorCategory; 17] = [
        Self::White,
        Self::Silver,
        Self::Nude,
        Self::Pink,
        Self::Red,
        Self::Orange,
        Self::Gold,
        Self::Yellow,
        Self::Brown,
        Self::Green,
        Self::Blue,
        Self::Purple,
        Self::Grey,
        Self::Black,
        Self::Transparent,
        Self::Other,
        Self::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Silver => "Silver",
            Self::Nude => "Nude",
            Self::Pink => "Pink",
            Self::Red => "Red",
            Self::Orange => "Orange",
            Self::Gold => "Gold",
            Self::Yellow => "Yellow",
            Self::Brown => "Brown",
            Self::Green => "Green",
            Self::Blue => "Blue",
            Self::Purple => "Purple",
            Self::Grey => "Grey",
            Self::Black => "Black",
            Self::Transparent => "Transparent",
            Self::Other => "Other",
            Self::Special => "Special",
        }
    }

    /// Lowercase form used in storefront collection URLs.
    pub fn url_slug(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for ColorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let canonical = match wanted.to_ascii_lowercase().as_str() {
            "golden" => "gold",
            "gray" => "grey",
            other => return lookup(other, s),
        };
        lookup(canonical, s)
    }
}

fn lookup(lower: &str, original: &str) -> Result<ColorCategory, crate::Error> {
    ColorCategory::ALL
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(lower))
        .ok_or_else(|| crate::Error::Invalid(format!("unknown colour category '{original}'")))
}

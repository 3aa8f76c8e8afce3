//! RGB/HSV primitives shared by the extractors and classifiers.

use crate::error::{Error, Result};

/// An 8-bit RGB triple.
pub type Rgb = [u8; 3];

/// Store background grey, `#f5f5f5`.
pub const STORE_GREY: Rgb = [245, 245, 245];

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    /// Integer display triple `[degrees, percent, percent]`, truncated.
    pub fn display_triple(&self) -> [u16; 3] {
        [
            self.h as u16,
            (self.s * 100.0) as u16,
            (self.v * 100.0) as u16,
        ]
    }
}

pub fn to_hsv(rgb: Rgb) -> Hsv {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if max == min {
        return Hsv { h: 0.0, s: 0.0, v };
    }
    let delta = max - min;
    let s = delta / max;
    let rc = (max - r) / delta;
    let gc = (max - g) / delta;
    let bc = (max - b) / delta;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    let h = (h / 6.0).rem_euclid(1.0) * 360.0;
    Hsv { h, s, v }
}

/// Saturation only, as `(max - min) / max`; zero for black.
pub fn saturation(rgb: Rgb) -> f32 {
    let max = rgb.iter().copied().max().unwrap_or(0);
    let min = rgb.iter().copied().min().unwrap_or(0);
    if max == 0 {
        0.0
    } else {
        (max - min) as f32 / max as f32
    }
}

/// Rec. 709 luma, truncated to an integer.
pub fn luma(rgb: Rgb) -> u8 {
    let [r, g, b] = rgb.map(|c| c as f32);
    (0.2126 * r + 0.7152 * g + 0.0722 * b) as u8
}

pub fn channel_sum(rgb: Rgb) -> u16 {
    rgb.iter().map(|&c| c as u16).sum()
}

pub fn to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Parses `"R,G,B"`.
pub fn parse_rgb(s: &str) -> Result<Rgb> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(Error::Invalid(format!(
            "colour must have exactly 3 components, got '{s}'"
        )));
    }
    let mut out = [0u8; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| Error::Invalid(format!("invalid colour component '{part}' in '{s}'")))?;
    }
    Ok(out)
}

pub fn all_at_least(rgb: Rgb, threshold: u8) -> bool {
    rgb.iter().all(|&c| c >= threshold)
}

pub fn within_tolerance(a: Rgb, b: Rgb, tolerance: u8) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(&x, &y)| x.abs_diff(y) <= tolerance)
}

/// Sum of absolute channel differences.
pub fn color_distance(a: Rgb, b: Rgb) -> u16 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| u16::from(x.abs_diff(y)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case([255, 0, 0], 0.0, 1.0, 1.0)]
    #[case([0, 255, 0], 120.0, 1.0, 1.0)]
    #[case([0, 0, 255], 240.0, 1.0, 1.0)]
    #[case([255, 0, 255], 300.0, 1.0, 1.0)]
    #[case([128, 128, 128], 0.0, 0.0, 128.0 / 255.0)]
    fn hsv_matches_reference_points(
        #[case] rgb: Rgb,
        #[case] h: f32,
        #[case] s: f32,
        #[case] v: f32,
    ) {
        let hsv = to_hsv(rgb);
        assert_relative_eq!(hsv.h, h, epsilon = 1e-3);
        assert_relative_eq!(hsv.s, s, epsilon = 1e-6);
        assert_relative_eq!(hsv.v, v, epsilon = 1e-6);
    }

    #[test]
    fn luma_is_truncated_rec709() {
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([100, 0, 0]), 21);
        assert_eq!(luma([0, 100, 0]), 71);
        assert_eq!(luma([0, 0, 255]), 18);
    }

    #[test]
    fn hex_and_parse() -> Result<()> {
        assert_eq!(to_hex(STORE_GREY), "#f5f5f5");
        assert_eq!(parse_rgb(" 1, 2 ,3")?, [1, 2, 3]);
        assert!(parse_rgb("1,2").is_err());
        assert!(parse_rgb("1,2,300").is_err());
        Ok(())
    }

    #[test]
    fn tolerance_is_per_channel() {
        assert!(within_tolerance([250, 250, 250], STORE_GREY, 6));
        assert!(!within_tolerance([252, 250, 250], STORE_GREY, 6));
    }

    #[test]
    fn distance_sums_channels() {
        assert_eq!(color_distance([255, 255, 255], [231, 231, 231]), 72);
        assert_eq!(color_distance([252, 252, 252], STORE_GREY), 21);
        assert_eq!(color_distance([0, 0, 0], [255, 255, 255]), 765);
    }
}

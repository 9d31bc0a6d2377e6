use std::f64::consts::PI;

use crate::error::{Result, VisualizeError};

const VIRIDIS: &[u32] = &[
    0x440154, 0x472d7b, 0x3b528b, 0x2c728e, 0x21918c, 0x28ae80, 0x5ec962, 0xaddc30, 0xfde725,
];
const PLASMA: &[u32] = &[
    0x0d0887, 0x46039f, 0x7201a8, 0x9c179e, 0xbd3786, 0xd8576b, 0xed7953, 0xfb9f3a, 0xfdca26,
    0xf0f921,
];
const INFERNO: &[u32] = &[
    0x000004, 0x1b0c41, 0x4a0c6b, 0x781c6d, 0xa52c60, 0xcf4446, 0xed6925, 0xfb9b06, 0xf7d13d,
    0xfcffa4,
];
const MAGMA: &[u32] = &[
    0x000004, 0x180f3d, 0x440f76, 0x721f81, 0x9e2f7f, 0xcd4071, 0xf1605d, 0xfd9668, 0xfeca8d,
    0xfcfdbf,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Palette {
    Rainbow,
    Jet,
    Hsv,
    Gray,
    Hot,
    Cool,
    Spring,
    Summer,
    Autumn,
    Winter,
    Viridis,
    Plasma,
    Inferno,
    Magma,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorMap {
    palette: Palette,
    reversed: bool,
}

impl ColorMap {
    /// Looks up a map by name. A `_r` suffix reverses it.
    pub fn from_name(name: &str) -> Result<Self> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };

        let palette = match base {
            "rainbow" => Palette::Rainbow,
            "jet" => Palette::Jet,
            "hsv" => Palette::Hsv,
            "gray" | "grey" => Palette::Gray,
            "hot" => Palette::Hot,
            "cool" => Palette::Cool,
            "spring" => Palette::Spring,
            "summer" => Palette::Summer,
            "autumn" => Palette::Autumn,
            "winter" => Palette::Winter,
            "viridis" => Palette::Viridis,
            "plasma" => Palette::Plasma,
            "inferno" => Palette::Inferno,
            "magma" => Palette::Magma,
            _ => return Err(VisualizeError::UnknownColorMap(name.to_string())),
        };

        Ok(Self { palette, reversed })
    }

    pub fn sample(self, t: f64) -> [u8; 3] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let t = if self.reversed { 1.0 - t } else { t };

        let [r, g, b] = match self.palette {
            Palette::Rainbow => [
                (2.0 * t - 0.5).abs(),
                (PI * t).sin(),
                (PI * t / 2.0).cos(),
            ],
            Palette::Jet => [
                piecewise(&[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)], t),
                piecewise(
                    &[(0.0, 0.0), (0.125, 0.0), (0.375, 1.0), (0.64, 1.0), (0.91, 0.0), (1.0, 0.0)],
                    t,
                ),
                piecewise(&[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)], t),
            ],
            Palette::Hsv => hue(t),
            Palette::Gray => [t, t, t],
            Palette::Hot => [
                piecewise(&[(0.0, 0.0416), (0.365, 1.0), (1.0, 1.0)], t),
                piecewise(&[(0.0, 0.0), (0.365, 0.0), (0.746, 1.0), (1.0, 1.0)], t),
                piecewise(&[(0.0, 0.0), (0.746, 0.0), (1.0, 1.0)], t),
            ],
            Palette::Cool => [t, 1.0 - t, 1.0],
            Palette::Spring => [1.0, t, 1.0 - t],
            Palette::Summer => [t, 0.5 + t / 2.0, 0.4],
            Palette::Autumn => [1.0, t, 0.0],
            Palette::Winter => [0.0, t, 1.0 - t / 2.0],
            Palette::Viridis => gradient(VIRIDIS, t),
            Palette::Plasma => gradient(PLASMA, t),
            Palette::Inferno => gradient(INFERNO, t),
            Palette::Magma => gradient(MAGMA, t),
        };

        [channel(r), channel(g), channel(b)]
    }
}

fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn piecewise(anchors: &[(f64, f64)], t: f64) -> f64 {
    let mut previous = anchors[0];
    for &anchor in anchors {
        if t <= anchor.0 {
            let span = anchor.0 - previous.0;
            if span <= 0.0 {
                return anchor.1;
            }
            return previous.1 + (anchor.1 - previous.1) * (t - previous.0) / span;
        }
        previous = anchor;
    }
    previous.1
}

fn gradient(stops: &[u32], t: f64) -> [f64; 3] {
    let scaled = t * (stops.len() - 1) as f64;
    let index = (scaled.floor() as usize).min(stops.len() - 2);
    let fraction = scaled - index as f64;

    let [r0, g0, b0] = unpack(stops[index]);
    let [r1, g1, b1] = unpack(stops[index + 1]);
    [
        r0 + (r1 - r0) * fraction,
        g0 + (g1 - g0) * fraction,
        b0 + (b1 - b0) * fraction,
    ]
}

fn unpack(rgb: u32) -> [f64; 3] {
    [
        ((rgb >> 16) & 0xff) as f64 / 255.0,
        ((rgb >> 8) & 0xff) as f64 / 255.0,
        (rgb & 0xff) as f64 / 255.0,
    ]
}

fn hue(t: f64) -> [f64; 3] {
    let h = (t * 6.0) % 6.0;
    let x = 1.0 - ((h % 2.0) - 1.0).abs();
    match h as u8 {
        0 => [1.0, x, 0.0],
        1 => [x, 1.0, 0.0],
        2 => [0.0, 1.0, x],
        3 => [0.0, x, 1.0],
        4 => [x, 0.0, 1.0],
        _ => [1.0, 0.0, x],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_rejected() {
        let err = ColorMap::from_name("sunset").unwrap_err();
        assert!(matches!(err, VisualizeError::UnknownColorMap(name) if name == "sunset"));
        assert!(ColorMap::from_name("rainbow_rr").is_err());
    }

    #[test]
    fn rainbow_runs_from_violet_to_red() {
        let map = ColorMap::from_name("rainbow").unwrap();
        assert_eq!(map.sample(0.0), [128, 0, 255]);
        assert_eq!(map.sample(1.0), [255, 0, 0]);
    }

    #[test]
    fn reversed_maps_mirror() {
        let forward = ColorMap::from_name("viridis").unwrap();
        let reversed = ColorMap::from_name("viridis_r").unwrap();
        assert_eq!(forward.sample(0.25), reversed.sample(0.75));
        assert_eq!(forward.sample(0.0), [0x44, 0x01, 0x54]);
        assert_eq!(forward.sample(1.0), [0xfd, 0xe7, 0x25]);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let gray = ColorMap::from_name("gray").unwrap();
        assert_eq!(gray.sample(-3.0), [0, 0, 0]);
        assert_eq!(gray.sample(7.0), [255, 255, 255]);
        assert_eq!(gray.sample(f64::NAN), [0, 0, 0]);
    }

    #[test]
    fn piecewise_interpolates_between_anchors() {
        let anchors = [(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)];
        assert_eq!(piecewise(&anchors, 0.25), 0.5);
        assert_eq!(piecewise(&anchors, 0.5), 1.0);
        assert_eq!(piecewise(&anchors, 1.0), 0.0);
    }

    #[test]
    fn every_named_map_resolves() {
        for name in [
            "rainbow", "jet", "hsv", "gray", "hot", "cool", "spring", "summer", "autumn", "winter",
            "viridis", "plasma", "inferno", "magma", "jet_r",
        ] {
            let map = ColorMap::from_name(name).unwrap();
            let _ = map.sample(0.5);
        }
    }
}

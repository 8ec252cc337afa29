//! Color scales for scalar fields
//!
//! RGB is interpolated piecewise-linearly between gradient stops. Alpha is a
//! step function of the normalized value so weak or empty signal stays faint
//! and does not compete with strong signal.

use crate::observation::Channel;

/// Color with straight (non-premultiplied) alpha in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn alpha_u8(&self) -> u8 {
        (self.a.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    #[inline]
    pub fn rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha_u8() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub value: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const fn stop(value: f32, r: u8, g: u8, b: u8) -> GradientStop {
    GradientStop { value, r, g, b }
}

/// Value -> alpha step function
#[derive(Debug, Clone, Copy)]
pub struct AlphaSteps {
    /// Values below this paint nothing
    pub transparent_below: Option<f32>,
    /// Band edges, ascending; a value equal to an edge falls in the upper band
    pub edges: &'static [f32],
    /// One alpha per band, `edges.len() + 1` entries
    pub alphas: &'static [f32],
}

impl AlphaSteps {
    pub fn alpha(&self, v: f32) -> f32 {
        if self.transparent_below.is_some_and(|floor| v < floor) {
            return 0.0;
        }
        let band = self.edges.iter().take_while(|&&e| v >= e).count();
        self.alphas[band.min(self.alphas.len() - 1)]
    }
}

pub struct ColorScale {
    pub name: &'static str,
    pub stops: &'static [GradientStop],
    pub alpha: AlphaSteps,
}

impl ColorScale {
    /// Map a normalized value to a color. Input is clamped to [0, 1].
    pub fn color_for(&self, v: f32) -> Rgba {
        let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let (r, g, b) = self.rgb_at(v);
        Rgba::new(r, g, b, self.alpha.alpha(v))
    }

    fn rgb_at(&self, v: f32) -> (u8, u8, u8) {
        let first = &self.stops[0];
        let bracket = self
            .stops
            .windows(2)
            .find(|pair| pair[0].value <= v && v <= pair[1].value);

        let Some(pair) = bracket else {
            let s = if v < first.value {
                first
            } else {
                &self.stops[self.stops.len() - 1]
            };
            return (s.r, s.g, s.b);
        };

        let (s0, s1) = (&pair[0], &pair[1]);
        let span = s1.value - s0.value;
        let t = if span.abs() <= f32::EPSILON {
            1.0
        } else {
            (v - s0.value) / span
        };
        (
            lerp_u8(s0.r, s1.r, t),
            lerp_u8(s0.g, s1.g, t),
            lerp_u8(s0.b, s1.b, t),
        )
    }

    /// Stops strictly increasing from 0 to 1 and one alpha per band
    pub fn is_well_formed(&self) -> bool {
        let Some(first) = self.stops.first() else {
            return false;
        };
        let last = &self.stops[self.stops.len() - 1];
        first.value == 0.0
            && last.value == 1.0
            && self.stops.windows(2).all(|p| p[0].value < p[1].value)
            && self.alpha.alphas.len() == self.alpha.edges.len() + 1
            && self.alpha.edges.windows(2).all(|e| e[0] < e[1])
    }

    pub fn for_channel(channel: Channel) -> &'static ColorScale {
        match channel {
            Channel::Temperature => &TEMPERATURE,
            Channel::Precipitation => &PRECIPITATION,
            Channel::WindSpeed => &WIND_SPEED,
        }
    }
}

#[inline]
fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}

/// Color of `channel`'s scale at normalized `v`
pub fn color_for(channel: Channel, v: f32) -> Rgba {
    ColorScale::for_channel(channel).color_for(v)
}

/// Lookup by scale name ("temp", "precip", "wind", ...)
pub fn color_for_name(name: &str, v: f32) -> Option<Rgba> {
    name.parse::<Channel>().ok().map(|c| color_for(c, v))
}

// Cold blues through pale yellow to deep red
pub static TEMPERATURE: ColorScale = ColorScale {
    name: "temperature",
    stops: &[
        stop(0.0, 49, 54, 149),
        stop(0.2, 69, 117, 180),
        stop(0.35, 116, 173, 209),
        stop(0.5, 254, 224, 144),
        stop(0.65, 253, 174, 97),
        stop(0.8, 244, 109, 67),
        stop(1.0, 165, 0, 38),
    ],
    alpha: AlphaSteps {
        transparent_below: None,
        edges: &[0.25, 0.5, 0.75],
        alphas: &[0.45, 0.65, 0.85, 0.95],
    },
};

// Light blue drizzle to violet downpour; "no rain" is invisible
pub static PRECIPITATION: ColorScale = ColorScale {
    name: "precipitation",
    stops: &[
        stop(0.0, 180, 220, 255),
        stop(0.02, 150, 205, 250),
        stop(0.1, 100, 175, 245),
        stop(0.3, 50, 130, 230),
        stop(0.6, 30, 60, 200),
        stop(1.0, 120, 30, 170),
    ],
    alpha: AlphaSteps {
        transparent_below: Some(0.02),
        edges: &[0.15, 0.4, 0.7],
        alphas: &[0.35, 0.55, 0.75, 0.9],
    },
};

pub static WIND_SPEED: ColorScale = ColorScale {
    name: "wind",
    stops: &[
        stop(0.0, 40, 70, 120),
        stop(0.25, 40, 150, 170),
        stop(0.5, 110, 200, 110),
        stop(0.75, 240, 200, 60),
        stop(1.0, 220, 60, 50),
    ],
    alpha: AlphaSteps {
        transparent_below: None,
        edges: &[0.2, 0.45, 0.7],
        alphas: &[0.35, 0.5, 0.65, 0.8],
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_are_well_formed() {
        for c in Channel::ALL {
            assert!(ColorScale::for_channel(c).is_well_formed(), "{} scale", c);
        }
    }

    #[test]
    fn test_endpoints_match_stops() {
        for c in Channel::ALL {
            let scale = ColorScale::for_channel(c);
            let first = scale.stops[0];
            let last = scale.stops[scale.stops.len() - 1];
            assert_eq!(scale.color_for(0.0).rgb(), (first.r, first.g, first.b));
            assert_eq!(scale.color_for(1.0).rgb(), (last.r, last.g, last.b));
        }
    }

    #[test]
    fn test_input_is_clamped() {
        assert_eq!(TEMPERATURE.color_for(-3.0), TEMPERATURE.color_for(0.0));
        assert_eq!(TEMPERATURE.color_for(7.0), TEMPERATURE.color_for(1.0));
        assert_eq!(TEMPERATURE.color_for(f32::NAN), TEMPERATURE.color_for(0.0));
    }

    #[test]
    fn test_midway_between_stops() {
        // Halfway between 0.2 (69,117,180) and 0.35 (116,173,209)
        let c = TEMPERATURE.color_for(0.275);
        assert!((c.r as i32 - 93).abs() <= 1);
        assert!((c.g as i32 - 145).abs() <= 1);
        assert!((c.b as i32 - 195).abs() <= 1);
    }

    #[test]
    fn test_temperature_alpha_bands() {
        assert_eq!(TEMPERATURE.color_for(0.1).a, 0.45);
        assert_eq!(TEMPERATURE.color_for(0.3).a, 0.65);
        assert_eq!(TEMPERATURE.color_for(0.6).a, 0.85);
        assert_eq!(TEMPERATURE.color_for(0.9).a, 0.95);
    }

    #[test]
    fn test_precipitation_zero_is_transparent() {
        let dry = color_for_name("precip", 0.0).unwrap();
        assert_eq!(dry.a, 0.0);
        assert!(dry.is_transparent());
        let heavy = color_for_name("precip", 0.95).unwrap();
        assert_eq!(heavy.a, 0.9);
    }

    #[test]
    fn test_rgb_continuous() {
        // Small input steps give small RGB steps; only alpha jumps at band edges
        for c in Channel::ALL {
            let scale = ColorScale::for_channel(c);
            for i in 0..1000 {
                let a = scale.color_for(i as f32 / 1000.0);
                let b = scale.color_for((i + 1) as f32 / 1000.0);
                let dr = (a.r as i32 - b.r as i32).abs();
                let dg = (a.g as i32 - b.g as i32).abs();
                let db = (a.b as i32 - b.b as i32).abs();
                assert!(dr <= 4 && dg <= 4 && db <= 4, "{} jump at {}", c, i);
            }
        }
    }

    #[test]
    fn test_shared_stop_value_uses_upper() {
        static HARD_EDGE: ColorScale = ColorScale {
            name: "edge",
            stops: &[stop(0.0, 0, 0, 0), stop(0.0, 255, 255, 255), stop(1.0, 255, 255, 255)],
            alpha: AlphaSteps {
                transparent_below: None,
                edges: &[],
                alphas: &[1.0],
            },
        };
        assert!(!HARD_EDGE.is_well_formed());
        // Zero-width pair takes its upper stop instead of dividing by zero
        assert_eq!(HARD_EDGE.color_for(0.0).rgb(), (255, 255, 255));
        assert_eq!(HARD_EDGE.color_for(0.5).rgb(), (255, 255, 255));
    }

    #[test]
    fn test_unknown_scale_name() {
        assert!(color_for_name("humidity", 0.5).is_none());
    }
}

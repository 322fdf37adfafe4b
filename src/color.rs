//! Deterministic tile colors.
//!
//! Clips that form a numbered family ("Intro 1", "Intro 2", ...) get related colors: the
//! family leader (number 1) seeds the hue and lightness, followers shift the hue by 6° per
//! step and nudge the lightness. Without a leader the seed comes from a hash of the base name.

use crate::clip::{Clip, ClipId};

/// Saturation used for hash-seeded colors, in percent.
pub const BASE_SATURATION: f64 = 65.0;

/// Lightness used for hash-seeded colors, in percent.
pub const BASE_LIGHTNESS: f64 = 50.0;

/// YIQ brightness at or above which a color counts as light.
pub const LIGHT_YIQ_THRESHOLD: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// A clip name split into its family base and number.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    pub base_name: String,
    pub number: f64,
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parses `#rgb` or `#rrggbb`.
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#')?;
    if !digits.is_ascii() {
        return None;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        3 => {
            let expand = |i: usize| channel(&digits[i..=i].repeat(2));
            Some(Rgb {
                r: expand(0)?,
                g: expand(1)?,
                b: expand(2)?,
            })
        }
        6 => Some(Rgb {
            r: channel(&digits[0..2])?,
            g: channel(&digits[2..4])?,
            b: channel(&digits[4..6])?,
        }),
        _ => None,
    }
}

pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

/// Converts a hex color to HSL, hue rounded to whole degrees and saturation/lightness to one
/// decimal.
pub fn hex_to_hsl(hex: &str) -> Option<Hsl> {
    let Rgb { r, g, b } = hex_to_rgb(hex)?;
    let (r, g, b) = (
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
    );

    let cmin = r.min(g).min(b);
    let cmax = r.max(g).max(b);
    let delta = cmax - cmin;

    let mut h = if delta == 0.0 {
        0.0
    } else if cmax == r {
        ((g - b) / delta) % 6.0
    } else if cmax == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    h = round_half_up(h * 60.0);
    if h < 0.0 {
        h += 360.0;
    }

    let l = (cmax + cmin) / 2.0;
    let s = if delta == 0.0 {
        0.0
    } else {
        delta / (1.0 - (2.0 * l - 1.0).abs())
    };

    Some(Hsl {
        h,
        s: round_one_decimal(s * 100.0),
        l: round_one_decimal(l * 100.0),
    })
}

pub fn hsl_to_hex(hsl: Hsl) -> String {
    let l = hsl.l / 100.0;
    let a = hsl.s * l.min(1.0 - l) / 100.0;
    let channel = |n: f64| {
        let k = (n + hsl.h / 30.0) % 12.0;
        let color = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        round_half_up(255.0 * color).clamp(0.0, 255.0) as u8
    };

    rgb_to_hex(Rgb {
        r: channel(0.0),
        g: channel(8.0),
        b: channel(4.0),
    })
}

/// True when dark text reads better than white on this background.
pub fn is_light_color(hex: &str) -> bool {
    let Some(Rgb { r, g, b }) = hex_to_rgb(hex) else {
        return false;
    };
    let yiq = (f64::from(r) * 299.0 + f64::from(g) * 587.0 + f64::from(b) * 114.0) / 1000.0;
    yiq >= LIGHT_YIQ_THRESHOLD
}

/// Hue in `0..360` from a 31-multiplier rolling hash over UTF-16 code units.
pub fn string_to_hue(value: &str) -> f64 {
    let mut hash: i64 = 0;
    for unit in value.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5);
        hash = i64::from(unit) + (i64::from(shifted) - hash);
    }
    (hash % 360).abs() as f64
}

/// Splits "Name 12", "Name #12" or "Name 12 suffix" into base name and number.
///
/// The number is the first run of ASCII digits. The base is the text before it (ignoring
/// spaces and `#` right in front of the digits), or the text after it when nothing precedes.
/// Names without digits are their own base with number 1.
pub fn parse_name(name: &str) -> ParsedName {
    let chars: Vec<char> = name.chars().collect();
    let Some(digit_start) = chars.iter().position(|c| c.is_ascii_digit()) else {
        return ParsedName {
            base_name: name.to_string(),
            number: 1.0,
        };
    };

    let mut prefix_end = digit_start;
    while prefix_end > 0 && matches!(chars[prefix_end - 1], ' ' | '#') {
        prefix_end -= 1;
    }
    let digit_end = chars[digit_start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(chars.len(), |offset| digit_start + offset);

    let prefix: String = chars[..prefix_end].iter().collect();
    let digits: String = chars[digit_start..digit_end].iter().collect();
    let suffix: String = chars[digit_end..].iter().collect();

    let base_name = if !prefix.trim().is_empty() {
        prefix.trim().to_string()
    } else if !suffix.trim().is_empty() {
        suffix.trim().to_string()
    } else {
        name.to_string()
    };

    ParsedName {
        base_name,
        number: digits.parse().unwrap_or(1.0),
    }
}

fn shift_for_number(seed: Hsl, number: f64) -> String {
    let hue_shift = (number - 1.0) * 6.0;
    let lightness_shift = ((number - 1.0) * 3.0) % 15.0;
    let nudge = if number % 2.0 == 0.0 { 3.0 } else { -3.0 };

    hsl_to_hex(Hsl {
        h: (seed.h + hue_shift) % 360.0,
        s: seed.s,
        l: (seed.l + nudge - lightness_shift / 2.0).clamp(20.0, 80.0),
    })
}

fn same_family(a: &ParsedName, b: &ParsedName) -> bool {
    a.base_name.to_lowercase() == b.base_name.to_lowercase()
}

/// Color of family member `number` given the leader's color. `None` if `leader_hex` is not a
/// valid hex color.
pub fn derive_color_from_leader(leader_hex: &str, number: f64) -> Option<String> {
    hex_to_hsl(leader_hex).map(|seed| shift_for_number(seed, number))
}

/// Picks a color for a clip called `name` among `existing` clips.
///
/// A sibling with the same base name (case-insensitive) and number 1 is the family leader and
/// seeds the color; leaders with an unparsable color are ignored.
pub fn generate_smart_color(name: &str, existing: &[Clip]) -> String {
    let parsed = parse_name(name);

    let leader_seed = existing
        .iter()
        .filter(|clip| {
            let sibling = parse_name(&clip.name);
            sibling.number == 1.0 && same_family(&sibling, &parsed)
        })
        .find_map(|leader| hex_to_hsl(&leader.color));

    let seed = leader_seed.unwrap_or_else(|| Hsl {
        h: string_to_hue(&parsed.base_name),
        s: BASE_SATURATION,
        l: BASE_LIGHTNESS,
    });

    shift_for_number(seed, parsed.number)
}

/// New colors for the followers of a leader that was just saved as `leader_name` with
/// `leader_color`. Returns nothing when `leader_name` is not a leader (number 1).
pub fn recolor_followers(
    leader_id: Option<&ClipId>,
    leader_name: &str,
    leader_color: &str,
    clips: &[Clip],
) -> Vec<(ClipId, String)> {
    let leader = parse_name(leader_name);
    if leader.number != 1.0 {
        return Vec::new();
    }

    clips
        .iter()
        .filter(|clip| Some(&clip.id) != leader_id)
        .filter_map(|clip| {
            let follower = parse_name(&clip.name);
            if follower.number <= 1.0 || !same_family(&follower, &leader) {
                return None;
            }
            derive_color_from_leader(leader_color, follower.number)
                .map(|color| (clip.id.clone(), color))
        })
        .collect()
}

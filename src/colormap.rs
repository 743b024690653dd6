use std::collections::HashMap;

/// A linear-segmented colormap built from evenly spaced color stops.
#[derive(Clone, Debug, PartialEq)]
pub struct Colormap {
    stops: Vec<[u8; 3]>,
}

fn parse_hex(hex: &str) -> [u8; 3] {
    let hex = hex.trim_start_matches('#');
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    [channel(0), channel(2), channel(4)]
}

lazy_static! {
    static ref COLORMAPS: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert(
            "viridis",
            vec!["#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58", "#b5de2b", "#fde725"],
        );
        m.insert(
            "plasma",
            vec!["#0d0887", "#41049d", "#6a00a8", "#8f0da4", "#b12a90", "#cc4778", "#e16462", "#f2844b", "#fca636", "#f0f921"],
        );
        m.insert(
            "inferno",
            vec!["#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925", "#fb9b06", "#f7d13d", "#fcffa4"],
        );
        m.insert(
            "magma",
            vec!["#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d", "#fd9668", "#feca8d", "#fcfdbf"],
        );
        m.insert(
            "cividis",
            vec!["#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8779", "#a69d75", "#c4b56c", "#e4cf5b", "#fee838"],
        );
        m.insert(
            "rocket",
            vec!["#03051a", "#2b1b3f", "#561e59", "#841e5a", "#b31b4c", "#dd2c45", "#f06043", "#f6926e", "#f8be9f", "#faebdd"],
        );
        m.insert(
            "mako",
            vec!["#0b0405", "#2b1c35", "#3e356b", "#3b5698", "#3479a1", "#359ca8", "#48c0aa", "#8bdab2", "#c6ebd1", "#def5e5"],
        );
        m.insert(
            "Reds",
            vec!["#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15", "#67000d"],
        );
        m.insert(
            "Blues",
            vec!["#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c", "#08306b"],
        );
        m.insert(
            "Greens",
            vec!["#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c", "#00441b"],
        );
        m.insert(
            "Oranges",
            vec!["#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c", "#f16913", "#d94801", "#a63603", "#7f2704"],
        );
        m.insert(
            "YlOrRd",
            vec!["#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c", "#bd0026", "#800026"],
        );
        m.insert("hot", vec!["#0b0000", "#ff0000", "#ffff00", "#ffffff"]);
        m.insert("coolwarm", vec!["#3b4cc0", "#8db0fe", "#dddddd", "#f49a7b", "#b40426"]);
        m
    };
}

impl Colormap {
    /// Looks a colormap up by its matplotlib name. A `_r` suffix reverses it.
    pub fn by_name(name: &str) -> Option<Self> {
        let (base, reversed) = match name.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let mut stops: Vec<[u8; 3]> = COLORMAPS.get(base)?.iter().map(|h| parse_hex(h)).collect();
        if reversed {
            stops.reverse();
        }
        Some(Colormap { stops })
    }

    pub fn names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = COLORMAPS.keys().copied().collect();
        names.sort();
        names
    }

    /// Color at `t` in `[0, 1]`; values outside are clamped.
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = (self.stops.len() - 1) as f64;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(self.stops.len() - 2);
        let frac = pos - i as f64;
        let (a, b) = (self.stops[i], self.stops[i + 1]);
        let mix = |c: usize| (a[c] as f64 + (b[c] as f64 - a[c] as f64) * frac).round() as u8;
        [mix(0), mix(1), mix(2)]
    }
}

use crate::movements::{compute_movements, Movement};
use crate::track::Track;
use anyhow::Result;
use serde_json::{json, Value};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v4.17.0.json";
const SELECTION: &str = "selector";
const LOESS_BANDWIDTH: f64 = 0.02;

const PACE_TEXT: &str = "format(floor(datum.pace), 'd') + ':' + \
    format(floor((datum.pace - floor(datum.pace)) * 60), '02d')";
const SELECTION_TEXT: &str = "'Distance (m): ' + format(floor(datum.delta_d * 1000), 'd') + \
    ' / Pace (min/km): ' + format(floor(datum.pace), 'd') + ':' + \
    format(floor((datum.pace - floor(datum.pace)) * 60), '02d')";

/// Formats a pace in minutes per kilometre as `m:ss`.
pub fn format_pace(minutes: f64) -> String {
    if !minutes.is_finite() || minutes < 0.0 {
        return "-:--".to_string();
    }
    let whole = minutes.floor();
    let seconds = ((minutes - whole) * 60.0).floor() as u32;
    format!("{}:{:02}", whole as u64, seconds)
}

/// Average pace over the whole run, in minutes per kilometre.
pub fn average_pace(movements: &[Movement]) -> Option<f64> {
    let last = movements.last()?;
    let first = movements.first()?;
    let distance_km = last.run_distance_km - first.run_distance_km;
    let minutes = last.elapsed_minutes - first.elapsed_minutes;
    (distance_km > 0.0).then(|| minutes / distance_km)
}

fn number(value: Option<f64>) -> Value {
    value
        .filter(|v| v.is_finite())
        .map_or(Value::Null, Value::from)
}

fn selection_aggregate() -> Value {
    json!({
        "aggregate": [
            {"op": "max", "field": "run_distance_km", "as": "maxd"},
            {"op": "min", "field": "run_distance_km", "as": "mind"},
            {"op": "max", "field": "elapsed_minutes", "as": "maxt"},
            {"op": "min", "field": "elapsed_minutes", "as": "mint"}
        ],
        "groupby": []
    })
}

fn pace_layer() -> Value {
    json!({
        "mark": {
            "type": "area",
            "line": {"color": "darkgreen"},
            "color": {
                "gradient": "linear",
                "stops": [
                    {"color": "white", "offset": 0},
                    {"color": "darkgreen", "offset": 1}
                ],
                "x1": 1, "x2": 1, "y1": 1, "y2": 0
            }
        },
        "encoding": {
            "x": {"field": "run_distance_km", "type": "quantitative", "title": "Distance (km)"},
            "y": {"field": "speed_minpkm", "type": "quantitative", "title": "Pace (min/km)"},
            "tooltip": [
                {"field": "run_distance_km", "format": ".1f", "title": "Distance (km)", "type": "quantitative"},
                {"field": "pace_txt", "title": "Pace (min/km)", "type": "nominal"}
            ]
        },
        "selection": {SELECTION: {"type": "interval", "encodings": ["x"]}},
        "transform": [
            {"loess": "speed_minpkm", "on": "run_distance_km", "bandwidth": LOESS_BANDWIDTH},
            {"calculate": "datum.speed_minpkm", "as": "pace"},
            {"calculate": PACE_TEXT, "as": "pace_txt"}
        ]
    })
}

fn average_pace_layer() -> Value {
    json!({
        "mark": {"type": "rule", "color": "#636363", "strokeDash": [10, 10]},
        "encoding": {
            "y": {"field": "pace", "type": "quantitative"},
            "size": {"value": 3},
            "tooltip": [
                {"field": "pace_txt", "title": "Average Pace in Selection (min/km)", "type": "nominal"}
            ]
        },
        "transform": [
            {"filter": {"selection": SELECTION}},
            selection_aggregate(),
            {"calculate": "((datum.maxt - datum.mint) / (datum.maxd - datum.mind))", "as": "pace"},
            {"calculate": PACE_TEXT, "as": "pace_txt"}
        ]
    })
}

fn average_pace_text_layer() -> Value {
    json!({
        "mark": {
            "type": "text",
            "align": "center",
            "baseline": "bottom",
            "color": "darkgreen",
            "dx": 5,
            "dy": -5,
            "fontSize": 12,
            "fontWeight": "bold"
        },
        "encoding": {
            "opacity": {"condition": {"selection": SELECTION, "value": 0}, "value": 1},
            "text": {"field": "pace_txt", "type": "nominal"},
            "x": {"field": "midx", "type": "quantitative"},
            "y": {"value": 5}
        },
        "transform": [
            {"filter": {"selection": SELECTION}},
            selection_aggregate(),
            {"calculate": "((datum.maxt - datum.mint) / (datum.maxd - datum.mind))", "as": "pace"},
            {"calculate": "(datum.maxd - datum.mind)", "as": "delta_d"},
            {"calculate": "((datum.maxd + datum.mind) / 2)", "as": "midx"},
            {"calculate": SELECTION_TEXT, "as": "pace_txt"}
        ]
    })
}

fn elevation_layer(movements: &[Movement]) -> Value {
    let mut y = json!({"field": "alt", "type": "quantitative"});
    let altitudes = movements.iter().filter_map(|m| m.alt).filter(|a| a.is_finite());
    let range = altitudes.fold(None, |range: Option<(f64, f64)>, a| match range {
        None => Some((a, a)),
        Some((lo, hi)) => Some((lo.min(a), hi.max(a))),
    });
    if let Some((lo, hi)) = range {
        y["scale"] = json!({"domain": [lo, hi + 2.0 * (hi - lo)]});
    }
    json!({
        "mark": {"type": "area", "color": "#d8b5a5", "line": {"color": "brown"}},
        "encoding": {
            "x": {"field": "run_distance_km", "type": "quantitative"},
            "y": y
        },
        "transform": [
            {"loess": "alt", "on": "run_distance_km", "bandwidth": LOESS_BANDWIDTH}
        ]
    })
}

/// Vega-Lite chart of the pace along the run, with the elevation profile
/// on an independent axis. An interval selection on the distance shows the
/// average pace over the selected stretch.
pub fn pace_chart(movements: &[Movement]) -> Value {
    let values: Vec<Value> = movements
        .iter()
        .map(|m| {
            json!({
                "run_distance_km": number(Some(m.run_distance_km)),
                "speed_minpkm": number(Some(m.speed_minpkm)),
                "alt": number(m.alt),
                "elapsed_minutes": number(Some(m.elapsed_minutes)),
            })
        })
        .collect();

    json!({
        "$schema": VEGA_LITE_SCHEMA,
        "config": {
            "view": {"continuousWidth": 400, "continuousHeight": 300},
            "axisLeft": {"labelColor": "darkgreen", "titleColor": "darkgreen"},
            "axisRight": {"labelColor": "brown", "titleColor": "brown"}
        },
        "data": {"values": values},
        "layer": [
            {"layer": [pace_layer(), average_pace_layer(), average_pace_text_layer()]},
            elevation_layer(movements)
        ],
        "resolve": {"scale": {"y": "independent"}},
        "width": "container",
        "height": "container"
    })
}

/// JSON Vega-Lite spec of the interactive pace chart for `track`.
pub fn altair_plot_pace(track: &Track) -> Result<String> {
    let movements = compute_movements(&track.points);
    if movements.is_empty() {
        bail!("not enough tracking points to compute movements");
    }
    Ok(serde_json::to_string_pretty(&pace_chart(&movements))?)
}

#[cfg(test)]
mod tests {
    use super::{format_pace, number};
    use serde_json::Value;

    #[test]
    fn pace_text() {
        assert_eq!(format_pace(5.5), "5:30");
        assert_eq!(format_pace(4.0), "4:00");
        assert_eq!(format_pace(12.999), "12:59");
        assert_eq!(format_pace(f64::INFINITY), "-:--");
    }

    #[test]
    fn non_finite_numbers_are_null() {
        assert_eq!(number(Some(f64::NAN)), Value::Null);
        assert_eq!(number(None), Value::Null);
        assert_eq!(number(Some(1.5)), Value::from(1.5));
    }
}

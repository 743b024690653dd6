pub mod test_utils;
use crate::test_utils::{hilly_track, synthetic_track};
use assert_float_eq::*;
use serde_json::Value;
use track_viz::movements::compute_movements;
use track_viz::pace;

#[test]
fn vega_lite_spec() {
    let track = hilly_track(30);
    let spec: Value = serde_json::from_str(&pace::altair_plot_pace(&track).unwrap()).unwrap();

    assert!(spec["$schema"].as_str().unwrap().contains("vega-lite/v4"));
    assert_eq!(spec["resolve"]["scale"]["y"], "independent");
    assert_eq!(spec["width"], "container");

    let values = spec["data"]["values"].as_array().unwrap();
    assert_eq!(values.len(), 28);
    for key in ["run_distance_km", "speed_minpkm", "alt", "elapsed_minutes"] {
        assert!(values[0][key].is_number(), "{key}");
    }

    let layers = spec["layer"].as_array().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0]["layer"].as_array().unwrap().len(), 3);
    assert_eq!(layers[0]["layer"][0]["selection"]["selector"]["type"], "interval");

    // elevation stays in the bottom third
    let domain = layers[1]["encoding"]["y"]["scale"]["domain"].as_array().unwrap();
    let (lo, hi) = (domain[0].as_f64().unwrap(), domain[1].as_f64().unwrap());
    assert_float_absolute_eq!(lo, 100.0);
    assert_float_absolute_eq!(hi, 105.0 + 2.0 * 5.0);
}

#[test]
fn masked_altitude_is_null() {
    let track = synthetic_track(20, Some((10, 10)));
    let spec: Value = serde_json::from_str(&pace::altair_plot_pace(&track).unwrap()).unwrap();
    let values = spec["data"]["values"].as_array().unwrap();
    assert!(values[8]["alt"].is_null());
    assert!(values[9]["alt"].is_number());
}

#[test]
fn average_pace() {
    let movements = compute_movements(&synthetic_track(60, None).points);
    let average = pace::average_pace(&movements).unwrap();
    // 3.34 m/s is just under 5 minutes per kilometre
    assert!(average > 4.9 && average < 5.1, "{average}");
    assert_eq!(pace::format_pace(average).len(), 4);
}

#[test]
fn not_enough_points() {
    assert!(pace::altair_plot_pace(&synthetic_track(2, None)).is_err());
}

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use track_viz::track::{Track, TrackPoint};

pub const SAMPLE_GPX: &str = "./tests/data/sample_gpx.gpx";
pub const SAMPLE_TCX: &str = "./tests/data/sample_tcx.tcx";

pub const START_LAT: f64 = 48.2;
pub const START_LON: f64 = 16.37;
/// Roughly 3.34 m northwards.
pub const LAT_STEP: f64 = 0.00003;

pub const MIN_LAT: f64 = 48.19;
pub const MAX_LAT: f64 = 48.21;
pub const MIN_LON: f64 = 16.36;
pub const MAX_LON: f64 = 16.38;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 12, 10, 0, 0).unwrap()
}

/// A flat run heading north at constant speed, one point per second. With
/// `gap`, the recording pauses for `gap.1` seconds before point `gap.0`
/// (the position keeps the same pace).
pub fn synthetic_track(points: usize, gap: Option<(usize, i64)>) -> Track {
    let mut time = start_time();
    let mut lat = START_LAT;
    let mut track_points = Vec::with_capacity(points);
    for i in 0..points {
        if i > 0 {
            let seconds = match gap {
                Some((at, seconds)) if at == i => seconds,
                _ => 1,
            };
            time += TimeDelta::seconds(seconds);
            lat += LAT_STEP * seconds as f64;
        }
        track_points.push(TrackPoint::new(time, lat, START_LON, Some(100.0)));
    }
    Track::new(track_points)
}

/// Like `synthetic_track`, with the altitude going up and down by one metre
/// every few points and a pace that varies from step to step.
pub fn hilly_track(points: usize) -> Track {
    let mut track = synthetic_track(points, None);
    let mut lat = START_LAT;
    for (i, point) in track.points.iter_mut().enumerate() {
        lat += LAT_STEP * (i % 3) as f64 * 0.5;
        point.lat = Some(lat);
        let phase = (i / 5) % 2;
        point.alt = Some(if phase == 0 {
            100.0 + (i % 5) as f64
        } else {
            105.0 - (i % 5) as f64
        });
    }
    track
}

pub fn write_background(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("background.png");
    RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

/// Writes a heatmap config next to a white `width`x`height` background.
pub fn write_heatmap_config(dir: &Path, width: u32, height: u32, extra_plot: &str) -> PathBuf {
    write_background(dir, width, height);
    let path = dir.join("heatmap.yml");
    let yaml = format!(
        "heatmap:
  background:
    image: background.png
    min_lon: {MIN_LON}
    max_lon: {MAX_LON}
    min_lat: {MIN_LAT}
    max_lat: {MAX_LAT}
  plot:
    levels: 5
    colormap: Reds
{extra_plot}"
    );
    fs::write(&path, yaml).unwrap();
    path
}

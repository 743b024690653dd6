use crate::track::TrackPoint;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use geo::GeodesicDistance;
use geo_types::Point;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;

/// Width of the window used for `speed_moving_avg_1min`.
pub const MOVING_AVERAGE_WINDOW_SEC: i64 = 60;

lazy_static! {
    /// Elapsed time is reported as if every run started on Jan 1 2021 at 00:00.
    pub static ref ELAPSED_ORIGIN: NaiveDateTime = NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
}

/// One row of the speed time series derived from a track.
///
/// * `delta_time_s`: time since the previous sample
/// * `prev_lon`, `prev_lat`: coordinates of the previous sample
/// * `delta_alt_m`: altitude change since the previous sample
/// * `elapsed_time`: sample time relative to [`ELAPSED_ORIGIN`]
/// * `ground_distance_m`: geodesic distance from the previous sample
/// * `distance_m`: distance from the previous sample including the climb
/// * `speed_moving_avg_1min`: mean `speed_kmh` over the last minute
/// * `use_point`: false for the first sample after a gap in the recording
///
/// `alt` and `speed_moving_avg_1min` are blanked on samples that are not used.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movement {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub alt: Option<f64>,
    pub bpm: Option<u32>,
    pub delta_time_s: f64,
    pub prev_lon: f64,
    pub prev_lat: f64,
    pub delta_alt_m: f64,
    pub elapsed_time: NaiveDateTime,
    pub ground_distance_m: f64,
    pub distance_m: f64,
    pub speed_ms: f64,
    pub speed_kmh: f64,
    pub speed_moving_avg_1min: Option<f64>,
    pub delta_speed_ms: f64,
    pub delta_moving_avg_1min: f64,
    pub acceleration_ms2: f64,
    pub use_point: bool,
    pub run_distance_km: f64,
    pub speed_minpkm: f64,
    pub elapsed_minutes: f64,
}

impl Movement {
    pub fn elapsed_seconds(&self) -> f64 {
        (self.elapsed_time - *ELAPSED_ORIGIN).num_milliseconds() as f64 / 1000.0
    }
}

struct Step<'a> {
    point: &'a TrackPoint,
    lat: f64,
    lon: f64,
    alt: f64,
    prev_lat: f64,
    prev_lon: f64,
    delta_time: TimeDelta,
    delta_alt_m: f64,
}

struct Sample<'a> {
    step: Step<'a>,
    elapsed_time: NaiveDateTime,
    ground_distance_m: f64,
    distance_m: f64,
    speed_ms: f64,
    speed_kmh: f64,
    speed_moving_avg_1min: f64,
}

fn seconds(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

pub fn ground_distance_m(lat: f64, lon: f64, prev_lat: f64, prev_lon: f64) -> f64 {
    Point::new(lon, lat).geodesic_distance(&Point::new(prev_lon, prev_lat))
}

// Pairs every point with its predecessor; a pair is dropped when either side
// lacks a coordinate or an altitude.
fn steps(points: &[TrackPoint]) -> Vec<Step<'_>> {
    points
        .iter()
        .tuple_windows()
        .filter_map(|(prev, point)| {
            let (lat, lon, alt) = (point.lat()?, point.lon()?, point.alt()?);
            let (prev_lat, prev_lon, prev_alt) = (prev.lat()?, prev.lon()?, prev.alt()?);
            Some(Step {
                point,
                lat,
                lon,
                alt,
                prev_lat,
                prev_lon,
                delta_time: point.time - prev.time,
                delta_alt_m: alt - prev_alt,
            })
        })
        .collect()
}

fn samples(steps: Vec<Step<'_>>) -> Vec<Sample<'_>> {
    let mut elapsed_time = *ELAPSED_ORIGIN;
    let mut samples: Vec<Sample> = Vec::with_capacity(steps.len());
    for step in steps {
        elapsed_time += step.delta_time;
        let ground_distance_m =
            ground_distance_m(step.lat, step.lon, step.prev_lat, step.prev_lon);
        let distance_m = (ground_distance_m.powi(2) + step.delta_alt_m.powi(2)).sqrt();
        let speed_ms = distance_m / seconds(step.delta_time);
        let speed_kmh = speed_ms * 3.6;

        let window_start = elapsed_time - TimeDelta::seconds(MOVING_AVERAGE_WINDOW_SEC);
        let (sum, count) = samples
            .iter()
            .rev()
            .take_while(|s| s.elapsed_time > window_start)
            .map(|s| s.speed_kmh)
            .chain(std::iter::once(speed_kmh))
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        let speed_moving_avg_1min = if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        };

        samples.push(Sample {
            step,
            elapsed_time,
            ground_distance_m,
            distance_m,
            speed_ms,
            speed_kmh,
            speed_moving_avg_1min,
        });
    }
    samples
}

/// Most frequent whole-second sampling interval; ties go to the first seen.
pub fn sampling_period_s(deltas: impl Iterator<Item = i64>) -> Option<i64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut order = Vec::new();
    for delta in deltas {
        let count = counts.entry(delta).or_insert(0);
        if *count == 0 {
            order.push(delta);
        }
        *count += 1;
    }
    let mut best: Option<(i64, usize)> = None;
    for delta in order {
        let count = counts[&delta];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((delta, count));
        }
    }
    best.map(|(delta, _)| delta)
}

/// Transform tracking information into a time series of speed and other
/// metrics. See [`Movement`] for the fields.
///
/// The sampling period is the most frequent time difference between two
/// samples. Whenever a time difference is more than twice that period, the
/// first sample after the gap gets `use_point == false`.
pub fn compute_movements(points: &[TrackPoint]) -> Vec<Movement> {
    let samples = samples(steps(points));

    let mut rows: Vec<(Sample, f64, f64)> = Vec::with_capacity(samples.len());
    let mut previous: Option<(f64, f64)> = None;
    for sample in samples {
        let deltas = previous.map(|(speed_ms, moving_avg)| {
            (
                sample.speed_ms - speed_ms,
                sample.speed_moving_avg_1min - moving_avg,
            )
        });
        previous = Some((sample.speed_ms, sample.speed_moving_avg_1min));
        let Some((delta_speed_ms, delta_moving_avg_1min)) = deltas else {
            continue;
        };
        let values = [
            sample.ground_distance_m,
            sample.distance_m,
            sample.speed_ms,
            sample.speed_kmh,
            sample.speed_moving_avg_1min,
            delta_speed_ms,
            delta_moving_avg_1min,
        ];
        if values.iter().any(|v| v.is_nan()) {
            continue;
        }
        rows.push((sample, delta_speed_ms, delta_moving_avg_1min));
    }

    let deltas = rows.iter().map(|(s, _, _)| s.step.delta_time.num_seconds());
    let Some(freq_s) = sampling_period_s(deltas) else {
        return Vec::new();
    };
    let Some(start) = rows.iter().map(|(s, _, _)| s.step.point.time).min() else {
        return Vec::new();
    };

    let mut run_distance_m = 0.0;
    rows.into_iter()
        .map(|(sample, delta_speed_ms, delta_moving_avg_1min)| {
            let delta_time_s = seconds(sample.step.delta_time);
            let use_point = sample.step.delta_time.num_seconds() <= 2 * freq_s;
            run_distance_m += sample.distance_m;
            Movement {
                time: sample.step.point.time,
                lat: sample.step.lat,
                lon: sample.step.lon,
                alt: use_point.then_some(sample.step.alt),
                bpm: sample.step.point.bpm,
                delta_time_s,
                prev_lon: sample.step.prev_lon,
                prev_lat: sample.step.prev_lat,
                delta_alt_m: sample.step.delta_alt_m,
                elapsed_time: sample.elapsed_time,
                ground_distance_m: sample.ground_distance_m,
                distance_m: sample.distance_m,
                speed_ms: sample.speed_ms,
                speed_kmh: sample.speed_kmh,
                speed_moving_avg_1min: use_point.then_some(sample.speed_moving_avg_1min),
                delta_speed_ms,
                delta_moving_avg_1min,
                acceleration_ms2: delta_speed_ms / delta_time_s,
                use_point,
                run_distance_km: run_distance_m / 1000.0,
                speed_minpkm: 60.0 / sample.speed_kmh,
                elapsed_minutes: seconds(sample.step.point.time - start) / 60.0,
            }
        })
        .collect()
}

/// Elapsed-time intervals (in seconds since [`ELAPSED_ORIGIN`]) around every
/// unused sample, from the sample before it to the sample after it.
pub fn unused_intervals(movements: &[Movement]) -> Vec<(f64, f64)> {
    let last = movements.len().saturating_sub(1);
    movements
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.use_point)
        .map(|(loc, _)| {
            (
                movements[loc.saturating_sub(1)].elapsed_seconds(),
                movements[(loc + 1).min(last)].elapsed_seconds(),
            )
        })
        .collect()
}

/// Uphill/downhill classification used by the speed KDE chart. A flat step
/// counts as uphill.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Climb {
    Uphill,
    Downhill,
}

impl Climb {
    pub fn of(movement: &Movement) -> Self {
        if movement.delta_alt_m < 0.0 {
            Climb::Downhill
        } else {
            Climb::Uphill
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Climb::Uphill => "Uphill",
            Climb::Downhill => "Downhill",
        }
    }
}

/// Rows usable for distribution plots: used samples whose values are all finite.
pub fn finite_movements(movements: &[Movement]) -> impl Iterator<Item = &Movement> {
    movements.iter().filter(|m| {
        let optional = [m.alt, m.speed_moving_avg_1min];
        let values = [
            m.delta_time_s,
            m.delta_alt_m,
            m.ground_distance_m,
            m.distance_m,
            m.speed_ms,
            m.speed_kmh,
            m.delta_speed_ms,
            m.delta_moving_avg_1min,
            m.acceleration_ms2,
            m.run_distance_km,
            m.speed_minpkm,
            m.elapsed_minutes,
        ];
        optional.iter().all(|v| v.is_some_and(f64::is_finite))
            && values.iter().all(|v| v.is_finite())
    })
}

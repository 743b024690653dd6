use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::utils;

/// Names of columns in a tracking table.
pub struct TrackingColumn;

impl TrackingColumn {
    pub const TIME: &'static str = "time";
    pub const LATITUDE: &'static str = "lat";
    pub const LONGITUDE: &'static str = "lon";
    pub const ALTITUDE: &'static str = "alt";
    pub const HEARTBEAT: &'static str = "bpm";
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TrackPoint {
    #[serde(deserialize_with = "utils::deserialize_time")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default, deserialize_with = "utils::deserialize_bpm")]
    pub bpm: Option<u32>,
}

impl TrackPoint {
    pub fn new(time: DateTime<Utc>, lat: f64, lon: f64, alt: Option<f64>) -> Self {
        TrackPoint {
            time,
            lat: Some(lat),
            lon: Some(lon),
            alt,
            bpm: None,
        }
    }

    // NaN can sneak in from CSV input, treat it as missing.
    pub fn lat(&self) -> Option<f64> {
        utils::present(self.lat)
    }

    pub fn lon(&self) -> Option<f64> {
        utils::present(self.lon)
    }

    pub fn alt(&self) -> Option<f64> {
        utils::present(self.alt)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    pub points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(points: Vec<TrackPoint>) -> Self {
        Track { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_heart_rate(&self) -> bool {
        self.points.iter().any(|p| p.bpm.is_some())
    }

    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![
            TrackingColumn::TIME,
            TrackingColumn::LATITUDE,
            TrackingColumn::LONGITUDE,
            TrackingColumn::ALTITUDE,
        ];
        if self.has_heart_rate() {
            columns.push(TrackingColumn::HEARTBEAT);
        }
        columns
    }
}

use crate::movements::Movement;
use crate::track::{Track, TrackPoint};
use crate::utils;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

fn format_value<T: std::fmt::Debug>(value: Option<T>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

pub fn write_track_csv<W: Write>(track: &Track, writer: W) -> Result<()> {
    let with_heart_rate = track.has_heart_rate();
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(track.columns())?;
    for point in &track.points {
        let mut record = vec![
            utils::format_csv_time(&point.time),
            format_value(point.lat),
            format_value(point.lon),
            format_value(point.alt),
        ];
        if with_heart_rate {
            record.push(format_value(point.bpm));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_track_csv(track: &Track, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_track_csv(track, file)
}

pub fn read_track_csv<R: Read>(reader: R) -> Result<Track> {
    let mut reader = csv::Reader::from_reader(reader);
    let points = reader
        .deserialize::<TrackPoint>()
        .collect::<Result<Vec<_>, _>>()?;
    debug!("read {} points from csv", points.len());
    Ok(Track::new(points))
}

pub fn load_track_csv(path: &Path) -> Result<Track> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_track_csv(file)
}

pub fn write_movements_csv<W: Write>(movements: &[Movement], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for movement in movements {
        writer.serialize(movement)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_movements_csv(movements: &[Movement], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_movements_csv(movements, file)
}

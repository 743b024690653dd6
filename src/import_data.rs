use crate::track::{Track, TrackPoint};
use crate::utils;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::{fs::File, io::BufRead, io::BufReader, path::Path};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrackFormat {
    Gpx,
    Tcx,
}

impl TrackFormat {
    pub const ALLOWED_EXTENSIONS: [&'static str; 2] = ["gpx", "tcx"];

    // Matching is case sensitive: `run.GPX` is rejected.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|x| x.to_str()) {
            Some("gpx") => Some(TrackFormat::Gpx),
            Some("tcx") => Some(TrackFormat::Tcx),
            _ => None,
        }
    }
}

pub fn load_track(path: &Path) -> Result<Track> {
    match TrackFormat::from_path(path) {
        Some(TrackFormat::Gpx) => load_gpx(path),
        Some(TrackFormat::Tcx) => load_tcx(path),
        None => bail!(
            "Wrong suffix for {}, expected one of {:?}",
            path.display(),
            TrackFormat::ALLOWED_EXTENSIONS
        ),
    }
}

pub fn load_gpx(path: &Path) -> Result<Track> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_gpx(BufReader::new(file))
}

pub fn read_gpx(reader: impl std::io::Read) -> Result<Track> {
    let gpx_data = gpx::read(reader)?;
    let points = gpx_data
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .enumerate()
        .map(|(idx, point)| {
            let time = match &point.time {
                Some(time) => DateTime::<Utc>::from(DateTime::parse_from_rfc3339(&time.format()?)?),
                None => bail!("trackpoint #{idx} has no time"),
            };
            Ok(TrackPoint {
                time,
                lat: Some(point.point().y()),
                lon: Some(point.point().x()),
                alt: point.elevation,
                bpm: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    info!("Tracking {} trackpoints", points.len());
    Ok(Track::new(points))
}

pub fn load_tcx(path: &Path) -> Result<Track> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_tcx(BufReader::new(file))
}

#[derive(Default)]
struct PendingTrackpoint {
    time: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    bpm: Option<u32>,
}

impl PendingTrackpoint {
    fn finish(self, idx: usize) -> Result<TrackPoint> {
        let time = self
            .time
            .ok_or_else(|| anyhow!("trackpoint #{idx} has no time"))?;
        Ok(TrackPoint {
            time: utils::parse_time(&time)?,
            lat: self.lat,
            lon: self.lon,
            alt: self.alt,
            bpm: self.bpm,
        })
    }
}

/* TCX is only ever read for the handful of fields below, so rather than
   modelling the whole TrainingCenterDatabase schema we stream the document
   and keep a stack of local element names (namespace prefixes stripped).
*/
pub fn read_tcx(reader: impl BufRead) -> Result<Track> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<PendingTrackpoint> = None;
    let mut points = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "Trackpoint" {
                    current = Some(PendingTrackpoint::default());
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Trackpoint" {
                    points.push(PendingTrackpoint::default().finish(points.len())?);
                }
            }
            Ok(Event::End(_)) => {
                if stack.pop().as_deref() == Some("Trackpoint") {
                    if let Some(pending) = current.take() {
                        points.push(pending.finish(points.len())?);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(pending) = current.as_mut() {
                    let text = e.unescape()?;
                    let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());
                    match (parent, stack.last().map(String::as_str)) {
                        (Some("Trackpoint"), Some("Time")) => pending.time = Some(text.into_owned()),
                        (_, Some("LatitudeDegrees")) => pending.lat = Some(text.parse()?),
                        (_, Some("LongitudeDegrees")) => pending.lon = Some(text.parse()?),
                        (Some("Trackpoint"), Some("AltitudeMeters")) => {
                            pending.alt = Some(text.parse()?)
                        }
                        (Some("HeartRateBpm"), Some("Value")) => pending.bpm = Some(text.parse()?),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => bail!(
                "XML parse error at position {}: {e:?}",
                reader.buffer_position()
            ),
        }
        buf.clear();
    }

    info!("Tracking {} trackpoints", points.len());
    Ok(Track::new(points))
}

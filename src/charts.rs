use crate::export_data;
use crate::kde::GaussianKde;
use crate::movements::{self, compute_movements, Climb, Movement};
use crate::track::Track;
use crate::utils;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::path::Path;

pub const CHART_SIZE: (u32, u32) = (1600, 800);

const BACKGROUND: RGBColor = RGBColor(0xF5, 0xFF, 0xFA);
const PALETTE: [RGBColor; 3] = [
    RGBColor(0x01, 0x73, 0xB2),
    RGBColor(0xDE, 0x8F, 0x05),
    RGBColor(0x02, 0x9E, 0x73),
];
const LIGHT_GREY: RGBColor = RGBColor(211, 211, 211);
const HATCH_GREY: RGBColor = RGBColor(150, 150, 150);
const HATCH_LINES: usize = 8;

const CHART_FONT: &[u8] = include_bytes!("../static/fonts/DejaVuSans.ttf");

lazy_static! {
    static ref CHART_FONT_LOADED: std::result::Result<(), String> =
        register_font("sans-serif", FontStyle::Normal, CHART_FONT)
            .map_err(|_| "invalid font data".to_string());
}

/// Registers the bundled font as plotters' `sans-serif` family. Every chart
/// lays out and draws its text with it.
pub fn load_chart_font() -> Result<()> {
    CHART_FONT_LOADED
        .clone()
        .map_err(|e| anyhow!("cannot load chart font: {e}"))
}

/// Column of the movements time series to plot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MovementField {
    SpeedKmh,
    SpeedMovingAvg1Min,
    AccelerationMs2,
    Alt,
    SpeedMinPerKm,
}

impl MovementField {
    pub fn name(&self) -> &'static str {
        match self {
            MovementField::SpeedKmh => "speed_kmh",
            MovementField::SpeedMovingAvg1Min => "speed_moving_avg_1min",
            MovementField::AccelerationMs2 => "acceleration_ms2",
            MovementField::Alt => "alt",
            MovementField::SpeedMinPerKm => "speed_minpkm",
        }
    }

    pub fn value(&self, movement: &Movement) -> Option<f64> {
        let value = match self {
            MovementField::SpeedKmh => Some(movement.speed_kmh),
            MovementField::SpeedMovingAvg1Min => movement.speed_moving_avg_1min,
            MovementField::AccelerationMs2 => Some(movement.acceleration_ms2),
            MovementField::Alt => movement.alt,
            MovementField::SpeedMinPerKm => Some(movement.speed_minpkm),
        };
        value.filter(|v| v.is_finite())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Bitmap,
    Svg,
}

impl ChartKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png" | "jpg" | "jpeg" | "bmp") => Ok(ChartKind::Bitmap),
            Some("svg") => Ok(ChartKind::Svg),
            _ => bail!("unsupported chart format: {}", path.display()),
        }
    }
}

fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |range, v| match range {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    })
}

fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

fn elapsed_range(movements: &[Movement]) -> Result<(f64, f64)> {
    let (lo, hi) = value_range(movements.iter().map(Movement::elapsed_seconds))
        .ok_or_else(|| anyhow!("no movement to plot"))?;
    Ok(widen(lo, hi))
}

fn draw_movement_field<DB>(
    root: DrawingArea<DB, Shift>,
    movements: &[Movement],
    field: MovementField,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    load_chart_font()?;
    let series: Vec<(f64, f64)> = movements
        .iter()
        .filter_map(|m| Some((m.elapsed_seconds(), field.value(m)?)))
        .collect();
    let (x_min, x_max) = elapsed_range(movements)?;
    let (y_min, y_max) = value_range(series.iter().map(|p| p.1))
        .map(|(lo, hi)| widen(lo.min(0.0), hi.max(0.0)))
        .ok_or_else(|| anyhow!("no value of {} to plot", field.name()))?;

    root.fill(&BACKGROUND)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|v| utils::format_mm_ss(*v))
        .x_desc("elapsed_time")
        .draw()?;

    let color = PALETTE[0];
    chart
        .draw_series(
            AreaSeries::new(series.iter().copied(), 0.0, color.mix(0.5)).border_style(color),
        )?
        .label(field.name())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Area chart of one movements column against elapsed time. The image
/// format follows the file extension.
pub fn plot_movement_field(movements: &[Movement], field: MovementField, img: &Path) -> Result<()> {
    if movements.is_empty() {
        bail!("not enough tracking points to compute movements");
    }
    match ChartKind::from_path(img)? {
        ChartKind::Bitmap => {
            let root = BitMapBackend::new(img, CHART_SIZE).into_drawing_area();
            draw_movement_field(root, movements, field)?;
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(img, CHART_SIZE).into_drawing_area();
            draw_movement_field(root, movements, field)?;
        }
    }
    info!("{} chart saved to {}", field.name(), img.display());
    Ok(())
}

fn plot_track_field(track: &Path, field: MovementField, img: &Path) -> Result<()> {
    let track = export_data::load_track_csv(track)?;
    let movements = compute_movements(&track.points);
    plot_movement_field(&movements, field, img)
}

pub fn plot_speed(track: &Path, img: &Path) -> Result<()> {
    plot_track_field(track, MovementField::SpeedKmh, img)
}

pub fn plot_speed_moving_avg(track: &Path, img: &Path) -> Result<()> {
    plot_track_field(track, MovementField::SpeedMovingAvg1Min, img)
}

pub fn plot_acceleration(track: &Path, img: &Path) -> Result<()> {
    plot_track_field(track, MovementField::AccelerationMs2, img)
}

fn hatch(from: f64, to: f64, y_lo: f64, y_hi: f64) -> impl Iterator<Item = Vec<(f64, f64)>> {
    let step = (to - from) / HATCH_LINES as f64;
    (0..HATCH_LINES).map(move |i| {
        let x = from + step * i as f64;
        vec![(x, y_lo), (x + step, y_hi)]
    })
}

fn draw_speed_elevation<DB>(root: DrawingArea<DB, Shift>, movements: &[Movement]) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    load_chart_font()?;
    let speed: Vec<(f64, f64)> = movements
        .iter()
        .filter_map(|m| {
            Some((
                m.elapsed_seconds(),
                MovementField::SpeedMovingAvg1Min.value(m)?,
            ))
        })
        .collect();
    let elevation: Vec<(f64, f64)> = movements
        .iter()
        .filter_map(|m| Some((m.elapsed_seconds(), MovementField::Alt.value(m)?)))
        .collect();

    let (x_min, x_max) = elapsed_range(movements)?;
    let (_, speed_max) = value_range(speed.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = widen(0.0, speed_max * 1.05);
    // elevation stays within the bottom third of the chart
    let (alt_min, alt_max) = value_range(elevation.iter().map(|p| p.1))
        .map(|(lo, hi)| widen(lo - 0.5, hi + 2.0 * (hi - lo)))
        .unwrap_or((0.0, 1.0));

    root.fill(&BACKGROUND)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Right, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?
        .set_secondary_coord(x_min..x_max, alt_min..alt_max);

    chart
        .configure_mesh()
        .disable_mesh()
        .x_label_formatter(&|v| utils::format_mm_ss(*v))
        .x_desc("elapsed_time")
        .y_desc("speed_moving_avg_1min")
        .draw()?;
    chart.configure_secondary_axes().y_desc("alt").draw()?;

    let (speed_color, alt_color) = (PALETTE[0], PALETTE[1]);
    chart
        .draw_series(LineSeries::new(
            speed.iter().copied(),
            speed_color.stroke_width(2),
        ))?
        .label("speed_moving_avg_1min")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], speed_color));
    chart
        .draw_secondary_series(LineSeries::new(
            elevation.iter().copied(),
            alt_color.stroke_width(2),
        ))?
        .label("alt (right)")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], alt_color));
    chart.draw_series(AreaSeries::new(
        speed.iter().copied(),
        y_min,
        speed_color.mix(0.2),
    ))?;
    chart.draw_secondary_series(AreaSeries::new(
        elevation.iter().copied(),
        alt_min,
        alt_color.mix(0.2),
    ))?;

    let gaps = movements::unused_intervals(movements);
    chart.draw_series(
        gaps.iter()
            .map(|(from, to)| Rectangle::new([(*from, y_min), (*to, y_max)], LIGHT_GREY.filled())),
    )?;
    chart.draw_series(
        gaps.iter()
            .flat_map(|(from, to)| hatch(*from, *to, y_min, y_max))
            .map(|line| PathElement::new(line, HATCH_GREY)),
    )?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Speed (moving average) and elevation over time, with sampling gaps
/// greyed out. Returns an SVG document.
pub fn web_plot_speed_elevation(track: &Track) -> Result<String> {
    let movements = compute_movements(&track.points);
    if movements.is_empty() {
        bail!("not enough tracking points to compute movements");
    }
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw_speed_elevation(root, &movements)?;
    }
    Ok(svg)
}

fn draw_speed_climb_kde<DB>(
    root: DrawingArea<DB, Shift>,
    curves: &[(Climb, Vec<(f64, f64)>)],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    load_chart_font()?;
    let (x_min, x_max) = value_range(curves.iter().flat_map(|(_, c)| c.iter().map(|p| p.0)))
        .map(|(lo, hi)| widen(lo, hi))
        .ok_or_else(|| anyhow!("no speed distribution to plot"))?;
    let (_, y_max) =
        value_range(curves.iter().flat_map(|(_, c)| c.iter().map(|p| p.1))).unwrap_or((0.0, 1.0));

    root.fill(&BACKGROUND)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("TERRAIN", ("sans-serif", 24))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_min..x_max, 0.0..(y_max * 1.05).max(f64::MIN_POSITIVE))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_desc("speed_kmh")
        .draw()?;

    for (i, (climb, curve)) in curves.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        chart
            .draw_series(
                AreaSeries::new(curve.iter().copied(), 0.0, color.mix(0.25)).border_style(color),
            )?
            .label(climb.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Density curves of `speed_kmh`, per climb category, with a common
/// normalization across categories.
pub fn speed_climb_densities(movements: &[Movement]) -> Vec<(Climb, Vec<(f64, f64)>)> {
    let usable: Vec<&Movement> = movements::finite_movements(movements).collect();
    let total = usable.len() as f64;
    [Climb::Downhill, Climb::Uphill]
        .into_iter()
        .filter_map(|climb| {
            let speeds: Vec<f64> = usable
                .iter()
                .filter(|m| Climb::of(m) == climb)
                .map(|m| m.speed_kmh)
                .collect();
            let kde = GaussianKde::new(&speeds)?;
            Some((climb, kde.curve(kde.len() as f64 / total)))
        })
        .collect()
}

/// Speed distributions uphill and downhill. Returns an SVG document.
pub fn web_plot_speed_climb_kde(track: &Track) -> Result<String> {
    let movements = compute_movements(&track.points);
    if movements.is_empty() {
        bail!("not enough tracking points to compute movements");
    }
    let curves = speed_climb_densities(&movements);
    if curves.is_empty() {
        bail!("not enough distinct speeds to estimate a distribution");
    }
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw_speed_climb_kde(root, &curves)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::{hatch, load_chart_font, ChartKind};
    use plotters::style::{FontDesc, FontFamily, FontStyle};
    use std::path::Path;

    #[test]
    fn chart_kind_from_extension() {
        assert_eq!(
            ChartKind::from_path(Path::new("a/speed.PNG")).unwrap(),
            ChartKind::Bitmap
        );
        assert_eq!(
            ChartKind::from_path(Path::new("speed.svg")).unwrap(),
            ChartKind::Svg
        );
        assert!(ChartKind::from_path(Path::new("speed.pdf")).is_err());
        assert!(ChartKind::from_path(Path::new("speed")).is_err());
    }

    #[test]
    fn chart_font_measures_text() {
        load_chart_font().unwrap();
        let font = FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal);
        let (w, h) = font.box_size("05:30").unwrap();
        assert!(w > 0 && h > 0);
    }

    #[test]
    fn hatch_covers_interval() {
        let lines: Vec<_> = hatch(10.0, 18.0, 0.0, 1.0).collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], vec![(10.0, 0.0), (11.0, 1.0)]);
        assert_eq!(lines[7][1], (18.0, 1.0));
    }
}

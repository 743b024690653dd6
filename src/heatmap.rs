use crate::colormap::Colormap;
use crate::export_data;
use crate::kde::{iso_proportion_levels, DensityGrid};
use crate::track::Track;
use anyhow::{Context, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::Deserialize;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Density cells per image side for the longer side.
const DENSITY_RESOLUTION: f64 = 256.0;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Background {
    pub image: PathBuf,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

fn default_alpha() -> f64 {
    1.0
}

fn default_thresh() -> f64 {
    0.05
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PlotStyle {
    pub levels: usize,
    pub colormap: String,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_thresh")]
    pub thresh: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HeatmapSection {
    pub background: Background,
    pub plot: PlotStyle,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HeatmapConfig {
    pub heatmap: HeatmapSection,
}

impl HeatmapConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open heatmap config {}", path.display()))?;
        let mut config: HeatmapConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("invalid heatmap config {}", path.display()))?;
        let background = &mut config.heatmap.background;
        if background.image.is_relative() {
            if let Some(dir) = path.parent() {
                background.image = dir.join(&background.image);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let HeatmapSection { background, plot } = &self.heatmap;
        if !(background.max_lon > background.min_lon) {
            bail!("max_lon must be greater than min_lon");
        }
        if !(background.max_lat > background.min_lat) {
            bail!("max_lat must be greater than min_lat");
        }
        if plot.levels < 2 {
            bail!("heatmap needs at least 2 levels, got {}", plot.levels);
        }
        if !(0.0..=1.0).contains(&plot.alpha) {
            bail!("alpha must be within [0, 1], got {}", plot.alpha);
        }
        if !(0.0..1.0).contains(&plot.thresh) {
            bail!("thresh must be within [0, 1), got {}", plot.thresh);
        }
        if Colormap::by_name(&plot.colormap).is_none() {
            bail!(
                "unknown colormap {}, expected one of {}",
                plot.colormap,
                Colormap::names().join(", ")
            );
        }
        Ok(())
    }
}

/// Projects a coordinate onto a `width`x`height` image covering the
/// background bounds; the image's top row is `max_lat`.
pub fn project(background: &Background, lat: f64, lon: f64, width: u32, height: u32) -> (f64, f64) {
    let fx = (lon - background.min_lon) / (background.max_lon - background.min_lon);
    let fy = (lat - background.min_lat) / (background.max_lat - background.min_lat);
    (width as f64 * fx, height as f64 * (1.0 - fy))
}

/// Paints the density of the track's positions over a copy of `background`.
pub fn draw_heatmap(track: &Track, config: &HeatmapConfig, background: &RgbaImage) -> Result<RgbaImage> {
    let HeatmapSection {
        background: bounds,
        plot,
    } = &config.heatmap;
    let colormap = Colormap::by_name(&plot.colormap)
        .ok_or_else(|| anyhow!("unknown colormap {}", plot.colormap))?;
    let (width, height) = background.dimensions();

    let points: Vec<(f64, f64)> = track
        .points
        .iter()
        .filter_map(|p| Some(project(bounds, p.lat()?, p.lon()?, width, height)))
        .collect();
    if points.is_empty() {
        bail!("track has no position to draw");
    }
    debug!("heatmap over {} positions", points.len());

    let cell_size = (width.max(height) as f64 / DENSITY_RESOLUTION).max(1.0);
    let grid = DensityGrid::from_points(&points, width, height, cell_size);
    let levels = iso_proportion_levels(&grid.values, plot.levels, plot.thresh);
    let Some(lowest) = levels.first().copied() else {
        bail!("track density is empty within the background bounds");
    };
    let bands = plot.levels - 1;

    let mut out = background.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let value = grid.sample(x, y);
        if !(value >= lowest) || value <= 0.0 {
            continue;
        }
        let band = (levels.iter().filter(|level| **level <= value).count() - 1).min(bands - 1);
        let t = if bands > 1 {
            band as f64 / (bands - 1) as f64
        } else {
            0.0
        };
        let color = colormap.sample(t);
        let Rgba([r, g, b, a]) = *pixel;
        let blend = |under: u8, over: u8| {
            (under as f64 * (1.0 - plot.alpha) + over as f64 * plot.alpha).round() as u8
        };
        *pixel = Rgba([blend(r, color[0]), blend(g, color[1]), blend(b, color[2]), a]);
    }
    Ok(out)
}

pub fn heatmap_from_track(track: &Track, config: &HeatmapConfig) -> Result<RgbaImage> {
    let path = &config.heatmap.background.image;
    let background = image::open(path)
        .with_context(|| format!("failed to open background {}", path.display()))?
        .to_rgba8();
    draw_heatmap(track, config, &background)
}

/// Creates a heatmap from a track CSV file.
pub fn heatmap(track: &Path, config: &Path) -> Result<RgbaImage> {
    let track = export_data::load_track_csv(track)?;
    let config = HeatmapConfig::load(config)?;
    heatmap_from_track(&track, &config)
}

/// Saves by extension; formats without alpha get the RGB channels only.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("unsupported image extension {}", path.display()))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Bmp => {
            image::DynamicImage::ImageRgba8(img.clone())
                .to_rgb8()
                .save_with_format(path, format)?
        }
        _ => img.save_with_format(path, format)?,
    }
    info!("heatmap saved to {}", path.display());
    Ok(())
}

pub fn jpeg_bytes(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img.clone())
        .to_rgb8()
        .write_to(&mut bytes, ImageFormat::Jpeg)?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{project, Background};
    use std::path::PathBuf;

    #[test]
    fn projection_flips_latitude() {
        let background = Background {
            image: PathBuf::from("bg.png"),
            min_lon: 10.0,
            max_lon: 20.0,
            min_lat: 40.0,
            max_lat: 50.0,
        };
        assert_eq!(project(&background, 50.0, 10.0, 200, 100), (0.0, 0.0));
        assert_eq!(project(&background, 45.0, 15.0, 200, 100), (100.0, 50.0));
    }
}

use crate::blur::fastblur;
use std::f64::consts::PI;

/// Number of evaluation points used for 1-D density curves.
pub const GRID_SIZE: usize = 200;

fn mean_and_std(samples: &[f64]) -> Option<(f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var.sqrt()))
}

/// Scott's rule bandwidth factor for `n` samples in `dims` dimensions.
pub fn scott_factor(n: usize, dims: i32) -> f64 {
    (n as f64).powf(-1.0 / (dims as f64 + 4.0))
}

/// 1-D gaussian kernel density estimate.
pub struct GaussianKde {
    samples: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    /// `None` when the samples cannot support an estimate: fewer than two
    /// finite values or no spread at all.
    pub fn new(samples: &[f64]) -> Option<Self> {
        let samples: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
        let (_, std) = mean_and_std(&samples)?;
        if !(std > 0.0) {
            return None;
        }
        let bandwidth = std * scott_factor(samples.len(), 1);
        Some(GaussianKde { samples, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let norm = 1.0 / (self.samples.len() as f64 * self.bandwidth * (2.0 * PI).sqrt());
        self.samples
            .iter()
            .map(|xi| (-0.5 * ((x - xi) / self.bandwidth).powi(2)).exp())
            .sum::<f64>()
            * norm
    }

    /// Range of the samples; curves are not extended past the data.
    pub fn support(&self) -> (f64, f64) {
        self.samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(*x), hi.max(*x))
            })
    }

    /// Density evaluated on `GRID_SIZE` points over the support, scaled by
    /// `weight` so several groups can share one normalization.
    pub fn curve(&self, weight: f64) -> Vec<(f64, f64)> {
        let (lo, hi) = self.support();
        (0..GRID_SIZE)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / (GRID_SIZE - 1) as f64;
                (x, self.evaluate(x) * weight)
            })
            .collect()
    }
}

/// A 2-D density estimate sampled on a regular grid of cells.
pub struct DensityGrid {
    pub width: usize,
    pub height: usize,
    pub cell_size: f64,
    pub values: Vec<f32>,
}

impl DensityGrid {
    /// Bins `points` (in pixel coordinates of a `width`x`height` area) into
    /// cells of `cell_size` pixels and smooths them with a per-axis Scott
    /// bandwidth. Points outside the area still shape the bandwidth but are
    /// not binned.
    pub fn from_points(points: &[(f64, f64)], width: u32, height: u32, cell_size: f64) -> Self {
        let cell_size = cell_size.max(1.0);
        let grid_width = ((width as f64 / cell_size).ceil() as usize).max(1);
        let grid_height = ((height as f64 / cell_size).ceil() as usize).max(1);
        let mut values = vec![0.0f32; grid_width * grid_height];

        for (x, y) in points {
            let (col, row) = ((x / cell_size).floor(), (y / cell_size).floor());
            if col < 0.0 || row < 0.0 {
                continue;
            }
            let (col, row) = (col as usize, row as usize);
            if col < grid_width && row < grid_height {
                values[row * grid_width + col] += 1.0;
            }
        }

        let factor = scott_factor(points.len(), 2);
        let axis_sigma = |axis: Vec<f64>| {
            let std = mean_and_std(&axis).map(|(_, std)| std).unwrap_or(0.0);
            // keep at least a cell of smoothing so a single position still shows up
            ((std * factor / cell_size) as f32).max(1.0)
        };
        let sigma_x = axis_sigma(points.iter().map(|p| p.0).collect());
        let sigma_y = axis_sigma(points.iter().map(|p| p.1).collect());
        fastblur::gaussian_blur(&mut values, grid_width, grid_height, sigma_x, sigma_y);

        DensityGrid {
            width: grid_width,
            height: grid_height,
            cell_size,
            values,
        }
    }

    fn cell(&self, col: isize, row: isize) -> f32 {
        let col = col.clamp(0, self.width as isize - 1) as usize;
        let row = row.clamp(0, self.height as isize - 1) as usize;
        self.values[row * self.width + col]
    }

    /// Bilinear sample at a pixel centre.
    pub fn sample(&self, px: u32, py: u32) -> f32 {
        let gx = (px as f64 + 0.5) / self.cell_size - 0.5;
        let gy = (py as f64 + 0.5) / self.cell_size - 0.5;
        let (x0, y0) = (gx.floor(), gy.floor());
        let (fx, fy) = ((gx - x0) as f32, (gy - y0) as f32);
        let (x0, y0) = (x0 as isize, y0 as isize);
        let top = self.cell(x0, y0) * (1.0 - fx) + self.cell(x0 + 1, y0) * fx;
        let bottom = self.cell(x0, y0 + 1) * (1.0 - fx) + self.cell(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

/// Density thresholds such that the region above the k-th threshold holds
/// `1 - p_k` of the total mass, for `p` in `linspace(thresh, 1, levels)`.
/// Returned in ascending order.
pub fn iso_proportion_levels(values: &[f32], levels: usize, thresh: f64) -> Vec<f32> {
    let total: f64 = values.iter().map(|v| *v as f64).sum();
    if levels == 0 || values.is_empty() || !(total > 0.0) {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let cumulative: Vec<f64> = sorted
        .iter()
        .scan(0.0, |acc, v| {
            *acc += *v as f64;
            Some(*acc / total)
        })
        .collect();

    (0..levels)
        .map(|k| {
            let proportion = if levels == 1 {
                thresh
            } else {
                thresh + (1.0 - thresh) * k as f64 / (levels - 1) as f64
            };
            let target = 1.0 - proportion;
            let idx = cumulative.partition_point(|c| *c < target);
            sorted[idx.min(sorted.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{iso_proportion_levels, DensityGrid, GaussianKde};

    #[test]
    fn kde_integrates_to_one() {
        let samples = [1.0, 2.0, 2.5, 3.0, 7.0];
        let kde = GaussianKde::new(&samples).unwrap();
        let step = 0.01;
        let area: f64 = (-1000..2000)
            .map(|i| kde.evaluate(i as f64 * step) * step)
            .sum();
        assert!((area - 1.0).abs() < 1e-3, "{area}");
        let curve = kde.curve(0.5);
        assert_eq!(curve.first().unwrap().0, 1.0);
        assert_eq!(curve.last().unwrap().0, 7.0);
    }

    #[test]
    fn kde_needs_spread() {
        assert!(GaussianKde::new(&[1.0]).is_none());
        assert!(GaussianKde::new(&[2.0, 2.0, 2.0]).is_none());
        assert!(GaussianKde::new(&[2.0, f64::INFINITY]).is_none());
    }

    #[test]
    fn levels_follow_mass() {
        let levels = iso_proportion_levels(&[4.0, 3.0, 2.0, 1.0], 2, 0.05);
        assert_eq!(levels, vec![1.0, 4.0]);
        assert!(iso_proportion_levels(&[0.0, 0.0], 3, 0.05).is_empty());
    }

    #[test]
    fn density_peaks_at_points() {
        let points = vec![(10.0, 10.0), (10.5, 10.5), (11.0, 9.5)];
        let grid = DensityGrid::from_points(&points, 40, 20, 1.0);
        assert_eq!((grid.width, grid.height), (40, 20));
        assert!(grid.sample(10, 10) > grid.sample(30, 10));
        assert!(grid.sample(10, 10) > 0.0);
    }
}

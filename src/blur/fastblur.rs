use std::cmp::min;

/// Approximates a gaussian blur of a single channel `f32` buffer with three
/// box blur passes. Samples outside the buffer count as zero, so the total
/// mass is only preserved away from the borders.
pub fn gaussian_blur(
    data: &mut [f32],
    width: usize,
    height: usize,
    sigma_horz: f32,
    sigma_vert: f32,
) {
    if width == 0 || height == 0 {
        return;
    }
    let boxes_horz = create_box_gauss(sigma_horz, 3);
    let boxes_vert = create_box_gauss(sigma_vert, 3);
    let mut backbuf = data.to_vec();

    for (box_horz, box_vert) in boxes_horz.iter().zip(boxes_vert.iter()) {
        let radius_horz = ((box_horz - 1) / 2) as usize;
        let radius_vert = ((box_vert - 1) / 2) as usize;
        box_blur(&mut backbuf, data, width, height, radius_horz, radius_vert);
    }
}

#[inline]
/// If there is no valid size (e.g. radius is negative), returns `vec![1; len]`
/// which would translate to blur radius of 0
fn create_box_gauss(sigma: f32, n: usize) -> Vec<i32> {
    if sigma > 0.0 {
        let n_float = n as f32;

        // Ideal averaging filter width
        let w_ideal = (12.0 * sigma * sigma / n_float).sqrt() + 1.0;
        let mut wl: i32 = w_ideal.floor() as i32;

        if wl % 2 == 0 {
            wl -= 1;
        };

        let wu = wl + 2;

        let wl_float = wl as f32;
        let m_ideal = (12.0 * sigma * sigma
            - n_float * wl_float * wl_float
            - 4.0 * n_float * wl_float
            - 3.0 * n_float)
            / (-4.0 * wl_float - 4.0);
        let m: usize = m_ideal.round().max(0.0) as usize;

        (0..n).map(|i| if i < m { wl } else { wu }).collect()
    } else {
        vec![1; n]
    }
}

/// Needs 2x the same image; the result ends up in `frontbuf`.
#[inline]
fn box_blur(
    backbuf: &mut [f32],
    frontbuf: &mut [f32],
    width: usize,
    height: usize,
    blur_radius_horz: usize,
    blur_radius_vert: usize,
) {
    box_blur_horz(frontbuf, backbuf, width, height, blur_radius_horz);
    box_blur_vert(backbuf, frontbuf, width, height, blur_radius_vert);
}

#[inline]
fn box_blur_vert(src: &[f32], dst: &mut [f32], width: usize, height: usize, blur_radius: usize) {
    if blur_radius == 0 {
        dst.copy_from_slice(src);
        return;
    }

    let iarr = 1.0 / (blur_radius + blur_radius + 1) as f32;

    for col in 0..width {
        let at = |row: usize| src[row * width + col];
        let mut val: f32 = (0..min(blur_radius + 1, height)).map(at).sum();

        for row in 0..height {
            dst[row * width + col] = val * iarr;
            if row + blur_radius + 1 < height {
                val += at(row + blur_radius + 1);
            }
            if row >= blur_radius {
                val -= at(row - blur_radius);
            }
        }
    }
}

#[inline]
fn box_blur_horz(src: &[f32], dst: &mut [f32], width: usize, height: usize, blur_radius: usize) {
    if blur_radius == 0 {
        dst.copy_from_slice(src);
        return;
    }

    let iarr = 1.0 / (blur_radius + blur_radius + 1) as f32;

    for row in 0..height {
        let line = &src[row * width..(row + 1) * width];
        let out = &mut dst[row * width..(row + 1) * width];
        let mut val: f32 = line[..min(blur_radius + 1, width)].iter().sum();

        for x in 0..width {
            out[x] = val * iarr;
            if x + blur_radius + 1 < width {
                val += line[x + blur_radius + 1];
            }
            if x >= blur_radius {
                val -= line[x - blur_radius];
            }
        }
    }
}

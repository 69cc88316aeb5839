use crate::error::ScaleError;

use super::{BYTES_PER_PIXEL, Raster};

/// Shrink `src` to fit inside `target_width` x `target_height`, keeping its
/// aspect ratio. Rasters that already fit are copied unchanged.
///
/// Sampling is nearest neighbour: the result is an intermediate cache
/// artifact, and the display layer does its own final filtering.
pub fn scale_to_fit(
    src: &Raster,
    target_width: u32,
    target_height: u32,
) -> Result<Raster, ScaleError> {
    if src.width == 0 || src.height == 0 {
        return Err(ScaleError::EmptySource);
    }
    if target_width == 0 || target_height == 0 {
        return Err(ScaleError::EmptyTarget {
            width: target_width,
            height: target_height,
        });
    }

    let scale_x = target_width as f64 / src.width as f64;
    let scale_y = target_height as f64 / src.height as f64;
    let scale = scale_x.min(scale_y).min(1.0);
    if scale >= 1.0 {
        return Ok(src.clone());
    }

    let dst_width = ((src.width as f64 * scale).floor() as u32).max(1);
    let dst_height = ((src.height as f64 * scale).floor() as u32).max(1);
    let dst_pitch = dst_width as usize * BYTES_PER_PIXEL;
    let bytes = dst_pitch * dst_height as usize;

    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(bytes)
        .map_err(|_| ScaleError::Allocation { bytes })?;

    let src_pitch = src.pitch();
    let max_x = src.width - 1;
    let max_y = src.height - 1;
    for y in 0..dst_height {
        let src_y = ((y as f64 / scale) as u32).min(max_y) as usize;
        let row = &src.pixels[src_y * src_pitch..(src_y + 1) * src_pitch];
        for x in 0..dst_width {
            let src_x = ((x as f64 / scale) as u32).min(max_x) as usize * BYTES_PER_PIXEL;
            pixels.extend_from_slice(&row[src_x..src_x + BYTES_PER_PIXEL]);
        }
    }

    Ok(Raster {
        width: dst_width,
        height: dst_height,
        pixels,
    })
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Segmentation rasterization.
//!
//! Converts COCO polygons and run-length encodings into boolean `(H, W)` masks.
//! Run lengths are column-major: pixel `(y, x)` sits at linear index `y + h * x`,
//! and runs alternate between background and foreground starting with background.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use ndarray::Array2;

use crate::annotation::{RleCounts, RleSegmentation, Segmentation};
use crate::error::{Result, TargetError};

/// Upsampling factor used when walking polygon edges.
const POLY_SCALE: f64 = 5.0;

/// Rasterize any COCO segmentation to a `(height, width)` mask.
///
/// # Errors
///
/// Returns [`TargetError::LookupError`] if an RLE does not match the requested size
/// or a compressed RLE string is malformed.
pub fn segmentation_to_mask(
    segmentation: &Segmentation,
    height: u32,
    width: u32,
) -> Result<Array2<bool>> {
    match segmentation {
        Segmentation::Polygons(polygons) => Ok(polygons_to_mask(polygons, height, width)),
        Segmentation::Rle(rle) => rle_to_mask(rle, height, width),
    }
}

/// Rasterize a run-length encoded segmentation.
///
/// # Errors
///
/// Returns [`TargetError::LookupError`] on a size mismatch or malformed counts string.
pub fn rle_to_mask(rle: &RleSegmentation, height: u32, width: u32) -> Result<Array2<bool>> {
    let [h, w] = rle.size;
    if h != height || w != width {
        return Err(TargetError::LookupError(format!(
            "RLE size {h}x{w} does not match image size {height}x{width}"
        )));
    }
    match &rle.counts {
        RleCounts::Uncompressed(counts) => decode_counts(counts, height, width),
        RleCounts::Compressed(s) => decode_counts(&counts_from_string(s)?, height, width),
    }
}

/// Union of all polygons of one instance. Polygons with fewer than three points are skipped.
#[must_use]
pub fn polygons_to_mask(polygons: &[Vec<f64>], height: u32, width: u32) -> Array2<bool> {
    let mut mask = Array2::from_elem((height as usize, width as usize), false);
    for polygon in polygons {
        if polygon.len() < 6 {
            continue;
        }
        let counts = polygon_counts(polygon, height, width);
        // Counts from `polygon_counts` always cover exactly h * w pixels.
        if let Ok(poly_mask) = decode_counts(&counts, height, width) {
            mask.zip_mut_with(&poly_mask, |m, &p| *m |= p);
        }
    }
    mask
}

/// Expand column-major run lengths into a row-major `(height, width)` mask.
///
/// # Errors
///
/// Returns [`TargetError::LookupError`] if the runs cover more pixels than the image has.
pub fn decode_counts(counts: &[u32], height: u32, width: u32) -> Result<Array2<bool>> {
    let (h, w) = (height as usize, width as usize);
    let n = h * w;
    let total: usize = counts.iter().map(|&c| c as usize).sum();
    if total > n {
        return Err(TargetError::LookupError(format!(
            "RLE covers {total} pixels but the image has {n}"
        )));
    }

    let mut column_major = vec![false; n];
    let mut idx = 0usize;
    let mut value = false;
    for &c in counts {
        let end = idx + c as usize;
        if value {
            column_major[idx..end].fill(true);
        }
        idx = end;
        value = !value;
    }

    let mask = Array2::from_shape_vec((w, h), column_major)?.reversed_axes();
    Ok(mask.as_standard_layout().into_owned())
}

/// Decode the compact COCO counts string (5 bits per char, continuation bit 0x20,
/// counts past the second stored as deltas).
///
/// # Errors
///
/// Returns [`TargetError::LookupError`] if the string ends mid-value, a value runs
/// past 64 bits or a run length is negative.
pub fn counts_from_string(s: &str) -> Result<Vec<u32>> {
    let bytes = s.as_bytes();
    let mut counts: Vec<i64> = Vec::new();
    let mut p = 0usize;

    while p < bytes.len() {
        let mut x: i64 = 0;
        let mut k = 0u32;
        loop {
            let Some(&byte) = bytes.get(p) else {
                return Err(TargetError::LookupError(format!(
                    "truncated RLE string at byte {p}"
                )));
            };
            let c = i64::from(byte) - 48;
            let Some(chunk) = (c & 0x1f).checked_shl(5 * k) else {
                return Err(TargetError::LookupError(format!(
                    "RLE value at byte {p} overflows 64 bits"
                )));
            };
            x |= chunk;
            p += 1;
            k += 1;
            if c & 0x20 == 0 {
                if c & 0x10 != 0 {
                    x |= (-1i64).checked_shl(5 * k).unwrap_or(0);
                }
                break;
            }
        }
        if counts.len() > 2 {
            x = x.checked_add(counts[counts.len() - 2]).ok_or_else(|| {
                TargetError::LookupError(format!("RLE run length overflows at byte {p}"))
            })?;
        }
        counts.push(x);
    }

    counts
        .into_iter()
        .map(|c| {
            u32::try_from(c)
                .map_err(|_| TargetError::LookupError(format!("invalid RLE run length {c}")))
        })
        .collect()
}

/// Scan-line conversion of one polygon into column-major run lengths.
fn polygon_counts(xy: &[f64], height: u32, width: u32) -> Vec<u32> {
    let (h, w) = (i64::from(height), i64::from(width));
    let k = xy.len() / 2;

    // Upsampled integer vertices, closed.
    let mut x: Vec<i64> = (0..k)
        .map(|j| POLY_SCALE.mul_add(xy[j * 2], 0.5) as i64)
        .collect();
    let mut y: Vec<i64> = (0..k)
        .map(|j| POLY_SCALE.mul_add(xy[j * 2 + 1], 0.5) as i64)
        .collect();
    x.push(x[0]);
    y.push(y[0]);

    // Dense boundary points along every edge.
    let mut u: Vec<i64> = Vec::new();
    let mut v: Vec<i64> = Vec::new();
    for j in 0..k {
        let (mut xs, mut xe, mut ys, mut ye) = (x[j], x[j + 1], y[j], y[j + 1]);
        let dx = (xe - xs).abs();
        let dy = (ys - ye).abs();
        let flip = (dx >= dy && xs > xe) || (dx < dy && ys > ye);
        if flip {
            std::mem::swap(&mut xs, &mut xe);
            std::mem::swap(&mut ys, &mut ye);
        }
        if dx >= dy {
            let s = if dx == 0 { 0.0 } else { (ye - ys) as f64 / dx as f64 };
            for d in 0..=dx {
                let t = if flip { dx - d } else { d };
                u.push(t + xs);
                v.push(s.mul_add(t as f64, ys as f64 + 0.5) as i64);
            }
        } else {
            let s = (xe - xs) as f64 / dy as f64;
            for d in 0..=dy {
                let t = if flip { dy - d } else { d };
                v.push(t + ys);
                u.push(s.mul_add(t as f64, xs as f64 + 0.5) as i64);
            }
        }
    }

    // Column crossings, downsampled back to pixel coordinates.
    let mut starts: Vec<i64> = Vec::new();
    for j in 1..u.len() {
        if u[j] == u[j - 1] {
            continue;
        }
        let xd = (if u[j] < u[j - 1] { u[j] } else { u[j] - 1 }) as f64;
        let xd = (xd + 0.5) / POLY_SCALE - 0.5;
        if xd.floor() != xd || xd < 0.0 || xd > (w - 1) as f64 {
            continue;
        }
        let yd = v[j].min(v[j - 1]) as f64;
        let yd = ((yd + 0.5) / POLY_SCALE - 0.5).clamp(0.0, h as f64).ceil();
        starts.push(xd as i64 * h + yd as i64);
    }
    starts.push(h * w);
    starts.sort_unstable();

    let mut deltas = Vec::with_capacity(starts.len());
    let mut prev = 0i64;
    for s in starts {
        deltas.push(s - prev);
        prev = s;
    }

    // Zero-length runs merge their neighbours.
    let mut counts: Vec<i64> = Vec::with_capacity(deltas.len());
    let mut j = 0usize;
    counts.push(deltas[j]);
    j += 1;
    while j < deltas.len() {
        if deltas[j] > 0 {
            counts.push(deltas[j]);
            j += 1;
        } else {
            j += 1;
            if j < deltas.len() {
                if let Some(last) = counts.last_mut() {
                    *last += deltas[j];
                }
                j += 1;
            }
        }
    }

    counts.into_iter().map(|c| c.max(0) as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_counts_column_major() {
        // 2x3 image, columns: [0,1], [1,1], [0,0]
        let mask = decode_counts(&[1, 3, 2], 2, 3).unwrap();
        assert_eq!(mask.shape(), &[2, 3]);
        assert!(!mask[[0, 0]]);
        assert!(mask[[1, 0]]);
        assert!(mask[[0, 1]]);
        assert!(mask[[1, 1]]);
        assert!(!mask[[0, 2]]);
        assert!(!mask[[1, 2]]);
    }

    #[test]
    fn test_decode_counts_overflow() {
        assert!(decode_counts(&[3, 4], 2, 3).is_err());
    }

    #[test]
    fn test_counts_from_string() {
        // values below 16 encode as a single char, 48 + value
        assert_eq!(counts_from_string("1").unwrap(), vec![1]);
        assert_eq!(counts_from_string("121").unwrap(), vec![1, 2, 1]);
        // fourth value onwards is a delta against the run two places back
        assert_eq!(counts_from_string("1211").unwrap(), vec![1, 2, 1, 3]);
        assert!(counts_from_string("P").is_err());
    }

    #[test]
    fn test_counts_from_string_overlong_value() {
        let long = format!("{}0", "`".repeat(14));
        assert!(matches!(
            counts_from_string(&long),
            Err(TargetError::LookupError(_))
        ));
        // twelve continuation chars still fit in 64 bits
        assert_eq!(
            counts_from_string(&format!("{}0", "P".repeat(12))).unwrap(),
            vec![0]
        );
    }

    #[test]
    fn test_compressed_matches_uncompressed() {
        let compressed = RleSegmentation {
            size: [2, 3],
            counts: RleCounts::Compressed("132".to_string()),
        };
        let plain = RleSegmentation {
            size: [2, 3],
            counts: RleCounts::Uncompressed(vec![1, 3, 2]),
        };
        assert_eq!(
            rle_to_mask(&compressed, 2, 3).unwrap(),
            rle_to_mask(&plain, 2, 3).unwrap()
        );
    }

    #[test]
    fn test_rle_size_mismatch() {
        let rle = RleSegmentation {
            size: [4, 4],
            counts: RleCounts::Uncompressed(vec![16]),
        };
        assert!(matches!(
            rle_to_mask(&rle, 4, 5),
            Err(TargetError::LookupError(_))
        ));
    }

    #[test]
    fn test_square_polygon() {
        let square = vec![2.0, 2.0, 6.0, 2.0, 6.0, 6.0, 2.0, 6.0];
        let mask = polygons_to_mask(&[square], 10, 10);
        assert!(mask[[4, 4]]);
        assert!(mask[[3, 5]]);
        assert!(!mask[[0, 0]]);
        assert!(!mask[[8, 8]]);
        assert!(!mask[[4, 8]]);
        let area = mask.iter().filter(|&&m| m).count();
        assert!((9..=25).contains(&area), "unexpected area {area}");
    }

    #[test]
    fn test_degenerate_polygon_is_empty() {
        let mask = polygons_to_mask(&[vec![1.0, 1.0, 2.0, 2.0]], 5, 5);
        assert!(mask.iter().all(|&m| !m));
    }

    #[test]
    fn test_polygon_union() {
        let left = vec![0.0, 0.0, 3.0, 0.0, 3.0, 9.0, 0.0, 9.0];
        let right = vec![6.0, 0.0, 9.0, 0.0, 9.0, 9.0, 6.0, 9.0];
        let mask = polygons_to_mask(&[left, right], 10, 10);
        assert!(mask[[5, 1]]);
        assert!(mask[[5, 7]]);
        assert!(!mask[[5, 5]]);
    }
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Grayscale previews of training targets.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use ndarray::{Array2, ArrayView2, Axis, s};

use crate::error::Result;
use crate::targets::Targets;

/// Map `values` to a grayscale image, `0.0` black and `scale` white.
fn to_gray(values: ArrayView2<'_, f32>, scale: f32) -> GrayImage {
    let (height, width) = values.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = values[[y as usize, x as usize]] / scale;
        Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Per-pixel maximum over the joint channels. The background channel is left out.
#[must_use]
pub fn render_heatmaps(heatmaps: &ndarray::Array3<f32>) -> GrayImage {
    let joints = heatmaps.shape()[0].saturating_sub(1);
    let peak = heatmaps
        .slice(s![..joints, .., ..])
        .fold_axis(Axis(0), 0.0f32, |&acc, &v| acc.max(v));
    to_gray(peak.view(), 1.0)
}

/// Magnitude of the sum of all limb vectors, scaled to the brightest pixel.
#[must_use]
pub fn render_pafs(pafs: &ndarray::Array4<f32>) -> GrayImage {
    let dx = pafs.index_axis(Axis(1), 0).sum_axis(Axis(0));
    let dy = pafs.index_axis(Axis(1), 1).sum_axis(Axis(0));
    let mut magnitude = Array2::<f32>::zeros(dx.raw_dim());
    ndarray::Zip::from(&mut magnitude)
        .and(&dx)
        .and(&dy)
        .for_each(|m, &x, &y| *m = x.hypot(y));

    let max = magnitude.iter().copied().fold(0.0f32, f32::max);
    to_gray(magnitude.view(), if max > 0.0 { max } else { 1.0 })
}

/// Ignored pixels white, everything else black.
#[must_use]
pub fn render_mask(mask: &Array2<bool>) -> GrayImage {
    let values = mask.mapv(|m| if m { 1.0 } else { 0.0 });
    to_gray(values.view(), 1.0)
}

/// Find the next free run directory (`build`, `build2`, `build3`, ...) under `base`.
#[must_use]
pub fn next_run_dir(base: &Path, prefix: &str) -> PathBuf {
    let first = base.join(prefix);
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|i| base.join(format!("{prefix}{i}")))
        .find(|dir| !dir.exists())
        .unwrap_or(first)
}

/// Write heatmap, PAF and ignore-mask previews of `targets` into `dir`.
///
/// Files are named `<image_id>_heatmaps.png`, `<image_id>_pafs.png` and
/// `<image_id>_ignore.png`. Returns the written paths.
///
/// # Errors
///
/// Returns an error if `dir` cannot be created or an image cannot be encoded.
pub fn save_previews(targets: &Targets, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let id = targets.image_id;
    let previews = [
        (format!("{id}_heatmaps.png"), render_heatmaps(&targets.heatmaps)),
        (format!("{id}_pafs.png"), render_pafs(&targets.pafs)),
        (format!("{id}_ignore.png"), render_mask(&targets.ignore_mask)),
    ];

    let mut written = Vec::with_capacity(previews.len());
    for (name, image) in previews {
        let path = dir.join(name);
        image.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Subcommand implementations.

use std::time::Instant;

use crate::cli::args::{BuildArgs, IndexArgs};
use crate::error::Result;
use crate::{
    AnnotationFilter, CocoDatabase, EligibleIndex, FileIdStore, TargetBuilder, TargetConfig,
    Targets, VERSION, info, section, success, verbose,
};

/// Load the annotation file, reporting its size.
fn load_database(path: &std::path::Path) -> Result<CocoDatabase> {
    let start = Instant::now();
    let db = CocoDatabase::from_path(path)?;
    verbose!(
        "Loaded {} images and {} annotations from {} in {:.1}s",
        db.num_images(),
        db.num_annotations(),
        path.display(),
        start.elapsed().as_secs_f32()
    );
    Ok(db)
}

/// Run the eligible-image indexer for one split.
///
/// # Errors
///
/// Returns an error if the annotations cannot be loaded or the id cache fails.
pub fn run_index(args: &IndexArgs) -> Result<()> {
    info!("pose-targets {VERSION} 🚀 index");
    let db = load_database(&args.annotations)?;

    let index = EligibleIndex::new(
        FileIdStore::new(&args.data_path),
        AnnotationFilter::default(),
    );
    let ids = index.eligible_image_ids(&db, &args.split)?;

    success!(
        "{} eligible images in split '{}' ({})",
        ids.len(),
        args.split,
        index.store().path(&args.split).display()
    );
    Ok(())
}

/// Build targets for one image and print their statistics.
///
/// # Errors
///
/// Returns an error for invalid parameters, an unknown image, malformed annotations
/// or failure to write previews.
pub fn run_build(args: &BuildArgs) -> Result<()> {
    info!("pose-targets {VERSION} 🚀 build");
    let config = TargetConfig::new()
        .with_heatmap_sigma(args.sigma)
        .with_paf_width(args.paf_width);
    let builder = TargetBuilder::new(config)?;
    let db = load_database(&args.annotations)?;

    let start = Instant::now();
    let targets = builder.build(&db, args.image_id)?;
    let elapsed = start.elapsed();

    print_summary(&targets);
    verbose!("Built in {:.1}ms", elapsed.as_secs_f64() * 1000.0);

    #[cfg(feature = "annotate")]
    {
        let dir = args.output.clone().unwrap_or_else(|| {
            crate::render::next_run_dir(std::path::Path::new("runs/targets"), "build")
        });
        let written = crate::render::save_previews(&targets, &dir)?;
        success!("Saved {} previews to {}", written.len(), dir.display());
    }
    #[cfg(not(feature = "annotate"))]
    if args.output.is_some() {
        crate::warn!(
            "--output requires the 'annotate' feature. Compile with --features annotate to enable previews."
        );
    }

    Ok(())
}

fn print_summary(targets: &Targets) {
    section!("Image {}", targets.image_id);
    info!(
        "{}x{} pixels, {} eligible instances",
        targets.width(),
        targets.height(),
        targets.num_instances()
    );
    info!("heatmaps {:?}", targets.heatmaps.shape());
    info!("pafs     {:?}", targets.pafs.shape());

    let heat_peak = targets
        .heatmaps
        .slice(ndarray::s![..-1, .., ..])
        .iter()
        .copied()
        .fold(0.0f32, f32::max);
    let active_limbs = targets
        .pafs
        .outer_iter()
        .filter(|limb| limb.iter().any(|&v| v != 0.0))
        .count();
    verbose!("heatmap peak {heat_peak:.3}, {active_limbs} limbs with non-zero fields");

    let ignored = targets.ignored_pixels();
    #[allow(clippy::cast_precision_loss)]
    let share = 100.0 * ignored as f64 / (targets.width() * targets.height()).max(1) as f64;
    info!("ignore   {ignored} pixels ({share:.1}%)");
}

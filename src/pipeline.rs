//! End-to-end mask generation: read, normalize, rasterize.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::error::ViamaskError;
use crate::normalize::normalize;
use crate::raster::{
    CachingProbe, CanvasMode, DirectoryProbe, FailurePolicy, MaskRasterizer, RenderReport,
};
use crate::via::read_via_json;

/// Options for [`generate_masks`].
#[derive(Clone, Debug)]
pub struct GenerateOptions {
    /// VIA JSON export to read.
    pub annotations: PathBuf,
    /// Directory holding the source images named in the export.
    pub images_dir: PathBuf,
    /// Directory the masks are written to.
    pub output_dir: PathBuf,
    pub mode: CanvasMode,
    pub policy: FailurePolicy,
    /// Create `output_dir` (and parents) before rasterizing.
    pub create_output_dir: bool,
    /// Probe sources and compute names without writing any file.
    pub dry_run: bool,
}

impl GenerateOptions {
    pub fn new(
        annotations: impl Into<PathBuf>,
        images_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            annotations: annotations.into(),
            images_dir: images_dir.into(),
            output_dir: output_dir.into(),
            mode: CanvasMode::default(),
            policy: FailurePolicy::default(),
            create_output_dir: false,
            dry_run: false,
        }
    }
}

/// Runs the whole pipeline and returns the per-record report.
///
/// The annotation document is validated in full before anything is written;
/// a schema error leaves the output directory untouched. Per-record failures
/// follow `opts.policy`; under [`FailurePolicy::KeepGoing`] the caller should
/// inspect [`RenderReport::failure_count`].
pub fn generate_masks(opts: &GenerateOptions) -> Result<RenderReport, ViamaskError> {
    let document = read_via_json(&opts.annotations)?;
    let records = normalize(&document)?;
    info!(
        entries = document.entries.len(),
        regions = records.len(),
        "normalized annotations"
    );

    if opts.create_output_dir && !opts.dry_run {
        fs::create_dir_all(&opts.output_dir)?;
    }

    let probe = CachingProbe::new(DirectoryProbe::new(&opts.images_dir));
    let rasterizer = MaskRasterizer::new(probe, &opts.output_dir)
        .with_mode(opts.mode)
        .with_policy(opts.policy)
        .with_dry_run(opts.dry_run);
    let report = rasterizer.rasterize_all(&records)?;

    info!(
        written = report.success_count(),
        failed = report.failure_count(),
        dry_run = opts.dry_run,
        "mask generation finished"
    );
    Ok(report)
}

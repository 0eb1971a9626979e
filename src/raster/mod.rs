//! Polygon-to-mask rasterization.
//!
//! Each [`RegionRecord`] becomes one single-channel PNG the size of its
//! source image, with the polygon interior and boundary set to the
//! foreground value and everything else to the background value. Mask names
//! are derived from the record alone (see [`output_name`]), so repeated runs
//! over the same inputs produce the same files byte for byte.

mod report;

pub use report::{RenderOutcome, RenderReport, RenderStatus};

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::error::{EncodingError, ImageFormatHint};
use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use tracing::{debug, warn};

use crate::error::ViamaskError;
use crate::normalize::RegionRecord;

/// Extension appended to every mask file name.
pub const MASK_EXTENSION: &str = ".png";

/// Pixel values used for the mask canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CanvasMode {
    /// Black background, white (255) foreground.
    #[default]
    Bilevel,
    /// Zero background, one foreground; for training pipelines that expect
    /// label indices rather than viewable images.
    Binary,
}

impl CanvasMode {
    pub fn background(self) -> Luma<u8> {
        Luma([0])
    }

    pub fn foreground(self) -> Luma<u8> {
        match self {
            CanvasMode::Bilevel => Luma([255]),
            CanvasMode::Binary => Luma([1]),
        }
    }
}

/// What to do when a single record cannot be rasterized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing record and return its error.
    #[default]
    FailFast,
    /// Record the failure in the report and continue with the next record.
    KeepGoing,
}

/// Builds the mask file name for `record`.
///
/// The name is `filename`, `type` and `count` + `extension` joined with `_`,
/// with empty segments dropped. An untyped region on `x.png` therefore gives
/// `x_0.png`, never `x__0.png`.
pub fn output_name(record: &RegionRecord, extension: &str) -> String {
    let count = format!("{}{}", record.count, extension);
    let segments = [
        record.filename.as_str(),
        record.region_type.as_str(),
        count.as_str(),
    ];

    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Rasterizes `record` onto a fresh `width` x `height` canvas.
///
/// Pixels inside the polygon or on its boundary take the mode's foreground
/// value. The polygon is clipped to the canvas before filling, so far-away
/// vertices cost no more than nearby ones.
pub fn render(record: &RegionRecord, (width, height): (u32, u32), mode: CanvasMode) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(width, height, mode.background());
    if width == 0 || height == 0 {
        return canvas;
    }

    let raw: Vec<(f64, f64)> = record
        .points()
        .map(|(x, y)| (f64::from(x), f64::from(y)))
        .collect();
    let mut points: Vec<Point<i32>> = Vec::with_capacity(raw.len());
    for (x, y) in clip_polygon(raw, width, height) {
        // Clipped coordinates lie within [-1, width] x [-1, height].
        let point = Point::new(x.round() as i32, y.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    // The polygon is implicitly closed; an explicit closing vertex is redundant.
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let foreground = mode.foreground();
    match points.as_slice() {
        [] => {}
        [p] => {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                canvas.put_pixel(p.x as u32, p.y as u32, foreground);
            }
        }
        [a, b] => draw_line_segment_mut(
            &mut canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            foreground,
        ),
        polygon => draw_polygon_mut(&mut canvas, polygon, foreground),
    }

    canvas
}

/// One side of the clip window.
#[derive(Clone, Copy)]
enum ClipEdge {
    Left(f64),
    Right(f64),
    Top(f64),
    Bottom(f64),
}

impl ClipEdge {
    fn contains(self, (x, y): (f64, f64)) -> bool {
        match self {
            ClipEdge::Left(bound) => x >= bound,
            ClipEdge::Right(bound) => x <= bound,
            ClipEdge::Top(bound) => y >= bound,
            ClipEdge::Bottom(bound) => y <= bound,
        }
    }

    /// Where segment `a`-`b` crosses this edge. Only called when exactly one
    /// endpoint is inside, so the divisor is never zero.
    fn crossing(self, (ax, ay): (f64, f64), (bx, by): (f64, f64)) -> (f64, f64) {
        match self {
            ClipEdge::Left(bound) | ClipEdge::Right(bound) => {
                let t = (bound - ax) / (bx - ax);
                (bound, ay + t * (by - ay))
            }
            ClipEdge::Top(bound) | ClipEdge::Bottom(bound) => {
                let t = (bound - ay) / (by - ay);
                (ax + t * (bx - ax), bound)
            }
        }
    }
}

/// Sutherland-Hodgman clip against `[-1, width] x [-1, height]`.
///
/// The window sits one pixel outside the canvas on every side, so edges that
/// the clip introduces never touch a visible pixel. Vertices already inside
/// the window come through unchanged.
fn clip_polygon(mut polygon: Vec<(f64, f64)>, width: u32, height: u32) -> Vec<(f64, f64)> {
    let edges = [
        ClipEdge::Left(-1.0),
        ClipEdge::Right(f64::from(width)),
        ClipEdge::Top(-1.0),
        ClipEdge::Bottom(f64::from(height)),
    ];

    for edge in edges {
        let Some(&last) = polygon.last() else {
            break;
        };
        let mut clipped = Vec::with_capacity(polygon.len() + 2);
        let mut previous = last;
        for &current in &polygon {
            match (edge.contains(previous), edge.contains(current)) {
                (true, true) => clipped.push(current),
                (true, false) => clipped.push(edge.crossing(previous, current)),
                (false, true) => {
                    clipped.push(edge.crossing(previous, current));
                    clipped.push(current);
                }
                (false, false) => {}
            }
            previous = current;
        }
        polygon = clipped;
    }

    polygon
}

/// Encodes `mask` as PNG at `path`.
///
/// Bilevel masks are stored at one bit per pixel; binary masks keep eight
/// bits so their 0/1 values survive as label indices.
fn write_mask(mask: &GrayImage, path: &Path, mode: CanvasMode) -> Result<(), ViamaskError> {
    let written = match mode {
        CanvasMode::Bilevel => write_one_bit_png(mask, path),
        CanvasMode::Binary => mask.save_with_format(path, ImageFormat::Png),
    };
    written.map_err(|source| ViamaskError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_one_bit_png(mask: &GrayImage, path: &Path) -> Result<(), image::ImageError> {
    let encoding_error = |err: png::EncodingError| {
        image::ImageError::Encoding(EncodingError::new(
            ImageFormatHint::Exact(ImageFormat::Png),
            err,
        ))
    };

    let mut buffer = Vec::new();
    let mut encoder = png::Encoder::new(&mut buffer, mask.width(), mask.height());
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::One);
    let mut writer = encoder.write_header().map_err(encoding_error)?;
    writer
        .write_image_data(&pack_rows(mask))
        .map_err(encoding_error)?;
    drop(writer);

    fs::write(path, buffer)?;
    Ok(())
}

/// Packs non-zero pixels into MSB-first bit rows, each padded to a byte.
fn pack_rows(mask: &GrayImage) -> Vec<u8> {
    let stride = (mask.width() as usize).div_ceil(8);
    let mut packed = vec![0u8; stride * mask.height() as usize];
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] != 0 {
            packed[y as usize * stride + x as usize / 8] |= 0x80 >> (x % 8);
        }
    }
    packed
}

/// Answers "how big is this source image?".
///
/// The rasterizer never stores image sizes itself; it asks a probe, keyed by
/// the source file name (`{filename}.{filetype}`).
pub trait ImageSizeProbe {
    /// Returns `(width, height)` in pixels.
    fn dimensions(&self, file_name: &str) -> Result<(u32, u32), ViamaskError>;
}

/// Probes image files inside a source directory by reading their headers.
#[derive(Clone, Debug)]
pub struct DirectoryProbe {
    root: PathBuf,
}

impl DirectoryProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageSizeProbe for DirectoryProbe {
    fn dimensions(&self, file_name: &str) -> Result<(u32, u32), ViamaskError> {
        let path = self.root.join(file_name);
        if !path.is_file() {
            return Err(ViamaskError::SourceImageNotFound { path });
        }
        read_image_dimensions(&path)
    }
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), ViamaskError> {
    let size = imagesize::size(path).map_err(|source| ViamaskError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| ViamaskError::ImageDimensionRead {
            path: path.to_path_buf(),
            source: imagesize::ImageError::CorruptedImage,
        })?;
    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| ViamaskError::ImageDimensionRead {
            path: path.to_path_buf(),
            source: imagesize::ImageError::CorruptedImage,
        })?;

    Ok((width, height))
}

/// Wraps a probe and remembers every size it has answered.
///
/// Regions on the same source image then cost one header read per run.
/// Failed lookups are not remembered.
#[derive(Debug)]
pub struct CachingProbe<P> {
    inner: P,
    sizes: RefCell<HashMap<String, (u32, u32)>>,
}

impl<P: ImageSizeProbe> CachingProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            sizes: RefCell::new(HashMap::new()),
        }
    }
}

impl<P: ImageSizeProbe> ImageSizeProbe for CachingProbe<P> {
    fn dimensions(&self, file_name: &str) -> Result<(u32, u32), ViamaskError> {
        let cached = self.sizes.borrow().get(file_name).copied();
        if let Some(size) = cached {
            return Ok(size);
        }

        let size = self.inner.dimensions(file_name)?;
        self.sizes.borrow_mut().insert(file_name.to_string(), size);
        Ok(size)
    }
}

/// Turns region records into mask files in an output directory.
#[derive(Debug)]
pub struct MaskRasterizer<P: ImageSizeProbe> {
    probe: P,
    output_dir: PathBuf,
    mode: CanvasMode,
    policy: FailurePolicy,
    dry_run: bool,
}

impl<P: ImageSizeProbe> MaskRasterizer<P> {
    pub fn new(probe: P, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            probe,
            output_dir: output_dir.into(),
            mode: CanvasMode::default(),
            policy: FailurePolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_mode(mut self, mode: CanvasMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// When set, sources are probed and names computed but nothing is written.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Full path of the mask file for `record`.
    pub fn mask_path(&self, record: &RegionRecord) -> PathBuf {
        self.output_dir.join(output_name(record, MASK_EXTENSION))
    }

    /// Rasterizes one record and writes its mask, returning the mask path and
    /// the canvas size.
    ///
    /// An existing file with the same name is overwritten.
    pub fn rasterize(&self, record: &RegionRecord) -> Result<(PathBuf, (u32, u32)), ViamaskError> {
        let size = self.probe.dimensions(&record.source_file_name())?;
        let path = self.mask_path(record);

        if !self.dry_run {
            let mask = render(record, size, self.mode);
            write_mask(&mask, &path, self.mode)?;
        }

        debug!(mask = %path.display(), width = size.0, height = size.1, "rasterized region");
        Ok((path, size))
    }

    /// Rasterizes every record in order.
    ///
    /// Under [`FailurePolicy::FailFast`] the first error is returned. Under
    /// [`FailurePolicy::KeepGoing`] failures are collected in the report.
    pub fn rasterize_all(&self, records: &[RegionRecord]) -> Result<RenderReport, ViamaskError> {
        let mut report = RenderReport::new(self.dry_run);

        for record in records {
            let mask = output_name(record, MASK_EXTENSION);
            match self.rasterize(record) {
                Ok((_, (width, height))) => report.add_success(record, mask, width, height),
                Err(err) => {
                    warn!(
                        source = %record.source_file_name(),
                        %mask,
                        error = %err,
                        "region failed"
                    );
                    match self.policy {
                        FailurePolicy::FailFast => return Err(err),
                        FailurePolicy::KeepGoing => {
                            report.add_failure(record, mask, err.to_string())
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}

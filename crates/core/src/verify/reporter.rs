use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::slug::{slugify, timestamp_token};
use crate::verify::comparator::MismatchRecord;

/// Scenario parameters that distinguish one run's diagnostics from
/// another's on disk.
#[derive(Clone, Debug)]
pub enum ScenarioParams {
    Stream { frames_per_chunk: usize },
    Random { timestamps: Vec<f64> },
}

impl ScenarioParams {
    fn token(&self) -> String {
        match self {
            Self::Stream { frames_per_chunk } => format!("cpc{frames_per_chunk}"),
            Self::Random { timestamps } => {
                let joined: Vec<String> =
                    timestamps.iter().map(|&ts| timestamp_token(ts)).collect();
                format!("seek_{}", joined.join("_"))
            }
        }
    }
}

/// Aggregate failure raised once, after every diagnostic is on disk.
#[derive(Error, Debug)]
#[error("{mismatches} discordant frame pair(s); diagnostics written to {}", directory.display())]
pub struct VerifyFailure {
    pub mismatches: usize,
    pub directory: PathBuf,
}

/// Renders mismatch evidence to image files under a deterministic,
/// run-specific directory.
///
/// Each record becomes one PNG laid out as a 4x3 grid: rows are the R,
/// G and B channels plus a composite RGB row; columns are backend A,
/// backend B and their absolute difference. File names encode chunk and
/// frame position, the directory encodes source and scenario, so a
/// human can triage every discordant frame from one run without
/// re-running.
pub struct DiagnosticReporter {
    output_dir: PathBuf,
}

impl DiagnosticReporter {
    pub fn new(tmp_root: &Path, source: &Path, params: &ScenarioParams) -> Self {
        let dir_name = format!(
            "{}_{}",
            slugify(&source.to_string_lossy()),
            params.token()
        );
        Self {
            output_dir: tmp_root.join(dir_name),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes one diff image per record. Directory creation is
    /// create-if-absent; re-running a scenario overwrites the same
    /// paths rather than accumulating stale artifacts.
    pub fn write_all(
        &self,
        records: &[MismatchRecord],
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.output_dir)?;
        let mut paths = Vec::with_capacity(records.len());
        for record in records {
            let path = self.output_dir.join(format!(
                "chunk_{}_frame_{}.png",
                record.chunk_index, record.frame_index
            ));
            let grid = render_grid(record.left.as_ref(), record.right.as_ref());
            grid.save(&path)?;
            log::info!("wrote diagnostic {}", path.display());
            paths.push(path);
        }
        Ok(paths)
    }
}

/// 4 rows x 3 columns. Rows 0-2 show one color channel as grayscale,
/// row 3 the full RGB image. Columns are backend A, backend B and the
/// per-sample absolute difference. A missing side (frame-count
/// mismatch) renders black so the artifact still shows what the other
/// backend produced.
fn render_grid(left: Option<&Frame>, right: Option<&Frame>) -> RgbImage {
    let (w, h) = panel_size(left, right);
    let mut canvas = RgbImage::new(3 * w, 4 * h);

    for y in 0..h {
        for x in 0..w {
            let a = [
                sample(left, x, y, 0),
                sample(left, x, y, 1),
                sample(left, x, y, 2),
            ];
            let b = [
                sample(right, x, y, 0),
                sample(right, x, y, 1),
                sample(right, x, y, 2),
            ];
            let d = [
                a[0].abs_diff(b[0]),
                a[1].abs_diff(b[1]),
                a[2].abs_diff(b[2]),
            ];

            for c in 0..3usize {
                let row = c as u32;
                canvas.put_pixel(x, row * h + y, Rgb([a[c], a[c], a[c]]));
                canvas.put_pixel(w + x, row * h + y, Rgb([b[c], b[c], b[c]]));
                canvas.put_pixel(2 * w + x, row * h + y, Rgb([d[c], d[c], d[c]]));
            }
            canvas.put_pixel(x, 3 * h + y, Rgb(a));
            canvas.put_pixel(w + x, 3 * h + y, Rgb(b));
            canvas.put_pixel(2 * w + x, 3 * h + y, Rgb(d));
        }
    }
    canvas
}

fn panel_size(left: Option<&Frame>, right: Option<&Frame>) -> (u32, u32) {
    let w = left
        .map(Frame::width)
        .unwrap_or(0)
        .max(right.map(Frame::width).unwrap_or(0));
    let h = left
        .map(Frame::height)
        .unwrap_or(0)
        .max(right.map(Frame::height).unwrap_or(0));
    (w.max(1), h.max(1))
}

fn sample(frame: Option<&Frame>, x: u32, y: u32, channel: usize) -> u8 {
    let Some(frame) = frame else { return 0 };
    if x >= frame.width() || y >= frame.height() {
        return 0;
    }
    let offset = (y as usize * frame.width() as usize + x as usize) * 3 + channel;
    frame.data()[offset]
}

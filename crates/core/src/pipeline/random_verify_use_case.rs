use std::path::{Path, PathBuf};

use crate::verify::chunk::Chunk;
use crate::verify::comparator::{verify, Tolerance, VerifyReport};
use crate::verify::reporter::{DiagnosticReporter, ScenarioParams, VerifyFailure};
use crate::video::domain::frame_source::read_seek_chunks;
use crate::video::domain::video_reader::VideoReader;

/// Default chunk size for the random-access scenario.
pub const DEFAULT_FRAMES_PER_CHUNK: usize = 3;

/// Orchestrates the random-access (seek) verification scenario.
///
/// Both backends get the identical timestamp list, in caller order.
/// Because the backends' seek precision deliberately differs, a
/// divergence here manifests as a numeric mismatch between equally
/// sized chunks, never as a count mismatch. Single-use like
/// [`StreamVerifyUseCase`](super::stream_verify_use_case::StreamVerifyUseCase).
pub struct RandomVerifyUseCase {
    reader_a: Option<Box<dyn VideoReader>>,
    reader_b: Option<Box<dyn VideoReader>>,
    timestamps: Vec<f64>,
    frames_per_chunk: usize,
    tolerance: Tolerance,
    tmp_root: PathBuf,
}

impl RandomVerifyUseCase {
    pub fn new(
        reader_a: Box<dyn VideoReader>,
        reader_b: Box<dyn VideoReader>,
        timestamps: Vec<f64>,
        frames_per_chunk: usize,
        tolerance: Tolerance,
        tmp_root: PathBuf,
    ) -> Self {
        Self {
            reader_a: Some(reader_a),
            reader_b: Some(reader_b),
            timestamps,
            frames_per_chunk,
            tolerance,
            tmp_root,
        }
    }

    pub fn execute(&mut self, data: &Path) -> Result<VerifyReport, Box<dyn std::error::Error>> {
        if self.timestamps.is_empty() {
            return Err("random scenario needs at least one timestamp".into());
        }
        let mut reader_a = self.reader_a.take().ok_or("scenario already executed")?;
        let mut reader_b = self.reader_b.take().ok_or("scenario already executed")?;

        let chunks_a =
            decode_chunks(&mut *reader_a, data, &self.timestamps, self.frames_per_chunk)?;
        log::info!("backend A produced {} chunks", chunks_a.len());
        let chunks_b =
            decode_chunks(&mut *reader_b, data, &self.timestamps, self.frames_per_chunk)?;
        log::info!("backend B produced {} chunks", chunks_b.len());

        let report = verify(&chunks_a, &chunks_b, &self.tolerance)?;
        println!("{}", report.summary());

        if report.is_match() {
            return Ok(report);
        }

        let params = ScenarioParams::Random {
            timestamps: self.timestamps.clone(),
        };
        let reporter = DiagnosticReporter::new(&self.tmp_root, data, &params);
        reporter.write_all(&report.mismatches)?;
        Err(VerifyFailure {
            mismatches: report.mismatches.len(),
            directory: reporter.output_dir().to_path_buf(),
        }
        .into())
    }
}

/// Open, seek-and-read one chunk per timestamp. `close` runs on every
/// path, including when a seek or decode error propagates.
fn decode_chunks(
    reader: &mut dyn VideoReader,
    data: &Path,
    timestamps: &[f64],
    frames_per_chunk: usize,
) -> Result<Vec<Chunk>, Box<dyn std::error::Error>> {
    let outcome = match reader.open(data) {
        Ok(_) => read_seek_chunks(reader, timestamps, frames_per_chunk),
        Err(e) => Err(e),
    };
    reader.close();
    outcome
}

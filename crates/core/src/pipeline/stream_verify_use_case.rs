use std::path::{Path, PathBuf};

use crate::verify::chunk::Chunk;
use crate::verify::comparator::{verify, Tolerance, VerifyReport};
use crate::verify::reporter::{DiagnosticReporter, ScenarioParams, VerifyFailure};
use crate::video::domain::frame_source::read_stream_chunks;
use crate::video::domain::video_reader::VideoReader;

/// Orchestrates the sequential-streaming verification scenario.
///
/// Decodes the whole source through both backends (A to completion,
/// then B), chunks identically, compares, and on mismatch writes
/// diagnostics before raising one aggregate failure. No comparison
/// logic lives here. Single-use: `execute` consumes the owned readers,
/// so calling it twice will fail.
pub struct StreamVerifyUseCase {
    reader_a: Option<Box<dyn VideoReader>>,
    reader_b: Option<Box<dyn VideoReader>>,
    frames_per_chunk: usize,
    tolerance: Tolerance,
    tmp_root: PathBuf,
}

impl StreamVerifyUseCase {
    pub fn new(
        reader_a: Box<dyn VideoReader>,
        reader_b: Box<dyn VideoReader>,
        frames_per_chunk: usize,
        tolerance: Tolerance,
        tmp_root: PathBuf,
    ) -> Self {
        Self {
            reader_a: Some(reader_a),
            reader_b: Some(reader_b),
            frames_per_chunk,
            tolerance,
            tmp_root,
        }
    }

    pub fn execute(&mut self, data: &Path) -> Result<VerifyReport, Box<dyn std::error::Error>> {
        let mut reader_a = self.reader_a.take().ok_or("scenario already executed")?;
        let mut reader_b = self.reader_b.take().ok_or("scenario already executed")?;

        let chunks_a = decode_chunks(&mut *reader_a, data, self.frames_per_chunk)?;
        log::info!("backend A produced {} chunks", chunks_a.len());
        let chunks_b = decode_chunks(&mut *reader_b, data, self.frames_per_chunk)?;
        log::info!("backend B produced {} chunks", chunks_b.len());

        let report = verify(&chunks_a, &chunks_b, &self.tolerance)?;
        println!("{}", report.summary());

        if report.is_match() {
            return Ok(report);
        }

        let params = ScenarioParams::Stream {
            frames_per_chunk: self.frames_per_chunk,
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

/// Open, drain, chunk. `close` runs on every path, including when the
/// decode error propagates.
fn decode_chunks(
    reader: &mut dyn VideoReader,
    data: &Path,
    frames_per_chunk: usize,
) -> Result<Vec<Chunk>, Box<dyn std::error::Error>> {
    let outcome = match reader.open(data) {
        Ok(_) => read_stream_chunks(reader, frames_per_chunk),
        Err(e) => Err(e),
    };
    reader.close();
    outcome
}

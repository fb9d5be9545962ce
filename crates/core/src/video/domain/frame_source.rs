use crate::shared::frame::Frame;
use crate::verify::chunk::{chunk_frames, Chunk};

use super::video_reader::VideoReader;

/// Drains an opened reader from its current position and partitions the
/// frames into chunks of `frames_per_chunk` (last chunk may be short).
///
/// The first decode error aborts the read and propagates verbatim; a
/// flaky decode is a finding, not something to retry around.
pub fn read_stream_chunks(
    reader: &mut dyn VideoReader,
    frames_per_chunk: usize,
) -> Result<Vec<Chunk>, Box<dyn std::error::Error>> {
    if frames_per_chunk == 0 {
        return Err("frames_per_chunk must be positive".into());
    }

    let mut frames: Vec<Frame> = Vec::new();
    for frame in reader.frames() {
        frames.push(frame?);
    }
    log::debug!(
        "sequential read finished: {} frames, {} per chunk",
        frames.len(),
        frames_per_chunk
    );
    chunk_frames(frames, frames_per_chunk)
}

/// For each timestamp, in caller order (no sorting, no deduplication):
/// seek, then read exactly `frames_per_chunk` frames into one chunk.
///
/// Where iteration lands after the seek depends on the backend's
/// [`SeekPrecision`](super::video_reader::SeekPrecision); the chunk
/// contents may therefore differ between backends while the chunk count
/// never does. Running out of frames before filling a chunk is a
/// backend failure, not a short chunk.
pub fn read_seek_chunks(
    reader: &mut dyn VideoReader,
    timestamps: &[f64],
    frames_per_chunk: usize,
) -> Result<Vec<Chunk>, Box<dyn std::error::Error>> {
    if frames_per_chunk == 0 {
        return Err("frames_per_chunk must be positive".into());
    }

    let mut chunks = Vec::with_capacity(timestamps.len());
    for &ts in timestamps {
        if !ts.is_finite() || ts < 0.0 {
            return Err(format!("invalid seek timestamp: {ts}").into());
        }
        log::debug!("seeking to {ts}s ({:?})", reader.seek_precision());
        reader.seek(ts)?;

        let mut frames = Vec::with_capacity(frames_per_chunk);
        let mut iter = reader.frames();
        for _ in 0..frames_per_chunk {
            match iter.next() {
                Some(frame) => frames.push(frame?),
                None => {
                    return Err(format!(
                        "backend produced {} of {frames_per_chunk} frames after seek to {ts}s",
                        frames.len()
                    )
                    .into())
                }
            }
        }
        drop(iter);
        chunks.push(Chunk::new(frames)?);
    }
    Ok(chunks)
}

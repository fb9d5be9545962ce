use crate::shared::frame::Frame;

/// An ordered group of consecutive frames from one backend.
///
/// Chunks are fixed-size except possibly the last one of a stream.
/// Construction enforces the invariant the comparator relies on: every
/// frame in a chunk shares the same spatial shape.
#[derive(Clone, Debug)]
pub struct Chunk {
    frames: Vec<Frame>,
}

impl Chunk {
    pub fn new(frames: Vec<Frame>) -> Result<Self, Box<dyn std::error::Error>> {
        if frames.is_empty() {
            return Err("a chunk must contain at least one frame".into());
        }
        let shape = frames[0].shape();
        for frame in &frames[1..] {
            if frame.shape() != shape {
                return Err(format!(
                    "inconsistent frame shapes within chunk: {:?} vs {:?}",
                    shape,
                    frame.shape()
                )
                .into());
            }
        }
        Ok(Self { frames })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

/// Partitions `frames` into chunks of `chunk_size`, preserving order.
///
/// Chunk `i` holds frames `[i*chunk_size, min((i+1)*chunk_size, N))`;
/// the last chunk may be short. No frames are dropped or reordered, so
/// concatenating the chunks reproduces the input exactly.
pub fn chunk_frames(
    frames: Vec<Frame>,
    chunk_size: usize,
) -> Result<Vec<Chunk>, Box<dyn std::error::Error>> {
    if chunk_size == 0 {
        return Err("chunk size must be positive".into());
    }
    let mut chunks = Vec::with_capacity(frames.len().div_ceil(chunk_size));
    let mut frames = frames.into_iter().peekable();
    while frames.peek().is_some() {
        let group: Vec<Frame> = frames.by_ref().take(chunk_size).collect();
        chunks.push(Chunk::new(group)?);
    }
    Ok(chunks)
}

use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// How precisely a backend lands on a requested seek timestamp.
///
/// The two backends under test deliberately differ here: one discards
/// decoded frames until the exact target time, the other stops at the
/// nearest keyframe at or before it. The harness exposes the capability
/// instead of normalizing it, so a seek-precision divergence surfaces as
/// a numeric mismatch in the comparison rather than being papered over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekPrecision {
    /// Iteration after a seek resumes at the first frame whose
    /// presentation time is at or after the requested timestamp.
    Exact,
    /// Iteration after a seek resumes at the nearest keyframe at or
    /// before the requested timestamp.
    Keyframe,
}

/// Reads frames from a video source under verification.
///
/// Implementations handle I/O details (codec, container format, seek
/// mechanics) while the harness works with the abstract `Frame` and
/// `VideoMetadata` types. Readers hold a single read cursor: `frames`
/// yields a lazy iterator that advances the cursor and is not
/// restartable once consumed; calling `frames` again resumes from
/// wherever the cursor currently points, which is how `seek` composes
/// with iteration.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames, in presentation order, from the
    /// current read cursor.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Repositions the read cursor to `timestamp` (seconds). Landing
    /// semantics follow [`Self::seek_precision`].
    fn seek(&mut self, timestamp: f64) -> Result<(), Box<dyn std::error::Error>>;

    /// Capability flag describing this backend's seek landing behavior.
    fn seek_precision(&self) -> SeekPrecision;

    /// Releases any resources held by the reader. Idempotent.
    fn close(&mut self);
}

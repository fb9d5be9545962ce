use thiserror::Error;

use crate::shared::frame::Frame;
use crate::verify::chunk::Chunk;

/// Numeric closeness thresholds for frame equivalence.
///
/// Two samples `a` and `b` (widened to f64) are close when
/// `|a - b| <= atol + rtol * max(|a|, |b|)`. The defaults are strict
/// enough that a single off-by-one u8 sample fails while float
/// round-trip noise passes.
#[derive(Clone, Copy, Debug)]
pub struct Tolerance {
    pub atol: f64,
    pub rtol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            atol: 1e-5,
            rtol: 1e-6,
        }
    }
}

impl Tolerance {
    pub fn samples_close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.atol + self.rtol * a.abs().max(b.abs())
    }
}

/// What kind of discrepancy a [`MismatchRecord`] captures.
#[derive(Clone, Debug, PartialEq)]
pub enum MismatchKind {
    /// Samples diverged beyond tolerance.
    Numeric { max_abs_diff: f64 },
    /// The paired chunks disagree on how many frames they hold.
    FrameCount { left: usize, right: usize },
    /// The paired frames disagree on spatial shape.
    Shape {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },
}

/// Evidence of one frame-pair (or chunk-pair) discrepancy.
///
/// Frames are cloned out of the chunks so the record stays usable for
/// diagnostic rendering after the chunks are dropped. For frame-count
/// mismatches there is no meaningful frame pair; both sides are `None`
/// and `frame_index` is 0.
#[derive(Clone, Debug)]
pub struct MismatchRecord {
    pub chunk_index: usize,
    pub frame_index: usize,
    pub left: Option<Frame>,
    pub right: Option<Frame>,
    pub kind: MismatchKind,
}

/// Hard precondition failures: nothing was compared, nothing is rendered.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("backend {side} produced no chunks")]
    EmptyChunks { side: &'static str },
    #[error("chunk count mismatch between backends: {left} vs {right}")]
    ChunkCountMismatch { left: usize, right: usize },
}

/// Outcome of a full comparison pass.
#[derive(Debug)]
pub struct VerifyReport {
    pub total_frames: usize,
    pub total_chunks: usize,
    pub mismatches: Vec<MismatchRecord>,
}

impl VerifyReport {
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// One-line account of how much was compared, emitted before any
    /// failure so a triager always sees the run size.
    pub fn summary(&self) -> String {
        format!(
            "Decoded {} frames. ({} chunks)",
            self.total_frames, self.total_chunks
        )
    }
}

/// Compares two parallel chunk sequences frame-by-frame.
///
/// Precondition failures (empty input, sequence length mismatch) abort
/// before any frame content is touched. Everything past the
/// preconditions accumulates: a discordant pair never stops the pass,
/// so one run reports the full extent of divergence. Pure with respect
/// to the filesystem; rendering is the reporter's job.
pub fn verify(
    left: &[Chunk],
    right: &[Chunk],
    tolerance: &Tolerance,
) -> Result<VerifyReport, VerifyError> {
    if left.is_empty() {
        return Err(VerifyError::EmptyChunks { side: "A" });
    }
    if right.is_empty() {
        return Err(VerifyError::EmptyChunks { side: "B" });
    }
    if left.len() != right.len() {
        return Err(VerifyError::ChunkCountMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    let mut mismatches = Vec::new();
    for (chunk_index, (lc, rc)) in left.iter().zip(right.iter()).enumerate() {
        if lc.frame_count() != rc.frame_count() {
            log::debug!(
                "chunk {chunk_index}: frame count mismatch ({} vs {})",
                lc.frame_count(),
                rc.frame_count()
            );
            mismatches.push(MismatchRecord {
                chunk_index,
                frame_index: 0,
                left: lc.frames().first().cloned(),
                right: rc.frames().first().cloned(),
                kind: MismatchKind::FrameCount {
                    left: lc.frame_count(),
                    right: rc.frame_count(),
                },
            });
            continue;
        }

        for (frame_index, (lf, rf)) in
            lc.frames().iter().zip(rc.frames().iter()).enumerate()
        {
            if let Some(kind) = compare_frames(lf, rf, tolerance) {
                log::debug!("chunk {chunk_index} frame {frame_index}: {kind:?}");
                mismatches.push(MismatchRecord {
                    chunk_index,
                    frame_index,
                    left: Some(lf.clone()),
                    right: Some(rf.clone()),
                    kind,
                });
            }
        }
    }

    Ok(VerifyReport {
        total_frames: left.iter().map(Chunk::frame_count).sum(),
        total_chunks: left.len(),
        mismatches,
    })
}

/// `None` when the frames are equivalent under `tolerance`.
fn compare_frames(left: &Frame, right: &Frame, tolerance: &Tolerance) -> Option<MismatchKind> {
    if left.shape() != right.shape() {
        return Some(MismatchKind::Shape {
            left: left.shape(),
            right: right.shape(),
        });
    }

    let mut max_abs_diff = 0.0f64;
    let mut close = true;
    for (&a, &b) in left.data().iter().zip(right.data().iter()) {
        let (a, b) = (f64::from(a), f64::from(b));
        if !tolerance.samples_close(a, b) {
            close = false;
            max_abs_diff = max_abs_diff.max((a - b).abs());
        }
    }

    if close {
        None
    } else {
        Some(MismatchKind::Numeric { max_abs_diff })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::chunk::chunk_frames;

    fn make_frame(index: usize, value: u8) -> Frame {
        Frame::new(vec![value; 12], 2, 2, 3, index, index as f64 / 30.0)
    }

    fn uniform_chunks(n: usize, k: usize, value: u8) -> Vec<Chunk> {
        let frames = (0..n).map(|i| make_frame(i, value)).collect();
        chunk_frames(frames, k).unwrap()
    }

    #[test]
    fn test_identical_chunks_match() {
        let a = uniform_chunks(10, 1, 42);
        let b = uniform_chunks(10, 1, 42);
        let report = verify(&a, &b, &Tolerance::default()).unwrap();
        assert!(report.is_match());
        assert_eq!(report.total_frames, 10);
        assert_eq!(report.total_chunks, 10);
        assert_eq!(report.summary(), "Decoded 10 frames. (10 chunks)");
    }

    #[test]
    fn test_empty_left_is_precondition_failure() {
        let b = uniform_chunks(2, 1, 0);
        let err = verify(&[], &b, &Tolerance::default()).unwrap_err();
        assert!(matches!(err, VerifyError::EmptyChunks { side: "A" }));
    }

    #[test]
    fn test_empty_right_is_precondition_failure() {
        let a = uniform_chunks(2, 1, 0);
        let err = verify(&a, &[], &Tolerance::default()).unwrap_err();
        assert!(matches!(err, VerifyError::EmptyChunks { side: "B" }));
    }

    #[test]
    fn test_chunk_count_mismatch_is_precondition_failure() {
        let a = uniform_chunks(4, 1, 7);
        let b = uniform_chunks(3, 1, 7);
        let err = verify(&a, &b, &Tolerance::default()).unwrap_err();
        assert!(matches!(
            err,
            VerifyError::ChunkCountMismatch { left: 4, right: 3 }
        ));
    }

    #[test]
    fn test_off_by_one_sample_is_a_mismatch() {
        let a = uniform_chunks(3, 1, 100);
        let mut b = uniform_chunks(3, 1, 100);
        // bump one sample of the middle chunk's frame by one
        let mut frames = b[1].frames().to_vec();
        let mut data = frames[0].data().to_vec();
        data[5] += 1;
        frames[0] = Frame::new(data, 2, 2, 3, frames[0].index(), frames[0].pts_seconds());
        b[1] = Chunk::new(frames).unwrap();

        let report = verify(&a, &b, &Tolerance::default()).unwrap();
        assert_eq!(report.mismatches.len(), 1);
        let record = &report.mismatches[0];
        assert_eq!(record.chunk_index, 1);
        assert_eq!(record.frame_index, 0);
        assert!(matches!(record.kind, MismatchKind::Numeric { max_abs_diff } if max_abs_diff == 1.0));
    }

    #[test]
    fn test_tolerance_boundary() {
        let tol = Tolerance {
            atol: 3.0,
            rtol: 0.0,
        };
        // differ by exactly atol at one sample: equivalent
        assert!(tol.samples_close(10.0, 13.0));
        // one unit past atol: not equivalent
        assert!(!tol.samples_close(10.0, 14.0));
    }

    #[test]
    fn test_default_tolerance_accepts_float_roundtrip_noise() {
        use approx::assert_abs_diff_eq;

        let tol = Tolerance::default();
        let a = 100.0f64;
        let b = a + 1e-7;
        assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        assert!(tol.samples_close(a, b));
        // but a whole sample step still fails
        assert!(!tol.samples_close(a, a + 1.0));
    }

    #[test]
    fn test_mismatches_accumulate_across_all_pairs() {
        let a = uniform_chunks(4, 2, 10);
        let b = uniform_chunks(4, 2, 20);
        let report = verify(&a, &b, &Tolerance::default()).unwrap();
        // every frame of every chunk diverges; nothing short-circuits
        assert_eq!(report.mismatches.len(), 4);
        let chunk_indices: Vec<usize> =
            report.mismatches.iter().map(|m| m.chunk_index).collect();
        assert_eq!(chunk_indices, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_frame_count_mismatch_is_recorded_not_fatal() {
        let a = uniform_chunks(4, 2, 10);
        let mut b = uniform_chunks(4, 2, 10);
        b[0] = Chunk::new(vec![make_frame(0, 10)]).unwrap();

        let report = verify(&a, &b, &Tolerance::default()).unwrap();
        assert_eq!(report.mismatches.len(), 1);
        assert!(matches!(
            report.mismatches[0].kind,
            MismatchKind::FrameCount { left: 2, right: 1 }
        ));
        // total chunk count is still reported from the full pass
        assert_eq!(report.total_chunks, 2);
    }

    #[test]
    fn test_shape_mismatch_is_structural() {
        let a = vec![Chunk::new(vec![make_frame(0, 1)]).unwrap()];
        let b = vec![Chunk::new(vec![Frame::new(vec![1u8; 27], 3, 3, 3, 0, 0.0)]).unwrap()];
        let report = verify(&a, &b, &Tolerance::default()).unwrap();
        assert_eq!(report.mismatches.len(), 1);
        assert!(matches!(
            report.mismatches[0].kind,
            MismatchKind::Shape { .. }
        ));
    }

    #[test]
    fn test_verify_is_deterministic() {
        let a = uniform_chunks(6, 2, 10);
        let b = uniform_chunks(6, 2, 11);
        let first = verify(&a, &b, &Tolerance::default()).unwrap();
        let second = verify(&a, &b, &Tolerance::default()).unwrap();
        assert_eq!(first.mismatches.len(), second.mismatches.len());
        assert_eq!(first.is_match(), second.is_match());
    }
}

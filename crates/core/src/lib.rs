//! Cross-validation harness for two video-decoding backends: decode the
//! same source through both, chunk the frames identically, and assert
//! numerical equivalence frame-by-frame. Divergences are rendered as
//! per-channel diff images for offline triage.

pub mod pipeline;
pub mod shared;
pub mod verify;
pub mod video;

pub(crate) mod decode;
pub mod ffmpeg_reader;
pub mod keyframe_reader;

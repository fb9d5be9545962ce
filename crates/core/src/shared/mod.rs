pub mod frame;
pub mod slug;
pub mod video_metadata;

pub mod image_frame_sink;
pub mod image_frame_source;

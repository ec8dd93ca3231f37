pub mod annotator_config;
pub mod color;
pub mod constants;
pub mod frame;
pub mod region;
pub mod stream_metadata;

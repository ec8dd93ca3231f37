pub mod annotate_frame_use_case;
pub mod annotate_stream_use_case;
pub mod infrastructure;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod session;

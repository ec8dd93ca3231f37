pub mod frame_filter;

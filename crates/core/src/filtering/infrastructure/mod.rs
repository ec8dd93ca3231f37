pub mod laplacian_filter;
pub mod outline_marker;

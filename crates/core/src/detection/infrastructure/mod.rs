pub mod cascade_detector;
pub mod detector_loader;
pub mod haar_cascade;
mod integral_image;
pub mod rect_grouping;

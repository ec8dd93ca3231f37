pub mod detector_slot;
pub mod eye_detector;
pub mod region_selector;

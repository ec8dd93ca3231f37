//! Eye-detection overlay and Laplacian high-pass stage for camera frames.
//!
//! A [`pipeline::session::Session`] loads a Haar eye cascade in the
//! background and annotates frames as they arrive: detect eyes, outline
//! the two largest detections, then high-pass filter the frame.

pub mod detection;
pub mod filtering;
pub mod pipeline;
pub mod shared;
pub mod video;

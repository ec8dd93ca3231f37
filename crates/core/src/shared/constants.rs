pub const CASCADE_MODEL_NAME: &str = "haarcascade_eye.xml";

/// Per-app directory the bundled cascade is copied into.
pub const CASCADE_DIR_NAME: &str = "cascade";
pub const APP_DIR_NAME: &str = "EyeCam";

/// Usual install locations of the OpenCV eye cascade on Linux and macOS.
pub const SYSTEM_CASCADE_PATHS: &[&str] = &[
    "/usr/share/opencv4/haarcascades/haarcascade_eye.xml",
    "/usr/share/opencv/haarcascades/haarcascade_eye.xml",
    "/usr/local/share/opencv4/haarcascades/haarcascade_eye.xml",
    "/opt/homebrew/share/opencv4/haarcascades/haarcascade_eye.xml",
];

/// Number of detections outlined per frame (one per eye).
pub const DEFAULT_TOP_K: usize = 2;

/// Intensity written to every channel of an outline pixel.
pub const DEFAULT_MARKER_VALUE: u8 = 1;

pub const LAPLACIAN_APERTURE: usize = 3;
pub const LAPLACIAN_SCALE: f32 = 0.5;
pub const LAPLACIAN_DELTA: f32 = 0.0;

pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;
pub const DEFAULT_MIN_NEIGHBORS: usize = 3;
pub const GROUP_EPS: f64 = 0.2;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

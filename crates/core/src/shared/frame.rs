use ndarray::{ArrayView3, ArrayViewMut3};

/// Channel count of the camera layout every annotated frame is returned in.
pub const RGBA_CHANNELS: u8 = 4;

/// A single camera frame: contiguous 8-bit pixels in row-major order.
///
/// Channel layouts are 1 (gray), 3 (RGB) or 4 (RGBA). The camera source
/// delivers RGBA; the other layouts only appear at I/O boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Allocates an RGBA frame filled with a single value on every channel.
    pub fn filled(width: u32, height: u32, value: u8, index: usize) -> Self {
        let len = (width as usize) * (height as usize) * RGBA_CHANNELS as usize;
        Self::new(vec![value; len], width, height, RGBA_CHANNELS, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

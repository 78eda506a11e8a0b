use ndarray::{ArrayView3, ArrayViewMut3};

/// One decoded video frame: tightly-packed RGB bytes in row-major order,
/// tagged with its position in the clip.
///
/// Pixel-format conversion is an I/O concern; everything past the reader
/// sees RGB24 only.
#[derive(Clone, Debug, PartialEq)]
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
            "pixel buffer length must be width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
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

    /// Position of this frame in the clip, assigned by the reader.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The pixel at (x, y), as a `channels`-long slice.
    ///
    /// Returns `None` when the coordinate lies outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        Some(&self.data[start..start + c])
    }

    /// (height, width, channels) view for tensor preprocessing.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("pixel buffer length must match frame dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("pixel buffer length must match frame dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_accessors() {
        let frame = Frame::new(vec![0; 2 * 4 * 3], 4, 2, 3, 7);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.data().len(), 24);
    }

    #[test]
    fn test_pixel_lookup() {
        let mut frame = solid_frame(3, 3, [10, 20, 30]);
        assert_eq!(frame.pixel(0, 0), Some(&[10, 20, 30][..]));

        // Paint (2, 1) and read it back.
        let offset = (3 + 2) * 3;
        frame.data_mut()[offset..offset + 3].copy_from_slice(&[1, 2, 3]);
        assert_eq!(frame.pixel(2, 1), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn test_pixel_out_of_bounds_is_none() {
        let frame = solid_frame(3, 3, [0, 0, 0]);
        assert_eq!(frame.pixel(3, 0), None);
        assert_eq!(frame.pixel(0, 3), None);
    }

    #[test]
    fn test_ndarray_view_shape_and_access() {
        let mut data = vec![0u8; 2 * 2 * 3];
        data[9] = 200; // row 1, col 1, R
        let frame = Frame::new(data, 2, 2, 3, 0);
        let view = frame.as_ndarray();
        assert_eq!(view.shape(), &[2, 2, 3]);
        assert_eq!(view[[1, 1, 0]], 200);
    }

    #[test]
    fn test_ndarray_mut_writes_through() {
        let mut frame = Frame::new(vec![0u8; 12], 2, 2, 3, 0);
        frame.as_ndarray_mut()[[0, 1, 2]] = 99;
        assert_eq!(frame.pixel(1, 0), Some(&[0, 0, 99][..]));
    }

    #[test]
    fn test_clones_do_not_share_buffers() {
        let frame = solid_frame(2, 2, [5, 5, 5]);
        let mut other = frame.clone();
        other.data_mut()[0] = 0;
        assert_eq!(frame.data()[0], 5);
    }

    #[test]
    #[should_panic(expected = "pixel buffer length")]
    fn test_wrong_buffer_length_panics_in_debug() {
        Frame::new(vec![0u8; 11], 2, 2, 3, 0);
    }
}

use crate::config::{DEFAULT_INPUT_SIZE, LETTERBOX_COLOR};
use crate::{Preprocess, PreprocessResult};
use common::{span, span_debug};
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::{Array, IxDyn};
use std::default::Default;

pub struct CpuPreProcessor {
    pub input_size: (u32, u32),
    resizer: Resizer,
    letterboxed_buffer: Vec<u8>,
}

impl CpuPreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        let buffer_len = input_size.0 as usize * input_size.1 as usize * 3;
        Self {
            input_size,
            resizer: Resizer::new(),
            letterboxed_buffer: vec![LETTERBOX_COLOR; buffer_len],
        }
    }

    pub fn preprocess_rgb(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<(Array<f32, IxDyn>, f32, f32, f32)> {
        let _s = span!("preprocess_rgb");

        tracing::trace!(
            width,
            height,
            pixel_bytes = pixels.len(),
            "Preprocessing image dimensions"
        );

        if width == 0 || height == 0 {
            anyhow::bail!("Cannot preprocess empty image ({}x{})", width, height);
        }
        if self.input_size.0 == 0 || self.input_size.1 == 0 {
            anyhow::bail!(
                "Invalid network input size {}x{}",
                self.input_size.0,
                self.input_size.1
            );
        }

        let expected_size = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                pixels.len()
            );
        }

        let (scale, offset_x, offset_y) = self.resize_and_letterbox(pixels, width, height)?;

        let input = self.normalize()?;

        Ok((input, scale, offset_x, offset_y))
    }

    fn resize_and_letterbox(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<(f32, f32, f32)> {
        let _s = span!("resize_and_letterbox");

        let scale =
            (self.input_size.0 as f32 / width as f32).min(self.input_size.1 as f32 / height as f32);
        // Very thin images can round down to zero on the short side
        let new_width = ((width as f32 * scale) as u32).clamp(1, self.input_size.0);
        let new_height = ((height as f32 * scale) as u32).clamp(1, self.input_size.1);

        let offset_x = (self.input_size.0 - new_width) / 2;
        let offset_y = (self.input_size.1 - new_height) / 2;

        let src = ImageRef::new(width, height, pixels, PixelType::U8x3)?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        self.resizer.resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let stride = self.input_size.0 * 3;
        let row_bytes = (new_width * 3) as usize;

        for y in 0..new_height {
            let src_row = (y * new_width * 3) as usize;
            let dst_row = ((y + offset_y) * stride + offset_x * 3) as usize;

            self.letterboxed_buffer[dst_row..dst_row + row_bytes]
                .copy_from_slice(&resized_data[src_row..src_row + row_bytes]);
        }

        Ok((scale, offset_x as f32, offset_y as f32))
    }

    /// HWC u8 letterbox buffer into NCHW f32 in `0.0..=1.0`
    fn normalize(&self) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span_debug!("normalize");

        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            output[i] = px[0] as f32 / 255.0;
            output[i + spatial] = px[1] as f32 / 255.0;
            output[i + 2 * spatial] = px[2] as f32 / 255.0;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}

impl Default for CpuPreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl Preprocess for CpuPreProcessor {
    fn preprocess(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<PreprocessResult> {
        let (data, scale, offset_x, offset_y) = self.preprocess_rgb(pixels, width, height)?;
        Ok(PreprocessResult {
            data,
            scale,
            offset_x,
            offset_y,
        })
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test RGB preprocessing
    #[test]
    fn test_rgb_preprocessing() {
        let pixels = vec![
            255, 0, 0, // Red pixel
            0, 255, 0, // Green pixel
            0, 0, 255, // Blue pixel
            255, 255, 255, // White pixel
        ];

        let mut preprocessor = CpuPreProcessor::default();
        let result = preprocessor.preprocess_rgb(&pixels, 2, 2);

        assert!(result.is_ok(), "RGB preprocessing should succeed");
        let (output, _, _, _) = result.unwrap();
        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    /// Test buffer size mismatch detection
    #[test]
    fn test_buffer_size_mismatch_detection() {
        let pixels = vec![0u8; 200]; // Wrong size for 10x10

        let mut preprocessor = CpuPreProcessor::default();
        let result = preprocessor.preprocess_rgb(&pixels, 10, 10);

        assert!(result.is_err(), "Size mismatch should return error");
        assert!(
            result.unwrap_err().to_string().contains("mismatch"),
            "Error should mention mismatch"
        );
    }

    #[test]
    fn test_zero_sized_image_rejected() {
        let mut preprocessor = CpuPreProcessor::default();
        let result = preprocessor.preprocess_rgb(&[], 0, 10);
        assert!(result.is_err(), "Zero width should be rejected");
    }

    /// Test letterboxing preserves aspect ratio
    #[test]
    fn test_letterboxing_preserves_aspect_ratio() {
        // 800x600 image (4:3 aspect ratio)
        let pixels = vec![128u8; 800 * 600 * 3];

        let mut preprocessor = CpuPreProcessor::default();
        let (output, scale, offset_x, offset_y) =
            preprocessor.preprocess_rgb(&pixels, 800, 600).unwrap();

        // Scale should be min(640/800, 640/600) = 0.8
        assert_eq!(scale, 0.8, "Scale should preserve aspect ratio");

        // Resized dimensions: 800*0.8 = 640, 600*0.8 = 480
        // Offset Y: (640 - 480) / 2 = 80
        assert_eq!(offset_x, 0.0, "X offset should be 0 for wide image");
        assert_eq!(offset_y, 80.0, "Y offset should center vertically");

        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    /// Padding rows carry the letterbox gray, image rows carry the pixels
    #[test]
    fn test_padding_and_scaling_values() {
        let pixels = vec![255u8; 800 * 600 * 3];

        let mut preprocessor = CpuPreProcessor::default();
        let (output, _, _, _) = preprocessor.preprocess_rgb(&pixels, 800, 600).unwrap();

        let pad = LETTERBOX_COLOR as f32 / 255.0;
        for c in 0..3 {
            assert!(
                (output[[0, c, 10, 320]] - pad).abs() < 1e-6,
                "Top padding should be letterbox gray"
            );
            assert!(
                (output[[0, c, 630, 320]] - pad).abs() < 1e-6,
                "Bottom padding should be letterbox gray"
            );
            assert!(
                (output[[0, c, 320, 320]] - 1.0).abs() < 1e-6,
                "White pixels should normalize to 1.0"
            );
        }
    }

    /// Channel order stays RGB in the NCHW planes
    #[test]
    fn test_channel_planes_keep_rgb_order() {
        let mut pixels = Vec::with_capacity(4 * 4 * 3);
        for _ in 0..16 {
            pixels.extend_from_slice(&[255, 0, 0]);
        }

        let mut preprocessor = CpuPreProcessor::new((4, 4));
        let (output, scale, offset_x, offset_y) = preprocessor.preprocess_rgb(&pixels, 4, 4).unwrap();

        assert_eq!(scale, 1.0);
        assert_eq!((offset_x, offset_y), (0.0, 0.0));
        assert!((output[[0, 0, 1, 1]] - 1.0).abs() < 1e-6, "R plane");
        assert!(output[[0, 1, 1, 1]].abs() < 1e-6, "G plane");
        assert!(output[[0, 2, 1, 1]].abs() < 1e-6, "B plane");
    }

    #[test]
    fn test_zero_input_size_is_an_error() {
        let pixels = vec![0u8; 10 * 10 * 3];
        let mut preprocessor = CpuPreProcessor::new((0, 0));

        let err = preprocessor.preprocess_rgb(&pixels, 10, 10).unwrap_err();
        assert!(err.to_string().contains("input size"));
    }

    #[test]
    fn test_repeated_calls_reuse_buffers() {
        let mut preprocessor = CpuPreProcessor::new((64, 64));

        let wide = vec![200u8; 64 * 32 * 3];
        let (_, _, _, offset_y) = preprocessor.preprocess_rgb(&wide, 64, 32).unwrap();
        assert_eq!(offset_y, 16.0);

        // A square frame must not keep the previous call's padding content
        let square = vec![10u8; 64 * 64 * 3];
        let (output, _, _, offset_y) = preprocessor.preprocess_rgb(&square, 64, 64).unwrap();
        assert_eq!(offset_y, 0.0);
        assert!((output[[0, 0, 0, 0]] - 10.0 / 255.0).abs() < 1e-6);
    }

    /// Test the Preprocess trait implementation
    #[test]
    fn test_preprocess_trait() {
        let pixels = vec![128u8; 100 * 50 * 3];
        let mut preprocessor = CpuPreProcessor::default();

        let result = preprocessor.preprocess(&pixels, 100, 50).unwrap();
        assert_eq!(result.scale, 6.4);
        assert_eq!(result.offset_x, 0.0);
        assert_eq!(result.offset_y, 160.0);
        assert_eq!(preprocessor.input_size(), (640, 640));
    }
}

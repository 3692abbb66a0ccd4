//! Icon generation.

use image::{Rgb, RgbImage};

use crate::error::EvalError;

/// Produces a reduced-resolution copy of an image by discarding `depth`
/// levels of wavelet detail.
pub trait IconCoder {
	fn get_small_copy(&self, image: &RgbImage, depth: u32) -> Result<RgbImage, EvalError>;
}

impl<C: IconCoder + ?Sized> IconCoder for &C {
	fn get_small_copy(&self, image: &RgbImage, depth: u32) -> Result<RgbImage, EvalError> {
		(**self).get_small_copy(image, depth)
	}
}

/// Keeps the Haar approximation band only.
///
/// Each level halves both sides; a trailing odd row or column is dropped. The
/// band is rescaled back to the pixel range, so every icon pixel is the mean of
/// the `2^depth x 2^depth` block it covers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaarCoder;

impl IconCoder for HaarCoder {
	fn get_small_copy(&self, image: &RgbImage, depth: u32) -> Result<RgbImage, EvalError> {
		let (mut width, mut height) = image.dimensions();
		let mut plane: Vec<[f32; 3]> = image
			.pixels()
			.map(|Rgb([r, g, b])| [*r as f32, *g as f32, *b as f32])
			.collect();

		for level in 0..depth {
			let (half_width, half_height) = (width / 2, height / 2);
			if half_width == 0 || half_height == 0 {
				return Err(EvalError::Coder(format!(
					"a {}x{} image cannot be reduced {depth} levels (exhausted at level {level})",
					image.width(),
					image.height()
				)));
			}

			plane = approximation_band(
				&plane,
				width as usize,
				half_width as usize,
				half_height as usize,
			);
			width = half_width;
			height = half_height;
		}

		let mut icon = RgbImage::new(width, height);
		for (pixel, value) in icon.pixels_mut().zip(plane.iter().copied()) {
			*pixel = Rgb(value.map(|channel| channel.round().clamp(0.0, 255.0) as u8));
		}
		Ok(icon)
	}
}

fn approximation_band(
	plane: &[[f32; 3]],
	width: usize,
	half_width: usize,
	half_height: usize,
) -> Vec<[f32; 3]> {
	let mut band = Vec::with_capacity(half_width * half_height);
	for y in 0..half_height {
		for x in 0..half_width {
			let top = 2 * y * width + 2 * x;
			let bottom = top + width;
			let quad = [plane[top], plane[top + 1], plane[bottom], plane[bottom + 1]];

			band.push(std::array::from_fn(|channel| {
				quad.iter().map(|pixel| pixel[channel]).sum::<f32>() / 4.0
			}));
		}
	}
	band
}

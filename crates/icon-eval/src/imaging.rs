//! Image loading and resizing.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::classifier::InputShape;
use crate::error::EvalError;

/// Resampling algorithm used to bring images to the classifier shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
	/// Box sampling over the covered source area. Suited to shrinking.
	#[default]
	Area,
	Nearest,
	Linear,
	Cubic,
	Lanczos3,
}

impl Interpolation {
	fn filter(self) -> Option<FilterType> {
		match self {
			Interpolation::Area => None,
			Interpolation::Nearest => Some(FilterType::Nearest),
			Interpolation::Linear => Some(FilterType::Triangle),
			Interpolation::Cubic => Some(FilterType::CatmullRom),
			Interpolation::Lanczos3 => Some(FilterType::Lanczos3),
		}
	}
}

/// Loads an image file as 8-bit RGB.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage, EvalError> {
	let path = path.as_ref();
	let image = image::open(path).map_err(|source| EvalError::ImageLoad {
		path: path.to_path_buf(),
		source,
	})?;

	Ok(image.to_rgb8())
}

/// Resizes `image` to exactly `shape`.
pub fn resize(image: &RgbImage, shape: InputShape, interpolation: Interpolation) -> RgbImage {
	if (image.height(), image.width()) == shape.as_tuple() {
		return image.clone();
	}

	match interpolation.filter() {
		Some(filter) => imageops::resize(image, shape.width, shape.height, filter),
		None => imageops::thumbnail(image, shape.width, shape.height),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::solid_image;
	use image::Rgb;
	use tempfile::tempdir;

	#[test]
	fn resizes_to_exact_shape_with_every_interpolation() {
		let image = solid_image(300, 200, Rgb([10, 20, 30]));
		let shape = InputShape::new(224, 224);

		for interpolation in [
			Interpolation::Area,
			Interpolation::Nearest,
			Interpolation::Linear,
			Interpolation::Cubic,
			Interpolation::Lanczos3,
		] {
			let resized = resize(&image, shape, interpolation);
			assert_eq!((resized.height(), resized.width()), (224, 224), "{interpolation:?}");
		}
	}

	#[test]
	fn area_averages_blocks_when_shrinking() {
		let mut image = RgbImage::new(4, 2);
		for (x, _, pixel) in image.enumerate_pixels_mut() {
			*pixel = if x < 2 { Rgb([0, 0, 0]) } else { Rgb([200, 100, 50]) };
		}

		let resized = resize(&image, InputShape::new(1, 2), Interpolation::Area);

		assert_eq!(resized.get_pixel(0, 0), &Rgb([0, 0, 0]));
		assert_eq!(resized.get_pixel(1, 0), &Rgb([200, 100, 50]));
	}

	#[test]
	fn area_upscales_icons() {
		let icon = solid_image(56, 56, Rgb([90, 90, 90]));
		let resized = resize(&icon, InputShape::default(), Interpolation::Area);

		assert_eq!((resized.height(), resized.width()), (224, 224));
	}

	#[test]
	fn loads_rgb_from_disk() {
		let folder = tempdir().unwrap();
		let path = folder.path().join("dot.png");
		solid_image(3, 5, Rgb([1, 2, 3])).save(&path).unwrap();

		let loaded = load_image(&path).unwrap();

		assert_eq!((loaded.width(), loaded.height()), (3, 5));
		assert_eq!(loaded.get_pixel(2, 4), &Rgb([1, 2, 3]));
	}

	#[test]
	fn missing_file_is_a_load_error() {
		let result = load_image("/no/such/image.jpg");
		assert!(matches!(result, Err(EvalError::ImageLoad { .. })));
	}
}

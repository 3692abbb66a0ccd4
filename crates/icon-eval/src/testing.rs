//! Deterministic doubles shared by the unit tests.

use std::sync::{Arc, Mutex};

use burn::backend::NdArray;
use burn::prelude::Tensor;
use burn::tensor::activation::softmax;
use image::{Rgb, RgbImage};
use simple_logger::SimpleLogger;

use crate::classifier::{Classifier, Companions, ImageModel, InputShape};
use crate::coder::IconCoder;
use crate::error::EvalError;
use crate::topk::{decode_top_k, ClassLabels};

pub type TestBackend = NdArray<f32>;

pub const COLOR_LABELS: [&str; 6] = ["red", "green", "blue", "cyan", "magenta", "yellow"];

pub fn init_logger() {
	let _ = SimpleLogger::new().init();
}

/// Input shapes seen by a [`ColorMeanModel`].
#[derive(Debug, Clone, Default)]
pub struct RecordedShapes(Arc<Mutex<Vec<[usize; 4]>>>);

impl RecordedShapes {
	pub fn shapes(&self) -> Vec<[usize; 4]> {
		self.0.lock().unwrap().clone()
	}
}

/// Scores each channel by its mean and its negated mean.
#[derive(Debug, Default)]
pub struct ColorMeanModel {
	recorded: RecordedShapes,
}

impl ImageModel<TestBackend> for ColorMeanModel {
	fn infer(&self, input: Tensor<TestBackend, 4>) -> Result<Tensor<TestBackend, 2>, EvalError> {
		let dims = input.dims();
		self.recorded.0.lock().unwrap().push(dims);

		let means: Tensor<TestBackend, 2> = input.mean_dim(3).mean_dim(2).reshape([dims[0], 3]);
		Ok(Tensor::cat(vec![means.clone(), means.neg()], 1))
	}
}

pub fn test_companions() -> Companions<TestBackend> {
	let labels = Arc::new(ClassLabels::from_pairs(
		COLOR_LABELS
			.iter()
			.enumerate()
			.map(|(idx, label)| (format!("c{idx}"), label.to_string()))
			.collect(),
	));

	Companions {
		preprocess: Arc::new(|batch: Tensor<TestBackend, 4>| {
			Ok::<_, EvalError>(batch.permute([0, 3, 1, 2]).div_scalar(255.0))
		}),
		decode: Arc::new(move |output: Tensor<TestBackend, 2>, top: usize| {
			decode_top_k(softmax(output, 1), top, &labels)
		}),
	}
}

pub fn color_classifier(shape: (u32, u32)) -> (Classifier<TestBackend>, RecordedShapes) {
	let recorded = RecordedShapes::default();
	let model = ColorMeanModel {
		recorded: recorded.clone(),
	};
	let classifier = Classifier::new(
		"color-mean",
		Box::new(model),
		test_companions(),
		InputShape::from(shape),
		Default::default(),
	);
	(classifier, recorded)
}

pub fn solid_image(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
	RgbImage::from_pixel(width, height, color)
}

/// Coder that returns a fixed-size copy and remembers what it was asked.
#[derive(Debug)]
pub struct FixedSizeCoder {
	width: u32,
	height: u32,
	requests: Mutex<Vec<((u32, u32), u32)>>,
}

impl FixedSizeCoder {
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			width,
			height,
			requests: Mutex::new(Vec::new()),
		}
	}

	/// `(source dimensions, depth)` of every call.
	pub fn requests(&self) -> Vec<((u32, u32), u32)> {
		self.requests.lock().unwrap().clone()
	}
}

impl IconCoder for FixedSizeCoder {
	fn get_small_copy(&self, image: &RgbImage, depth: u32) -> Result<RgbImage, EvalError> {
		self.requests.lock().unwrap().push((image.dimensions(), depth));
		Ok(image::imageops::thumbnail(image, self.width, self.height))
	}
}

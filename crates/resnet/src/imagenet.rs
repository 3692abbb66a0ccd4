//! ImageNet companions: torchvision preprocessing and labelled top-k decoding.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use burn::prelude::{Backend, Device, Tensor};
use burn::tensor::activation::softmax;
use icon_eval::{decode_top_k, ClassLabels, Companions, EvalError};

use crate::weights::{cached_download, IMAGENET_CLASSES};

/// Keras class index: `{"0": ["n01440764", "tench"], ...}`.
pub const CLASS_INDEX_URL: &str =
	"https://storage.googleapis.com/download.tensorflow.org/data/imagenet_class_index.json";

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Per-channel ImageNet normalisation of `[batch, 3, height, width]` tensors in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Normalizer<B: Backend> {
	pub mean: Tensor<B, 4>,
	pub std: Tensor<B, 4>,
}

impl<B: Backend> Normalizer<B> {
	pub fn new(device: &Device<B>) -> Self {
		let mean = Tensor::<B, 1>::from_floats(MEAN, device).reshape([1, 3, 1, 1]);
		let std = Tensor::<B, 1>::from_floats(STD, device).reshape([1, 3, 1, 1]);

		Self { mean, std }
	}

	pub fn normalize(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		(input - self.mean.clone()) / self.std.clone()
	}
}

/// Parses the Keras class index into labels ordered by output column.
pub fn parse_class_index(json: &str) -> Result<ClassLabels, EvalError> {
	let index: HashMap<String, (String, String)> = serde_json::from_str(json)
		.map_err(|err| EvalError::Configuration(format!("malformed ImageNet class index: {err}")))?;

	let entries = (0..index.len())
		.map(|column| {
			index
				.get(&column.to_string())
				.cloned()
				.ok_or_else(|| {
					EvalError::Configuration(format!("ImageNet class index has no entry {column}"))
				})
		})
		.collect::<Result<Vec<_>, _>>()?;

	Ok(ClassLabels::from_pairs(entries))
}

/// Downloads (once) and parses the ImageNet class index.
pub fn load_class_labels() -> Result<ClassLabels, EvalError> {
	let path = cached_download(CLASS_INDEX_URL)?;
	let labels = parse_class_index(&fs::read_to_string(path)?)?;

	if labels.len() != IMAGENET_CLASSES {
		return Err(EvalError::Configuration(format!(
			"ImageNet class index lists {} classes, expected {IMAGENET_CLASSES}",
			labels.len()
		)));
	}

	Ok(labels)
}

/// Companion loader registered for the ResNet family.
pub fn companions<B: Backend>(device: &Device<B>) -> Result<Companions<B>, EvalError> {
	Ok(companions_with_labels(load_class_labels()?, device))
}

/// Channel-last pixels to normalised channel-first input; softmax then top-k.
pub fn companions_with_labels<B: Backend>(
	labels: ClassLabels,
	device: &Device<B>,
) -> Companions<B> {
	let normalizer = Normalizer::new(device);
	let labels = Arc::new(labels);

	Companions {
		preprocess: Arc::new(move |batch: Tensor<B, 4>| {
			let x = batch.permute([0, 3, 1, 2]).div_scalar(255.0);
			Ok::<_, EvalError>(normalizer.normalize(x))
		}),
		decode: Arc::new(move |logits: Tensor<B, 2>, top: usize| {
			decode_top_k(softmax(logits, 1), top, &labels)
		}),
	}
}

//! Classifier adapter.
//!
//! Every model family exposes its own preprocessing and decoding helpers. A
//! [`FamilyRegistry`] maps a family identifier to a loader for those helpers so
//! that [`load_classifier`] can pair any [`ModelFactory`] with the right
//! companions and hand back one uniform [`Classifier`].

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use burn::prelude::{Backend, Device, Tensor};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::prediction::PredictionList;

/// Spatial input size a classifier expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
	pub height: u32,
	pub width: u32,
}

impl InputShape {
	pub fn new(height: u32, width: u32) -> Self {
		Self { height, width }
	}

	pub fn as_tuple(&self) -> (u32, u32) {
		(self.height, self.width)
	}
}

impl Default for InputShape {
	fn default() -> Self {
		Self::new(224, 224)
	}
}

impl From<(u32, u32)> for InputShape {
	fn from((height, width): (u32, u32)) -> Self {
		Self::new(height, width)
	}
}

/// An inference model callable on a batch of preprocessed images.
pub trait ImageModel<B: Backend> {
	/// Maps a `[batch, ...]` input to `[batch, classes]` scores.
	fn infer(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 2>, EvalError>;
}

/// Turns a raw `[batch, height, width, 3]` pixel batch (values in `0..=255`)
/// into the tensor the model consumes.
pub type PreprocessFn<B> = Arc<dyn Fn(Tensor<B, 4>) -> Result<Tensor<B, 4>, EvalError>>;

/// Turns raw model output and a top-k count into one prediction list per batch row.
pub type DecodeFn<B> = Arc<dyn Fn(Tensor<B, 2>, usize) -> Result<Vec<PredictionList>, EvalError>>;

/// Preprocessing and decoding helpers shared by every model of a family.
pub struct Companions<B: Backend> {
	pub preprocess: PreprocessFn<B>,
	pub decode: DecodeFn<B>,
}

impl<B: Backend> Clone for Companions<B> {
	fn clone(&self) -> Self {
		Self {
			preprocess: Arc::clone(&self.preprocess),
			decode: Arc::clone(&self.decode),
		}
	}
}

type CompanionLoader<B> = Box<dyn Fn(&Device<B>) -> Result<Companions<B>, EvalError>>;

/// Family identifier to companion loader.
pub struct FamilyRegistry<B: Backend> {
	families: HashMap<String, CompanionLoader<B>>,
}

impl<B: Backend> FamilyRegistry<B> {
	pub fn new() -> Self {
		Self {
			families: HashMap::new(),
		}
	}

	/// Registers the companion loader of a family, replacing any previous one.
	pub fn register<F>(&mut self, family: impl Into<String>, loader: F)
	where
		F: Fn(&Device<B>) -> Result<Companions<B>, EvalError> + 'static,
	{
		self.families.insert(family.into(), Box::new(loader));
	}

	pub fn contains(&self, family: &str) -> bool {
		self.families.contains_key(family)
	}

	pub fn companions(&self, family: &str, device: &Device<B>) -> Result<Companions<B>, EvalError> {
		let loader = self
			.families
			.get(family)
			.ok_or_else(|| EvalError::UnknownFamily(family.to_string()))?;
		loader(device)
	}
}

impl<B: Backend> Default for FamilyRegistry<B> {
	fn default() -> Self {
		Self::new()
	}
}

/// Where a model's weights come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsSource {
	/// Pretrained ImageNet weights, downloaded and cached on first use.
	ImageNet,
	/// Random initialisation.
	Random,
	/// A weights file on disk.
	File(PathBuf),
}

impl FromStr for WeightsSource {
	type Err = EvalError;

	fn from_str(weights: &str) -> Result<Self, Self::Err> {
		match weights {
			"imagenet" => Ok(WeightsSource::ImageNet),
			"none" | "" => Ok(WeightsSource::Random),
			path => {
				let path = PathBuf::from(path);
				if path.is_file() {
					Ok(WeightsSource::File(path))
				} else {
					Err(EvalError::Weights(format!(
						"`{weights}` is neither `imagenet`, `none` nor an existing weights file"
					)))
				}
			}
		}
	}
}

/// Builds inference models of one family.
pub trait ModelFactory<B: Backend> {
	/// Identifier used to look up the companions in a [`FamilyRegistry`].
	fn family(&self) -> &str;

	/// Human readable model name, used in logs.
	fn name(&self) -> &str;

	fn build(
		&self,
		weights: &WeightsSource,
		device: &Device<B>,
	) -> Result<Box<dyn ImageModel<B>>, EvalError>;
}

/// A ready-to-use classifier: model, companions and input shape.
pub struct Classifier<B: Backend> {
	name: String,
	model: Box<dyn ImageModel<B>>,
	preprocess: PreprocessFn<B>,
	decode: DecodeFn<B>,
	shape: InputShape,
	device: Device<B>,
}

impl<B: Backend> Classifier<B> {
	pub fn new(
		name: impl Into<String>,
		model: Box<dyn ImageModel<B>>,
		companions: Companions<B>,
		shape: InputShape,
		device: Device<B>,
	) -> Self {
		Self {
			name: name.into(),
			model,
			preprocess: companions.preprocess,
			decode: companions.decode,
			shape,
			device,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn model(&self) -> &dyn ImageModel<B> {
		self.model.as_ref()
	}

	pub fn preprocess(&self, batch: Tensor<B, 4>) -> Result<Tensor<B, 4>, EvalError> {
		(self.preprocess)(batch)
	}

	pub fn decode(
		&self,
		output: Tensor<B, 2>,
		top: usize,
	) -> Result<Vec<PredictionList>, EvalError> {
		(self.decode)(output, top)
	}

	pub fn shape(&self) -> InputShape {
		self.shape
	}

	pub fn device(&self) -> &Device<B> {
		&self.device
	}
}

impl<B: Backend> fmt::Debug for Classifier<B> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Classifier")
			.field("name", &self.name)
			.field("shape", &self.shape)
			.finish_non_exhaustive()
	}
}

/// Loads a classifier, returning `None` when anything goes wrong.
///
/// Model construction may download weights, and backends or downloaders may
/// panic instead of returning errors. Both are caught here and logged, so the
/// caller only has to check for `None`.
pub fn load_classifier<B: Backend, F: ModelFactory<B> + ?Sized>(
	factory: &F,
	registry: &FamilyRegistry<B>,
	shape: InputShape,
	weights: &str,
	device: &Device<B>,
) -> Option<Classifier<B>> {
	let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
		try_load_classifier(factory, registry, shape, weights, device)
	}));

	match attempt {
		Ok(Ok(classifier)) => {
			debug!("Loaded {} with input shape {:?}", classifier.name(), shape);
			Some(classifier)
		}
		Ok(Err(err)) => {
			error!("Error loading {}: {}", factory.name(), error_chain(&err));
			None
		}
		Err(payload) => {
			error!("Error loading {}: {}", factory.name(), panic_message(payload.as_ref()));
			None
		}
	}
}

fn try_load_classifier<B: Backend, F: ModelFactory<B> + ?Sized>(
	factory: &F,
	registry: &FamilyRegistry<B>,
	shape: InputShape,
	weights: &str,
	device: &Device<B>,
) -> Result<Classifier<B>, EvalError> {
	if shape.height == 0 || shape.width == 0 {
		return Err(EvalError::Configuration(format!("input shape {shape:?} has a zero side")));
	}

	let weights = weights.parse::<WeightsSource>()?;
	let model = factory.build(&weights, device)?;
	let companions = registry.companions(factory.family(), device)?;

	Ok(Classifier::new(factory.name(), model, companions, shape, device.clone()))
}

fn error_chain(err: &dyn std::error::Error) -> String {
	let mut message = err.to_string();
	let mut source = err.source();
	while let Some(cause) = source {
		message.push_str(&format!(": {cause}"));
		source = cause.source();
	}
	message
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message.to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"model construction panicked".to_string()
	}
}

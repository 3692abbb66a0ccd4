use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::nn::conv::Conv2d;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Device};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::Tensor;
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use icon_eval::{EvalError, ImageModel};
use log::info;
use serde::{Deserialize, Serialize};

use crate::block::{conv, Stage};
use crate::weights::Weights;

/// Torchvision ResNet variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
	ResNet18,
	ResNet34,
	ResNet50,
	ResNet101,
	ResNet152,
}

impl Depth {
	/// Residual units in each of the four stages.
	pub fn blocks(self) -> [usize; 4] {
		match self {
			Depth::ResNet18 => [2, 2, 2, 2],
			Depth::ResNet34 | Depth::ResNet50 => [3, 4, 6, 3],
			Depth::ResNet101 => [3, 4, 23, 3],
			Depth::ResNet152 => [3, 8, 36, 3],
		}
	}

	pub fn bottleneck(self) -> bool {
		!matches!(self, Depth::ResNet18 | Depth::ResNet34)
	}

	pub fn name(self) -> &'static str {
		match self {
			Depth::ResNet18 => "resnet18",
			Depth::ResNet34 => "resnet34",
			Depth::ResNet50 => "resnet50",
			Depth::ResNet101 => "resnet101",
			Depth::ResNet152 => "resnet152",
		}
	}
}

#[derive(Debug, Module)]
pub struct ResNet<B: Backend> {
	pub(crate) conv1: Conv2d<B>,
	pub(crate) bn1: BatchNorm<B, 2>,
	pub(crate) relu: Relu,
	pub(crate) maxpool: MaxPool2d,
	pub(crate) layer1: Stage<B>,
	pub(crate) layer2: Stage<B>,
	pub(crate) layer3: Stage<B>,
	pub(crate) layer4: Stage<B>,
	pub(crate) avgpool: AdaptiveAvgPool2d,
	pub(crate) fc: Linear<B>,
}

impl<B: Backend> ResNet<B> {
	/// Randomly initialised network.
	pub fn new(depth: Depth, num_classes: usize, device: &Device<B>) -> Self {
		let [b1, b2, b3, b4] = depth.blocks();
		let bottleneck = depth.bottleneck();
		let expansion = if bottleneck { 4 } else { 1 };

		Self {
			// 7x7 conv, 64, /2
			conv1: conv([3, 64], 7, 2, device),
			bn1: BatchNormConfig::new(64).init(device),
			relu: Relu::new(),
			// 3x3 maxpool, /2
			maxpool: MaxPool2dConfig::new([3, 3])
				.with_strides([2, 2])
				.with_padding(PaddingConfig2d::Explicit(1, 1))
				.init(),
			layer1: Stage::new(b1, 64, 64 * expansion, 1, bottleneck, device),
			layer2: Stage::new(b2, 64 * expansion, 128 * expansion, 2, bottleneck, device),
			layer3: Stage::new(b3, 128 * expansion, 256 * expansion, 2, bottleneck, device),
			layer4: Stage::new(b4, 256 * expansion, 512 * expansion, 2, bottleneck, device),
			avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
			fc: LinearConfig::new(512 * expansion, num_classes).init(device),
		}
	}

	/// ImageNet-1k weights published by torchvision, downloaded on first use.
	pub fn pretrained(depth: Depth, device: &Device<B>) -> Result<Self, EvalError> {
		let weights = Weights::imagenet(depth);
		let path = weights.download()?;
		Self::from_file(depth, weights.num_classes, &path, device)
	}

	/// Network with weights read from a torchvision state dict file.
	pub fn from_file<P: AsRef<Path>>(
		depth: Depth,
		num_classes: usize,
		path: P,
		device: &Device<B>,
	) -> Result<Self, EvalError> {
		let path = path.as_ref().to_path_buf();
		info!("Loading {} weights from {path:?}", depth.name());

		let record = Self::load_weights_record(path, device)?;
		Ok(Self::new(depth, num_classes, device).load_record(record))
	}

	fn load_weights_record(
		path: PathBuf,
		device: &Device<B>,
	) -> Result<ResNetRecord<B>, EvalError> {
		let load_args = LoadArgs::new(path)
			// Map *.downsample.0.* -> *.downsample.conv.*
			.with_key_remap("(.+)\\.downsample\\.0\\.(.+)", "$1.downsample.conv.$2")
			// Map *.downsample.1.* -> *.downsample.bn.*
			.with_key_remap("(.+)\\.downsample\\.1\\.(.+)", "$1.downsample.bn.$2")
			// Map layer[i].[j].* -> layer[i].blocks.[j].*
			.with_key_remap("(layer[1-4])\\.([0-9]+)\\.(.+)", "$1.blocks.$2.$3");

		PyTorchFileRecorder::<FullPrecisionSettings>::new()
			.load(load_args, device)
			.map_err(|err| EvalError::Weights(format!("could not read state dict: {err:?}")))
	}

	/// `[batch, 3, height, width]` normalised images to `[batch, classes]` logits.
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
		let x = self.conv1.forward(input);
		let x = self.relu.forward(self.bn1.forward(x));
		let x = self.maxpool.forward(x);

		let x = self.layer1.forward(x);
		let x = self.layer2.forward(x);
		let x = self.layer3.forward(x);
		let x = self.layer4.forward(x);

		let x = self.avgpool.forward(x);
		let x: Tensor<B, 2> = x.flatten(1, 3);

		self.fc.forward(x)
	}
}

impl<B: Backend> ImageModel<B> for ResNet<B> {
	fn infer(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 2>, EvalError> {
		let [_, channels, height, width] = input.dims();
		if channels != 3 {
			return Err(EvalError::Inference(format!(
				"ResNet expects 3 input channels, got {channels} (input {height}x{width})"
			)));
		}

		Ok(self.forward(input))
	}
}

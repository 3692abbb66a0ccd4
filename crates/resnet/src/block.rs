use std::f64::consts::SQRT_2;

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Initializer, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Device, Module, Tensor};

/// Residual unit.
///
/// Basic units stack two 3x3 convolutions. Bottleneck units squeeze through a
/// 1x1, 3x3, 1x1 sequence and carry the extra `conv3`/`bn3` pair. Field names
/// follow the torchvision state dict so pretrained weights map onto them.
#[derive(Debug, Module)]
pub struct Residual<B: Backend> {
	pub(crate) conv1: Conv2d<B>,
	pub(crate) bn1: BatchNorm<B, 2>,
	pub(crate) conv2: Conv2d<B>,
	pub(crate) bn2: BatchNorm<B, 2>,
	pub(crate) conv3: Option<Conv2d<B>>,
	pub(crate) bn3: Option<BatchNorm<B, 2>>,
	pub(crate) downsample: Option<Downsample<B>>,
	pub(crate) relu: Relu,
}

impl<B: Backend> Residual<B> {
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		let identity = match &self.downsample {
			Some(downsample) => downsample.forward(input.clone()),
			None => input.clone(),
		};

		let x = self.conv1.forward(input);
		let x = self.relu.forward(self.bn1.forward(x));
		let x = self.bn2.forward(self.conv2.forward(x));

		let x = match (&self.conv3, &self.bn3) {
			(Some(conv3), Some(bn3)) => bn3.forward(conv3.forward(self.relu.forward(x))),
			_ => x,
		};

		self.relu.forward(x + identity)
	}
}

/// 1x1 projection of the skip path when shape changes.
#[derive(Debug, Module)]
pub struct Downsample<B: Backend> {
	pub(crate) conv: Conv2d<B>,
	pub(crate) bn: BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		self.bn.forward(self.conv.forward(input))
	}
}

/// One of the four `layerN` groups.
#[derive(Debug, Module)]
pub struct Stage<B: Backend> {
	pub(crate) blocks: Vec<Residual<B>>,
}

impl<B: Backend> Stage<B> {
	pub fn new(
		num_blocks: usize,
		in_channels: usize,
		out_channels: usize,
		stride: usize,
		bottleneck: bool,
		device: &Device<B>,
	) -> Self {
		let blocks = (0..num_blocks)
			.map(|idx| {
				// only the first unit changes resolution and width
				if idx == 0 {
					residual(in_channels, out_channels, stride, bottleneck, device)
				} else {
					residual(out_channels, out_channels, 1, bottleneck, device)
				}
			})
			.collect();

		Self { blocks }
	}

	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		self.blocks.iter().fold(input, |x, block| block.forward(x))
	}
}

fn residual<B: Backend>(
	in_channels: usize,
	out_channels: usize,
	stride: usize,
	bottleneck: bool,
	device: &Device<B>,
) -> Residual<B> {
	let downsample = (stride != 1 || in_channels != out_channels).then(|| Downsample {
		conv: conv([in_channels, out_channels], 1, stride, device),
		bn: BatchNormConfig::new(out_channels).init(device),
	});

	if bottleneck {
		// expansion = 4
		let width = out_channels / 4;
		Residual {
			conv1: conv([in_channels, width], 1, 1, device),
			bn1: BatchNormConfig::new(width).init(device),
			conv2: conv([width, width], 3, stride, device),
			bn2: BatchNormConfig::new(width).init(device),
			conv3: Some(conv([width, out_channels], 1, 1, device)),
			bn3: Some(BatchNormConfig::new(out_channels).init(device)),
			downsample,
			relu: Relu::new(),
		}
	} else {
		Residual {
			conv1: conv([in_channels, out_channels], 3, stride, device),
			bn1: BatchNormConfig::new(out_channels).init(device),
			conv2: conv([out_channels, out_channels], 3, 1, device),
			bn2: BatchNormConfig::new(out_channels).init(device),
			conv3: None,
			bn3: None,
			downsample,
			relu: Relu::new(),
		}
	}
}

/// Square, bias-free convolution with "same" padding for odd kernels.
pub(crate) fn conv<B: Backend>(
	channels: [usize; 2],
	kernel: usize,
	stride: usize,
	device: &Device<B>,
) -> Conv2d<B> {
	Conv2dConfig::new(channels, [kernel, kernel])
		.with_stride([stride, stride])
		.with_padding(PaddingConfig2d::Explicit(kernel / 2, kernel / 2))
		.with_bias(false)
		.with_initializer(Initializer::KaimingNormal {
			gain: SQRT_2, // recommended value for ReLU
			fan_out_only: true,
		})
		.init(device)
}

#[cfg(test)]
mod tests {
	use super::*;
	use burn::backend::NdArray;

	type TestBackend = NdArray<f32>;

	#[test]
	fn basic_stage_halves_resolution() {
		let device = Default::default();
		let stage = Stage::<TestBackend>::new(2, 8, 16, 2, false, &device);

		let output = stage.forward(Tensor::zeros([1, 8, 12, 12], &device));

		assert_eq!(output.dims(), [1, 16, 6, 6]);
		assert!(stage.blocks[0].downsample.is_some());
		assert!(stage.blocks[1].downsample.is_none());
		assert!(stage.blocks[0].conv3.is_none());
	}

	#[test]
	fn bottleneck_expands_channels() {
		let device = Default::default();
		let stage = Stage::<TestBackend>::new(2, 16, 64, 1, true, &device);

		let output = stage.forward(Tensor::zeros([2, 16, 5, 5], &device));

		assert_eq!(output.dims(), [2, 64, 5, 5]);
		assert!(stage.blocks[0].conv3.is_some());
		assert!(stage.blocks[0].downsample.is_some());
	}
}

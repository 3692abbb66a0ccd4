use burn::prelude::{Backend, Device};
use icon_eval::{EvalError, FamilyRegistry, ImageModel, ModelFactory, WeightsSource};

use crate::imagenet;
use crate::resnet::{Depth, ResNet};
use crate::weights::IMAGENET_CLASSES;

/// Registry identifier of the torchvision ResNet family.
pub const FAMILY: &str = "resnet";

/// Builds ResNets of one depth.
#[derive(Debug, Clone, Copy)]
pub struct ResNetFactory {
	depth: Depth,
}

impl ResNetFactory {
	pub fn new(depth: Depth) -> Self {
		Self { depth }
	}

	pub fn depth(&self) -> Depth {
		self.depth
	}
}

impl<B: Backend> ModelFactory<B> for ResNetFactory {
	fn family(&self) -> &str {
		FAMILY
	}

	fn name(&self) -> &str {
		self.depth.name()
	}

	fn build(
		&self,
		weights: &WeightsSource,
		device: &Device<B>,
	) -> Result<Box<dyn ImageModel<B>>, EvalError> {
		let model = match weights {
			WeightsSource::ImageNet => ResNet::pretrained(self.depth, device)?,
			WeightsSource::Random => ResNet::new(self.depth, IMAGENET_CLASSES, device),
			WeightsSource::File(path) => {
				ResNet::from_file(self.depth, IMAGENET_CLASSES, path, device)?
			}
		};

		Ok(Box::new(model))
	}
}

/// Adds the ResNet companions (ImageNet preprocessing and labels) to `registry`.
pub fn register<B: Backend>(registry: &mut FamilyRegistry<B>) {
	registry.register(FAMILY, imagenet::companions::<B>);
}

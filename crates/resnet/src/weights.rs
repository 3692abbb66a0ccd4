use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

use burn::data::network::downloader;
use icon_eval::EvalError;
use log::info;

use crate::resnet::Depth;

/// Number of ImageNet-1k classes.
pub const IMAGENET_CLASSES: usize = 1000;

pub struct Weights {
	pub url: &'static str,
	pub num_classes: usize,
}

impl Weights {
	/// Torchvision `IMAGENET1K_V1` weights.
	pub fn imagenet(depth: Depth) -> Self {
		let url = match depth {
			Depth::ResNet18 => "https://download.pytorch.org/models/resnet18-f37072fd.pth",
			Depth::ResNet34 => "https://download.pytorch.org/models/resnet34-b627a593.pth",
			Depth::ResNet50 => "https://download.pytorch.org/models/resnet50-0676ba61.pth",
			Depth::ResNet101 => "https://download.pytorch.org/models/resnet101-63fe2227.pth",
			Depth::ResNet152 => "https://download.pytorch.org/models/resnet152-394f9c45.pth",
		};

		Self {
			url,
			num_classes: IMAGENET_CLASSES,
		}
	}

	pub fn download(&self) -> Result<PathBuf, EvalError> {
		cached_download(self.url)
	}
}

/// `~/.cache/icon-eval`, created on demand.
pub fn cache_dir() -> Result<PathBuf, EvalError> {
	let dir = dirs::home_dir()
		.ok_or_else(|| EvalError::Configuration("could not locate the home directory".to_string()))?
		.join(".cache")
		.join("icon-eval");

	if !dir.exists() {
		create_dir_all(&dir)?;
	}

	Ok(dir)
}

/// Downloads `url` into the cache unless a copy is already there.
pub fn cached_download(url: &str) -> Result<PathBuf, EvalError> {
	let file_base_name = url
		.rsplit_once('/')
		.map(|(_, name)| name)
		.filter(|name| !name.is_empty())
		.ok_or_else(|| EvalError::Weights(format!("`{url}` does not name a file")))?;

	let file_name = cache_dir()?.join(file_base_name);
	if !file_name.exists() {
		info!("Downloading {url}");
		let bytes = downloader::download_file_as_bytes(url, file_base_name);

		// cache entries only appear once fully written
		let partial = file_name.with_extension("part");
		let mut output_file = File::create(&partial)?;
		output_file.write_all(&bytes)?;
		std::fs::rename(&partial, &file_name)?;
	}

	Ok(file_name)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_depth_has_imagenet_weights() {
		for depth in [
			Depth::ResNet18,
			Depth::ResNet34,
			Depth::ResNet50,
			Depth::ResNet101,
			Depth::ResNet152,
		] {
			let weights = Weights::imagenet(depth);
			assert!(weights.url.ends_with(".pth"));
			assert!(weights.url.contains(depth.name()));
			assert_eq!(weights.num_classes, IMAGENET_CLASSES);
		}
	}

	#[test]
	fn url_without_file_name_is_rejected() {
		assert!(matches!(cached_download("https://example.com/"), Err(EvalError::Weights(_))));
	}
}

use std::path::{Path, PathBuf};

use burn::config::Config;
use icon_eval::{EvalError, EvaluationOptions, FailurePolicy, InputShape, Interpolation};

use crate::resnet::Depth;

/// JSON run configuration of the `evaluate-icons` binary.
#[derive(Config, Debug)]
pub struct RunConfig {
	/// Folder whose entries are all evaluated.
	pub folder: PathBuf,
	#[config(default = "Depth::ResNet18")]
	pub model: Depth,
	/// `imagenet`, `none` or a path to a torchvision state dict.
	#[config(default = "String::from(\"imagenet\")")]
	pub weights: String,
	#[config(default = "InputShape::new(224, 224)")]
	pub shape: InputShape,
	/// Wavelet levels discarded to produce icons.
	#[config(default = 1)]
	pub depth: u32,
	#[config(default = 5)]
	pub top: usize,
	#[config(default = "Interpolation::Area")]
	pub interpolation: Interpolation,
	#[config(default = "FailurePolicy::Abort")]
	pub failure_policy: FailurePolicy,
	/// Where to write the JSON report.
	pub output: Option<PathBuf>,
}

impl RunConfig {
	/// Reads the configuration file at `path`.
	pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, EvalError> {
		let path = path.as_ref();
		<Self as Config>::load(path)
			.map_err(|err| EvalError::Configuration(format!("{path:?}: {err}")))
	}

	pub fn from_json(text: &str) -> Result<Self, EvalError> {
		Self::load_binary(text.as_bytes()).map_err(|err| EvalError::Configuration(err.to_string()))
	}

	pub fn options(&self) -> EvaluationOptions {
		EvaluationOptions {
			depth: self.depth,
			top: self.top,
			interpolation: self.interpolation,
			failure_policy: self.failure_policy,
			cancel: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_folder_is_required() {
		let config = RunConfig::from_json(r#"{"folder": "images"}"#).unwrap();

		assert_eq!(config.folder, PathBuf::from("images"));
		assert_eq!(config.model, Depth::ResNet18);
		assert_eq!(config.weights, "imagenet");
		assert_eq!(config.shape, InputShape::new(224, 224));
		assert_eq!(config.depth, 1);
		assert_eq!(config.top, 5);
		assert_eq!(config.interpolation, Interpolation::Area);
		assert_eq!(config.failure_policy, FailurePolicy::Abort);
		assert_eq!(config.output, None);
	}

	#[test]
	fn reads_every_field() {
		let config = RunConfig::from_json(
			r#"{
				"folder": "images",
				"model": "resnet50",
				"weights": "none",
				"shape": {"height": 256, "width": 192},
				"depth": 3,
				"top": 1,
				"interpolation": "lanczos3",
				"failure_policy": "record",
				"output": "report.json"
			}"#,
		)
		.unwrap();

		assert_eq!(config.model, Depth::ResNet50);
		assert_eq!(config.shape, InputShape::new(256, 192));
		let options = config.options();
		assert_eq!(options.depth, 3);
		assert_eq!(options.top, 1);
		assert_eq!(options.interpolation, Interpolation::Lanczos3);
		assert_eq!(options.failure_policy, FailurePolicy::Record);
		assert_eq!(config.output, Some(PathBuf::from("report.json")));
	}

	#[test]
	fn builder_matches_file_defaults() {
		let built = RunConfig::new(PathBuf::from("images"))
			.with_top(3)
			.with_output(Some(PathBuf::from("report.json")));

		assert_eq!(built.model, Depth::ResNet18);
		assert_eq!(built.depth, 1);
		assert_eq!(built.top, 3);
		assert_eq!(built.output, Some(PathBuf::from("report.json")));
	}

	#[test]
	fn reads_config_from_disk() {
		let folder = tempfile::tempdir().unwrap();
		let path = folder.path().join("icon-eval.json");
		RunConfig::new(PathBuf::from("images")).with_depth(2).save(&path).unwrap();

		let config = RunConfig::read(&path).unwrap();

		assert_eq!(config.folder, PathBuf::from("images"));
		assert_eq!(config.depth, 2);
		assert!(matches!(
			RunConfig::read(folder.path().join("missing.json")),
			Err(EvalError::Configuration(_))
		));
	}

	#[test]
	fn missing_folder_is_a_configuration_error() {
		assert!(matches!(RunConfig::from_json("{}"), Err(EvalError::Configuration(_))));
	}
}

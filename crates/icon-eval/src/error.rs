use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
	#[error("Failed to load image {path:?}")]
	ImageLoad {
		path: PathBuf,
		#[source]
		source: image::ImageError,
	},
	#[error("Failed to read folder {path:?}")]
	ReadDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("File name {0:?} is not valid UTF-8")]
	FileName(OsString),
	#[error("Std IO error")]
	StdIoError(#[from] std::io::Error),
	#[error("No companion functions registered for model family `{0}`")]
	UnknownFamily(String),
	#[error("Model weights unavailable: {0}")]
	Weights(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
	#[error("Inference failed: {0}")]
	Inference(String),
	#[error("Image is {actual:?} (height, width) but the classifier expects {expected:?}")]
	ShapeMismatch {
		expected: (u32, u32),
		actual: (u32, u32),
	},
	#[error("Number of top predictions must be positive")]
	InvalidTopK,
	#[error("Icon coder failed: {0}")]
	Coder(String),
	#[error("Evaluation of `{file}` failed")]
	File {
		file: String,
		#[source]
		source: Box<EvalError>,
	},
}

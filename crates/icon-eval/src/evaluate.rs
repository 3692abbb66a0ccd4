//! Batch evaluation of source images against their icons.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, DirEntry};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burn::prelude::Backend;
use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::coder::IconCoder;
use crate::error::EvalError;
use crate::imaging::{load_image, resize, Interpolation};
use crate::prediction::{get_prediction, PredictionList};

/// Predictions for a source image and for its icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationEntry {
	pub source: PredictionList,
	pub icon: PredictionList,
}

/// Entries keyed by file name.
pub type EvaluationResults = HashMap<String, EvaluationEntry>;

/// What to do when one file of a folder fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
	/// Stop the run and return the error; nothing evaluated so far is kept.
	#[default]
	Abort,
	/// Log the failure, remember it in the report and carry on.
	Record,
}

/// Cooperative cancellation, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

#[derive(Debug, Clone)]
pub struct EvaluationOptions {
	/// Wavelet levels discarded to produce the icon.
	pub depth: u32,
	/// Ranked predictions kept per image.
	pub top: usize,
	pub interpolation: Interpolation,
	pub failure_policy: FailurePolicy,
	pub cancel: Option<CancellationToken>,
}

impl Default for EvaluationOptions {
	fn default() -> Self {
		Self {
			depth: 1,
			top: 5,
			interpolation: Interpolation::Area,
			failure_policy: FailurePolicy::Abort,
			cancel: None,
		}
	}
}

impl EvaluationOptions {
	fn is_cancelled(&self) -> bool {
		self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
	}
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
	pub results: EvaluationResults,
	/// File name to failure message, filled under [`FailurePolicy::Record`].
	pub failures: BTreeMap<String, String>,
	pub cancelled: bool,
}

/// Classifies every entry of `folder` and its icon.
///
/// Entries are visited in directory-listing order and none are filtered out.
/// The first failing file aborts the run.
pub fn classify_images_and_icons_from_folder<B, C, P>(
	classifier: &Classifier<B>,
	folder: P,
	coder: &C,
	depth: u32,
	interpolation: Interpolation,
) -> Result<EvaluationResults, EvalError>
where
	B: Backend,
	C: IconCoder + ?Sized,
	P: AsRef<Path>,
{
	let options = EvaluationOptions {
		depth,
		interpolation,
		..Default::default()
	};

	evaluate_folder(classifier, folder, coder, &options).map(|report| report.results)
}

/// Classifies every entry of `folder` and its icon according to `options`.
pub fn evaluate_folder<B, C, P>(
	classifier: &Classifier<B>,
	folder: P,
	coder: &C,
	options: &EvaluationOptions,
) -> Result<EvaluationReport, EvalError>
where
	B: Backend,
	C: IconCoder + ?Sized,
	P: AsRef<Path>,
{
	let folder = folder.as_ref();
	let entries = fs::read_dir(folder).map_err(|source| EvalError::ReadDir {
		path: folder.to_path_buf(),
		source,
	})?;

	let mut report = EvaluationReport::default();

	for (position, entry) in entries.enumerate() {
		if options.is_cancelled() {
			warn!("Evaluation of {folder:?} cancelled after {} files", report.results.len());
			report.cancelled = true;
			break;
		}

		let (file_name, outcome) = match entry {
			Ok(entry) => evaluate_entry(classifier, &entry, coder, options),
			Err(err) => (format!("<entry {position}>"), Err(EvalError::StdIoError(err))),
		};
		settle(&mut report, options.failure_policy, file_name, outcome)?;
	}

	info!(
		"Evaluated {} files from {folder:?} ({} failed)",
		report.results.len(),
		report.failures.len()
	);

	Ok(report)
}

/// Report key and outcome of one directory entry.
///
/// Only UTF-8 names become result keys. Other names fail, keyed by their
/// escaped form so that distinct files never share a key.
fn evaluate_entry<B, C>(
	classifier: &Classifier<B>,
	entry: &DirEntry,
	coder: &C,
	options: &EvaluationOptions,
) -> (String, Result<EvaluationEntry, EvalError>)
where
	B: Backend,
	C: IconCoder + ?Sized,
{
	match entry.file_name().into_string() {
		Ok(file_name) => {
			let outcome = load_image(entry.path())
				.and_then(|image| classify_image_and_icon(classifier, &image, coder, options));
			(file_name, outcome)
		}
		Err(raw) => (format!("{raw:?}"), Err(EvalError::FileName(raw))),
	}
}

fn settle(
	report: &mut EvaluationReport,
	policy: FailurePolicy,
	file_name: String,
	outcome: Result<EvaluationEntry, EvalError>,
) -> Result<(), EvalError> {
	match outcome {
		Ok(evaluation) => {
			debug!("Evaluated {file_name}");
			report.results.insert(file_name, evaluation);
		}
		Err(err) => match policy {
			FailurePolicy::Abort => {
				return Err(EvalError::File {
					file: file_name,
					source: Box::new(err),
				})
			}
			FailurePolicy::Record => {
				warn!("Skipping {file_name}: {err}");
				report.failures.insert(file_name, err.to_string());
			}
		},
	}

	Ok(())
}

/// Predictions for an already loaded image and for its icon.
///
/// The icon is derived from the original image, not from the resized copy, and
/// both branches are resized to the classifier shape with the same interpolation.
pub fn classify_image_and_icon<B, C>(
	classifier: &Classifier<B>,
	image: &RgbImage,
	coder: &C,
	options: &EvaluationOptions,
) -> Result<EvaluationEntry, EvalError>
where
	B: Backend,
	C: IconCoder + ?Sized,
{
	let shape = classifier.shape();

	let resized = resize(image, shape, options.interpolation);
	let source = get_prediction(&resized, classifier, options.top)?;

	let icon = coder.get_small_copy(image, options.depth)?;
	debug!(
		"Icon at depth {} is {}x{} (source {}x{})",
		options.depth,
		icon.width(),
		icon.height(),
		image.width(),
		image.height()
	);
	let resized_icon = resize(&icon, shape, options.interpolation);
	let icon = get_prediction(&resized_icon, classifier, options.top)?;

	Ok(EvaluationEntry { source, icon })
}

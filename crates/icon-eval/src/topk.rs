//! Top-k decoding shared by model families.

use burn::prelude::{Backend, Tensor};

use crate::error::EvalError;
use crate::prediction::{Prediction, PredictionList};

/// Class identifiers and human readable labels, indexed by model output column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassLabels {
	entries: Vec<(String, String)>,
}

impl ClassLabels {
	/// Labels whose class identifier is their column index.
	pub fn from_names<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let entries = names
			.into_iter()
			.enumerate()
			.map(|(idx, name)| (idx.to_string(), name.into()))
			.collect();
		Self { entries }
	}

	pub fn from_pairs(entries: Vec<(String, String)>) -> Self {
		Self { entries }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, idx: usize) -> Option<(&str, &str)> {
		self.entries
			.get(idx)
			.map(|(class_id, label)| (class_id.as_str(), label.as_str()))
	}
}

/// Ranks every row of `scores` and keeps the `top` best classes.
///
/// Ties keep the lower class index first and NaN scores rank last. `top` is
/// clamped to the number of classes.
pub fn decode_top_k<B: Backend>(
	scores: Tensor<B, 2>,
	top: usize,
	labels: &ClassLabels,
) -> Result<Vec<PredictionList>, EvalError> {
	let [rows, classes] = scores.dims();
	if classes != labels.len() {
		return Err(EvalError::Inference(format!(
			"model produced {classes} classes but {} labels are known",
			labels.len()
		)));
	}

	let values = scores
		.into_data()
		.convert::<f32>()
		.to_vec::<f32>()
		.map_err(|err| EvalError::Inference(format!("could not read model output: {err:?}")))?;

	let top = top.min(classes);
	let decoded = (0..rows)
		.map(|row| {
			let row_scores = &values[row * classes..(row + 1) * classes];
			let mut ranked: Vec<(usize, f32)> = row_scores.iter().copied().enumerate().collect();
			ranked.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));

			ranked
				.into_iter()
				.take(top)
				.filter_map(|(idx, score)| {
					labels
						.get(idx)
						.map(|(class_id, label)| Prediction::new(class_id, label, score))
				})
				.collect()
		})
		.collect();

	Ok(decoded)
}

fn rank_key(score: f32) -> f32 {
	if score.is_nan() {
		f32::NEG_INFINITY
	} else {
		score
	}
}

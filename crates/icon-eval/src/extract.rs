//! Pulling single fields out of batches of prediction lists.

use crate::prediction::{Prediction, PredictionList};

/// Positional field of a prediction: `0` class id, `1` label, `2` score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionField {
	ClassId,
	Label,
	Score,
}

impl PredictionField {
	pub fn from_index(idx: i64) -> Option<Self> {
		match idx {
			0 => Some(PredictionField::ClassId),
			1 => Some(PredictionField::Label),
			2 => Some(PredictionField::Score),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
	ClassId(&'a str),
	Label(&'a str),
	Score(f32),
}

impl Prediction {
	pub fn field(&self, field: PredictionField) -> FieldValue<'_> {
		match field {
			PredictionField::ClassId => FieldValue::ClassId(&self.class_id),
			PredictionField::Label => FieldValue::Label(&self.label),
			PredictionField::Score => FieldValue::Score(self.score),
		}
	}
}

/// Field `idx` of the first-ranked prediction of every list.
///
/// Returns `None` when `idx` is not 0, 1 or 2, or when a list is empty.
pub fn extract_item_from_preds(preds: &[PredictionList], idx: i64) -> Option<Vec<FieldValue<'_>>> {
	let field = PredictionField::from_index(idx)?;

	preds
		.iter()
		.map(|list| list.first().map(|prediction| prediction.field(field)))
		.collect()
}

/// The prediction ranked `rank` (zero based) in every list.
///
/// Returns `None` if any list is shorter than `rank + 1`.
pub fn extract_ranked_from_preds(
	preds: &[PredictionList],
	rank: usize,
) -> Option<Vec<&Prediction>> {
	preds.iter().map(|list| list.get(rank)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn preds() -> Vec<PredictionList> {
		vec![
			vec![Prediction::new("n1", "cat", 0.9), Prediction::new("n2", "dog", 0.05)],
			vec![Prediction::new("n3", "car", 0.8)],
		]
	}

	#[test]
	fn extracts_labels_of_top_predictions() {
		let preds = preds();
		let labels = extract_item_from_preds(&preds, 1).unwrap();

		assert_eq!(labels, vec![FieldValue::Label("cat"), FieldValue::Label("car")]);
	}

	#[test]
	fn every_valid_index_yields_one_item_per_list() {
		let preds = preds();
		for idx in 0..=2 {
			let items = extract_item_from_preds(&preds, idx);
			assert_eq!(items.map(|items| items.len()), Some(preds.len()));
		}

		assert_eq!(
			extract_item_from_preds(&preds, 0).unwrap(),
			vec![FieldValue::ClassId("n1"), FieldValue::ClassId("n3")]
		);
		assert_eq!(
			extract_item_from_preds(&preds, 2).unwrap(),
			vec![FieldValue::Score(0.9), FieldValue::Score(0.8)]
		);
	}

	#[test]
	fn invalid_indices_yield_none() {
		let preds = preds();
		for idx in [3, -1, 100] {
			assert_eq!(extract_item_from_preds(&preds, idx), None, "idx {idx}");
		}
	}

	#[test]
	fn empty_list_yields_none() {
		let preds = vec![vec![Prediction::new("n1", "cat", 0.9)], vec![]];
		assert_eq!(extract_item_from_preds(&preds, 1), None);
	}

	#[test]
	fn empty_batch_yields_empty_items() {
		assert_eq!(extract_item_from_preds(&[], 0), Some(vec![]));
	}

	#[test]
	fn ranked_extraction_needs_long_enough_lists() {
		let preds = preds();

		let first: Vec<&str> = extract_ranked_from_preds(&preds, 0)
			.unwrap()
			.into_iter()
			.map(|prediction| prediction.label.as_str())
			.collect();
		assert_eq!(first, vec!["cat", "car"]);
		assert!(extract_ranked_from_preds(&preds, 1).is_none());
	}
}

use burn::prelude::{Backend, Tensor};
use burn::tensor::TensorData;
use image::RgbImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::error::EvalError;

/// One ranked class prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
	pub class_id: String,
	pub label: String,
	pub score: f32,
}

impl Prediction {
	pub fn new(class_id: impl Into<String>, label: impl Into<String>, score: f32) -> Self {
		Self {
			class_id: class_id.into(),
			label: label.into(),
			score,
		}
	}
}

/// Predictions for one image, ordered as the decoder returned them.
pub type PredictionList = Vec<Prediction>;

/// Classifies one image that already has the classifier's input shape.
///
/// The image is wrapped in a batch of one, preprocessed, run through the model
/// and decoded into the `top` best predictions. Errors are never swallowed.
pub fn get_prediction<B: Backend>(
	image: &RgbImage,
	classifier: &Classifier<B>,
	top: usize,
) -> Result<PredictionList, EvalError> {
	if top == 0 {
		return Err(EvalError::InvalidTopK);
	}

	let shape = classifier.shape();
	let actual = (image.height(), image.width());
	if actual != shape.as_tuple() {
		return Err(EvalError::ShapeMismatch {
			expected: shape.as_tuple(),
			actual,
		});
	}

	let batch = to_batch::<B>(image, classifier.device());
	let input = classifier.preprocess(batch)?;
	let output = classifier.model().infer(input)?;
	debug!("{} produced output of shape {:?}", classifier.name(), output.dims());

	classifier
		.decode(output, top)?
		.into_iter()
		.next()
		.ok_or_else(|| EvalError::Inference("decoder returned no predictions".to_string()))
}

/// `[1, height, width, 3]` tensor holding the raw pixel values.
fn to_batch<B: Backend>(image: &RgbImage, device: &B::Device) -> Tensor<B, 4> {
	let shape = [image.height() as usize, image.width() as usize, 3];
	let values: Vec<f32> = image.as_raw().iter().map(|&value| value as f32).collect();
	let data = TensorData::new(values, shape).convert::<B::FloatElem>();

	Tensor::<B, 3>::from_data(data, device).unsqueeze::<4>()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{color_classifier, solid_image};
	use image::Rgb;

	#[test]
	fn prediction_is_idempotent() {
		let (classifier, _) = color_classifier((32, 32));
		let image = solid_image(32, 32, Rgb([200, 40, 10]));

		let first = get_prediction(&image, &classifier, 5).unwrap();
		let second = get_prediction(&image, &classifier, 5).unwrap();

		assert_eq!(first, second);
	}

	#[test]
	fn returns_requested_number_in_decoder_order() {
		let (classifier, _) = color_classifier((16, 16));
		let image = solid_image(16, 16, Rgb([10, 250, 60]));

		let predictions = get_prediction(&image, &classifier, 3).unwrap();

		assert_eq!(predictions.len(), 3);
		assert_eq!(predictions[0].label, "green");
		assert!(predictions.windows(2).all(|pair| pair[0].score >= pair[1].score));
	}

	#[test]
	fn feeds_a_single_image_batch_to_the_model() {
		let (classifier, recorded) = color_classifier((24, 40));
		let image = solid_image(40, 24, Rgb([1, 2, 3]));

		get_prediction(&image, &classifier, 1).unwrap();

		assert_eq!(recorded.shapes(), vec![[1, 3, 24, 40]]);
	}

	#[test]
	fn rejects_zero_top() {
		let (classifier, _) = color_classifier((8, 8));
		let image = solid_image(8, 8, Rgb([0, 0, 0]));

		assert!(matches!(get_prediction(&image, &classifier, 0), Err(EvalError::InvalidTopK)));
	}

	#[test]
	fn rejects_images_of_the_wrong_size() {
		let (classifier, _) = color_classifier((8, 8));
		let image = solid_image(9, 8, Rgb([0, 0, 0]));

		let result = get_prediction(&image, &classifier, 1);

		assert!(matches!(
			result,
			Err(EvalError::ShapeMismatch { expected: (8, 8), actual: (8, 9) })
		));
	}
}

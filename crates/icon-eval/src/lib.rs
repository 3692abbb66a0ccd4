//! Compares image classifier predictions on source images against predictions
//! on their wavelet icons.

pub mod classifier;
pub mod coder;
pub mod error;
pub mod evaluate;
pub mod extract;
pub mod imaging;
pub mod prediction;
pub mod topk;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{
	load_classifier, Classifier, Companions, DecodeFn, FamilyRegistry, ImageModel, InputShape,
	ModelFactory, PreprocessFn, WeightsSource,
};
pub use coder::{HaarCoder, IconCoder};
pub use error::EvalError;
pub use evaluate::{
	classify_image_and_icon, classify_images_and_icons_from_folder, evaluate_folder,
	CancellationToken, EvaluationEntry, EvaluationOptions, EvaluationReport, EvaluationResults,
	FailurePolicy,
};
pub use extract::{extract_item_from_preds, extract_ranked_from_preds, FieldValue, PredictionField};
pub use imaging::{load_image, resize, Interpolation};
pub use prediction::{get_prediction, Prediction, PredictionList};
pub use topk::{decode_top_k, ClassLabels};

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::time::SystemTime;

use icon_eval::{
	evaluate_folder, extract_item_from_preds, load_classifier, EvalError, EvaluationReport,
	FamilyRegistry, HaarCoder, PredictionList,
};
use log::{error, info, LevelFilter};
use resnet::{register, ResNetFactory, RunConfig};
use simple_logger::SimpleLogger;

const DEFAULT_CONFIG: &str = "icon-eval.json";

#[cfg(not(feature = "tch"))]
type Inference = burn::backend::NdArray<f32>;

#[cfg(feature = "tch")]
type Inference = burn_tch::LibTorch;

fn main() {
	if let Err(err) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
		eprintln!("Could not initialise logging: {err}");
	}

	let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());

	if let Err(err) = run(&config_path) {
		error!("{err}");
		let mut source = err.source();
		while let Some(cause) = source {
			error!("  caused by: {cause}");
			source = cause.source();
		}
		std::process::exit(1);
	}
}

fn run(config_path: &str) -> Result<(), EvalError> {
	let config = RunConfig::read(config_path)?;
	let device = device();

	let mut registry = FamilyRegistry::<Inference>::new();
	register(&mut registry);

	let factory = ResNetFactory::new(config.model);
	let classifier = load_classifier(&factory, &registry, config.shape, &config.weights, &device)
		.ok_or_else(|| {
			EvalError::Configuration(format!("no classifier available for {}", config.model.name()))
		})?;

	let time = SystemTime::now();
	let report = evaluate_folder(&classifier, &config.folder, &HaarCoder, &config.options())?;
	let elapsed = time.elapsed().map(|elapsed| elapsed.as_secs_f64()).unwrap_or_default();

	summarize(&report, elapsed);

	if let Some(output) = &config.output {
		let writer = BufWriter::new(File::create(output)?);
		serde_json::to_writer_pretty(writer, &report)
			.map_err(|err| {
				EvalError::Configuration(format!("could not write report {output:?}: {err}"))
			})?;
		info!("Report written to {output:?}");
	}

	Ok(())
}

#[cfg(not(feature = "tch"))]
fn device() -> burn::backend::ndarray::NdArrayDevice {
	burn::backend::ndarray::NdArrayDevice::Cpu
}

#[cfg(feature = "tch")]
fn device() -> burn_tch::LibTorchDevice {
	if tch::utils::has_cuda() {
		burn_tch::LibTorchDevice::Cuda(0)
	} else {
		burn_tch::LibTorchDevice::Cpu
	}
}

fn summarize(report: &EvaluationReport, elapsed: f64) {
	let (sources, icons): (Vec<PredictionList>, Vec<PredictionList>) = report
		.results
		.values()
		.map(|entry| (entry.source.clone(), entry.icon.clone()))
		.unzip();

	let labels = (extract_item_from_preds(&sources, 1), extract_item_from_preds(&icons, 1));
	let agreeing = match labels {
		(Some(source_labels), Some(icon_labels)) => source_labels
			.iter()
			.zip(&icon_labels)
			.filter(|(source, icon)| source == icon)
			.count(),
		_ => 0,
	};

	info!(
		"Evaluated {} images in {elapsed:.2}s, {} failed{}",
		report.results.len(),
		report.failures.len(),
		if report.cancelled { " (cancelled)" } else { "" }
	);
	info!("Top-1 label agreement between images and icons: {agreeing}/{}", report.results.len());
}

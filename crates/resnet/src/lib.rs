//! Pretrained torchvision ResNets as an `icon-eval` model family.

mod block;
pub mod config;
pub mod family;
pub mod imagenet;
pub mod resnet;
pub mod weights;

pub use config::RunConfig;
pub use family::{register, ResNetFactory, FAMILY};
pub use resnet::{Depth, ResNet};

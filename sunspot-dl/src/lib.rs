//! The building blocks of the sunspot segmentation pipeline.

mod common;
pub mod dataset;
pub mod diagnostic;
pub mod label;
pub mod metrics;
pub mod model;
pub mod preprocess;

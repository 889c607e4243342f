//! Schema inference module
//!
//! Proposes a destination table definition from a small prefix of a flat
//! file.
//!
//! # Features
//!
//! - **Type Inference**: Int64, Float64, DateTime or String per column
//! - **Type Merging**: integers widen to floats, conflicts fall back to String
//! - **Empty Handling**: empty samples carry no type; all-empty columns are String
//! - **Table Typing**: derive the same shape from an existing table's columns

mod inference;
mod types;

pub use inference::{infer_schema, SchemaInferrer};
pub use types::{InferredSchema, ObservedType, SchemaField};

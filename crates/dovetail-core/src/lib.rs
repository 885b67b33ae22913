//! Foundation types for the dovetail conversion engine.
//!
//! This crate holds the pieces every other dovetail crate builds on:
//! - The ordered, uniquely-tagged property bag that models one store item
//! - The store tag namespace
//! - The layered error taxonomy shared by all conversion layers
//! - Converter settings loaded from the environment

pub mod config;
pub mod error;
pub mod propbag;
pub mod tags;

pub use config::ConverterSettings;
pub use error::{ConvertError, ConvertResult};
pub use propbag::{PropKind, PropValue, PropertyBag, TypedProperty, WriteMode};

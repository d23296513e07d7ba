//! Core types shared by every module: the error enum and its CLI rendering.

pub mod error;

pub use error::{AggError, ErrorContext, user_friendly_error};

#![forbid(unsafe_code)]

//! Core types shared by the Kanonisk crates.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};

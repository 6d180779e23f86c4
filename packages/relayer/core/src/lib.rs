//! Configuration and hosting of header relay engines.
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod builder;
pub mod config;

//! The header relayer binary: command line, observability and the metrics endpoint.
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod cli;
pub mod metrics;
pub mod observability;

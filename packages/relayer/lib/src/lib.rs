//! Relays block headers from a source chain into an on-chain bridge contract.
#![deny(clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

pub mod bridge;
pub mod chain;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod seen_cache;
pub mod source;

#[cfg(test)]
#[allow(missing_docs, clippy::pedantic, clippy::nursery)]
pub(crate) mod test_utils;

//! Solidity types for the header relay bridge contracts.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod bridge;

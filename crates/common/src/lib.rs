//! Common utilities shared across Gestione Caselo crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (header parsing, algorithm pinning, iat validation)
pub mod jwt;

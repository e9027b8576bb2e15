//! Shared utilities and common types for the School Manager backend.
//!
//! This crate provides functionality used across the other crates:
//! - JWT token generation and validation for operator sessions

pub mod jwt;

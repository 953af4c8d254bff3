//! KYC PDF Filler API Library
//!
//! This library provides the core functionality for the KYC PDF Filler API:
//! institution mapping profiles, the field derivation engine, template
//! resolution, PDF form filling, and the HTTP handlers tying them together.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External collaborator boundaries.
//! - `cache_validator`: Template cache integrity validation.
//! - `circuit_breaker`: Circuit breaker for template downloads.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `filler`: Form fill reconciler (lopdf).
//! - `handlers`: HTTP request handlers.
//! - `mapping`: Derivation rules and the rule interpreter.
//! - `models`: Core data models.
//! - `registry`: Institution mapping registry.
//! - `template`: Template resolver.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod cache_validator;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod filler;
pub mod handlers;
pub mod mapping;
pub mod models;
pub mod registry;
pub mod template;

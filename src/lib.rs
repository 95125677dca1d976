#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Lifecycle
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                        Configuration Lifecycle                           │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │   ConfigurationBuilder::new()        registry.get("template")            │
//! │              │                                │                          │
//! │              │◀────── read(&template, Override | Combine) ───┘           │
//! │              ▼                                                           │
//! │   fluent setters (clustering(), memory(), persistence(), ...)           │
//! │              │                                                           │
//! │              ▼                                                           │
//! │   validate()                 every local rule, all failures collected    │
//! │              │                                                           │
//! │              ▼                                                           │
//! │   validate_global(&global)   transport, sites, authorization            │
//! │              │                                                           │
//! │              ▼                                                           │
//! │   create()                   derive implied values, protect all sets     │
//! │              │                                                           │
//! │              ▼                                                           │
//! │   Configuration              immutable, Send + Sync, Arc-shared          │
//! │                                                                          │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AttributeDefinition`] | Static schema of one attribute |
//! | [`AttributeSet`] | Ordered attribute cells of one element |
//! | [`ConfigurationBuilder`] | Mutable root of a cache configuration |
//! | [`Configuration`] | Frozen cache configuration |
//! | [`GlobalConfiguration`] | Process-wide transport and security settings |
//! | [`ConfigurationRegistry`] | Named configurations and templates |
//! | [`ConfigError`] / [`Violation`] | What failed, and which rule |
//!
//! ## Deriving from a Template
//!
//! ```rust
//! use cache_config::{Builder, CombinePolicy, ConfigurationBuilder};
//!
//! let mut base = ConfigurationBuilder::new();
//! base.template(true).persistence().add_store("A");
//! let base = base.build().unwrap();
//!
//! let mut derived = ConfigurationBuilder::new();
//! derived.persistence().add_store("B");
//! derived.read(&base, CombinePolicy::Combine).unwrap();
//! let derived = derived.build().unwrap();
//!
//! let names: Vec<&str> = derived.persistence().stores().iter().map(|s| s.name()).collect();
//! assert_eq!(names, vec!["B", "A"]);
//! ```
//!
//! ## Runtime Changes
//!
//! Immutable attributes are frozen by `build`; the few mutable ones can still
//! be tuned on a built configuration:
//!
//! ```rust
//! use cache_config::ConfigurationBuilder;
//! use std::time::Duration;
//!
//! let mut config = ConfigurationBuilder::new().build().unwrap();
//! config.locking_mut().set_acquire_timeout(Duration::from_secs(2)).unwrap();
//! assert_eq!(config.locking().acquire_timeout(), Duration::from_secs(2));
//! ```
//!
//! ## Modules
//!
//! - [`attributes`]: Attribute definitions, cells, sets and change tracking
//! - [`builder`]: The builder lifecycle traits
//! - [`config`]: The cache configuration tree
//! - [`global`]: The process-wide configuration
//! - [`registry`]: Named configurations and template derivation
//! - [`error`]: Error and violation types

/// Attribute engine.
///
/// Typed attribute definitions, the cells holding values, the sets grouping
/// them per element, and a tracker recording what was written.
pub mod attributes;

/// Builder lifecycle.
///
/// The traits shared by every configuration element: validation in two
/// phases, freezing, template reads and tree walking.
pub mod builder;

/// Cache configuration tree.
pub mod config;

/// Error types.
pub mod error;

/// Process-wide configuration.
pub mod global;

/// Named configuration registry.
pub mod registry;

// Re-export attribute types
pub use attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};

// Re-export lifecycle traits
pub use builder::{Builder, ConfigurationElement, GlobalScope};

// Re-export configuration roots
pub use config::{Configuration, ConfigurationBuilder};
pub use global::{GlobalConfiguration, GlobalConfigurationBuilder};
pub use registry::ConfigurationRegistry;

pub use error::{ConfigError, Result, Violation};

#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`BomEngineError`)
//! - [`config`]: Engine configuration (`BomEngineConfig`, builder)
//! - [`types`]: Domain types (`Component`, `BillOfMaterials`, `ComponentReference`, `ComponentMatch`)
//! - [`manifest`]: The manifest fields the engine reads (`Manifest`, `PartSpec`, `BomDeclaration`)
//! - [`format`]: Document format detection and parsing (JSON / YAML / TOML)
//! - [`source`]: Content-loading collaborators (`ContentSource` trait, memory and filesystem sources)
//! - [`detect`]: BOM source classification (`BomSourceDetector`, `BomSource`)
//! - [`loader`]: External BOM file loading (`ExternalBomLoader`)
//! - [`convert`]: Embedded BOM conversion (`EmbeddedBomConverter`)
//! - [`merge`]: External + embedded merge strategy
//! - [`resolution`]: Manifest to BOM orchestration with fallback (`BomResolution`)
//! - [`resolver`]: Component reference resolution (`ReferenceResolver`, `ResolveOutcome`)
//! - [`explode`]: Recursive explosion (`ExplodeOptions`, `Explosion`, `Diagnostic`)
//! - [`engine`]: Entry point (`BomEngine`, `BomEngineBuilder`)
//!
//! # Architecture
//!
//! ```text
//! Manifest --> BomSourceDetector --+--> ExternalBomLoader ---+
//!                                  |                         +--> merge_boms --> BillOfMaterials
//!                                  +--> EmbeddedBomConverter-+                        |
//!                                                                                     v
//!                 ContentSource <-- ReferenceResolver <-- Exploder (depth <= max_depth)
//!                                                             |
//!                                              Explosion { matches, diagnostics }
//! ```

pub mod config;
pub mod convert;
pub mod detect;
pub mod engine;
pub mod error;
pub mod explode;
pub mod format;
pub mod loader;
pub mod manifest;
pub mod merge;
pub mod resolution;
pub mod resolver;
pub mod source;
pub mod types;

// --- Public API Re-exports ---

// Engine (entry point)
pub use engine::{BomEngine, BomEngineBuilder, load_manifest_file};

// Configuration
pub use config::{BomEngineConfig, BomEngineConfigBuilder};

// Error
pub use error::BomEngineError;

// Types
pub use manifest::{BomDeclaration, ExternalBomFile, Manifest, PartSpec};
pub use types::{BillOfMaterials, Component, ComponentMatch, ComponentReference};

// Pipeline stages
pub use convert::EmbeddedBomConverter;
pub use detect::{BomSource, BomSourceDetector, BomSourceKind};
pub use loader::{ExternalBomLoader, parse_bom_document};
pub use merge::merge_boms;
pub use resolution::{BomResolution, ResolvedBom};
pub use resolver::{ReferenceResolver, ResolveOutcome};

// Explosion
pub use explode::{Diagnostic, DiagnosticKind, ExplodeOptions, Explosion};

// Content sources
pub use source::{ContentSource, FsContentSource, MemoryContentSource};

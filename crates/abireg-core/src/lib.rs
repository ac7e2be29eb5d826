//! Canonicalization, content addressing, validation and diffing of contract
//! ABIs.
//!
//! Everything in this crate is pure and synchronous: no I/O, no shared state.
//! Functions can be called concurrently from any number of tasks.
//!
//! # Pipeline
//!
//! - **canonical**: normalizes an item list into a stable order and encoding
//! - **hash**: SHA-256 content address of the canonical form
//! - **validate**: structural checks, then business rules, all errors at once
//! - **standard**: ERC20 / ERC721 / ERC1155 membership tests
//! - **version**: `MAJOR.MINOR.PATCH` parsing, comparison and bumping
//! - **diff**: added/removed/modified members and breaking-change detection

pub mod canonical;
pub mod diff;
pub mod hash;
pub mod item;
pub mod standard;
pub mod validate;
pub mod version;

// Re-exports for convenience.
pub use canonical::{diff_key, normalize, AbiDiff, CanonicalAbi, KeyedItem, ModifiedItem};
pub use diff::{compare_versions, ChangeType, Difference, VersionComparison};
pub use hash::{hash, ContentHash};
pub use item::{abi_section, AbiItem, ItemKind, Parameter, StateMutability};
pub use standard::{detect, Standard};
pub use validate::{AbiValidator, ErrorCode, FieldError, ValidationErrors, ValidationRules};
pub use version::{BumpKind, NextVersionOptions, Version, VersionError};

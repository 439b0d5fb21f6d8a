//! # Skill Catalog Core
//!
//! Runtime-agnostic logic for the skill catalog: data models, front matter
//! parsing, document normalization, fingerprints and slugs, the
//! [`store::CatalogStore`] abstraction, and the GitHub reconciliation
//! algorithm in [`sync`].
//!
//! This crate contains no tokio, sqlx, or HTTP client dependencies. The
//! native crate supplies the SQLite store and the GitHub source.

pub mod catalog;
pub mod fingerprint;
pub mod frontmatter;
pub mod models;
pub mod normalize;
pub mod slug;
pub mod source;
pub mod store;
pub mod sync;

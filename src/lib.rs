//! # Skill Catalog
//!
//! Native shell around [`skill_catalog_core`]: SQLite persistence, the
//! GitHub source, the `skills` CLI, and the HTTP sync trigger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │   GitHub    │──▶│  Reconciler  │──▶│  SQLite  │
//! │ tree + raw  │   │ (core::sync) │   │ catalog  │
//! └─────────────┘   └──────┬───────┘   └──────────┘
//!                          │
//!               ┌──────────┴──────────┐
//!               ▼                     ▼
//!          ┌──────────┐         ┌──────────┐
//!          │   CLI    │         │   HTTP   │
//!          │ (skills) │         │ /sync    │
//!          └──────────┘         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! skills init                        # create database
//! skills sync                        # sync the configured repository
//! skills job <job-id>                # inspect a run
//! skills skill add ./my-skill.md     # publish a hand-written skill
//! skills serve                       # start the trigger server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `CatalogStore` |
//! | [`github`] | GitHub `RemoteSource` |
//! | [`sync_cmd`] | `skills sync` / `skills job` |
//! | [`skill_cmd`] | `skills skill add|update|show` |
//! | [`server`] | HTTP sync trigger |

pub mod config;
pub mod db;
pub mod github;
pub mod migrate;
pub mod server;
pub mod skill_cmd;
pub mod sqlite_store;
pub mod sync_cmd;

//! inkpost - personal blog, life log and ledger backend
//!
//! # Architecture
//! - `api`: HTTP handlers, middleware, routing and JWT
//! - `services`: business rules for posts, life records, comments, bills and analytics
//! - `storage`: SeaORM data access (SQLite / MySQL / PostgreSQL)
//! - `config`: TOML + environment configuration
//! - `runtime`: startup, shutdown and execution modes (server / CLI)
//! - `system`: logging and panic handling

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;

//! # taskdeck
//!
//! A self-hosted personal task tracker with an authenticated REST API.
//!
//! Users register and log in, then create, list, edit, toggle, and delete
//! tasks organized by category. Every task belongs to exactly one owner;
//! all queries and mutations are scoped to the identity verified from the
//! bearer token.
//!
//! ## Request flow
//! ```text
//! client ──► HTTP surface ──► auth middleware ──► TaskService ──► TaskStore
//!                              (verified AuthUser)  (ownership)    (JSON docs)
//! ```
//!
//! ## Modules
//! - `api`: axum routes, JWT auth, request/response types
//! - `service`: ownership-scoped task operations
//! - `tasks`: the Task entity and its document store
//! - `users`: accounts and password verification
//! - `config`: environment-driven server configuration

pub mod api;
pub mod config;
pub mod service;
pub mod tasks;
pub mod users;

pub use config::Config;

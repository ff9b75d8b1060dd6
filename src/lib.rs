//! Rewrite textual references to issues, merge requests, labels, milestones
//! and designs in rendered HTML into links, resolving every reference of a
//! kind with one batched store lookup per parent.

pub mod cache;
pub mod commands;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod filter;
pub mod kind;
pub mod kinds;
pub mod link;
pub mod model;
pub mod pattern;
pub mod pipeline;
pub mod reference_cache;
pub mod store;
pub mod types;
pub mod watch;

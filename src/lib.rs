#![forbid(unsafe_code)]

//! dashpad: a Novation Launchpad as a live dashboard.
//!
//! A state source (JSON file, shell command, or HTTP endpoint) is polled on a
//! fixed delay. Each payload describes up to eight tabs on the top row and a
//! body of colored buttons below; pressing a button opens its link.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use dashpad::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use dashpad::engine::layout::compose;
//! use dashpad::protocol::decode_payload;
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod engine;
pub mod logger;
pub mod protocol;
pub mod source;
pub mod surface;

//! # lex-cli — The `lexgen` Command
//!
//! ```bash
//! lexgen validate --lexicons lexicons --schema com.example.feed.post post.json
//! lexgen generate --lexicons lexicons --out src/lexicons
//! ```
//!
//! ## Exit codes
//!
//! - `0`: every file is valid, or generation succeeded.
//! - `1`: at least one file failed validation.
//! - `2`: operational error (unreadable input, unknown schema, bad config).

pub mod config;
pub mod generate;
pub mod lexicons;
pub mod sink;
pub mod validate;

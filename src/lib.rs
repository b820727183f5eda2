//! # sd-params
//!
//! Read and rewrite the generation parameters that Stable Diffusion front ends
//! embed in their PNG and JPEG output, and apply find/replace edits across a
//! whole folder of images.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sd_params::{batch_replace, has_backup, read_metadata, write_metadata};
//! use std::path::Path;
//!
//! fn main() -> Result<(), sd_params::MetadataError> {
//!     let path = Path::new("outputs/00042.png");
//!
//!     let text = read_metadata(path)?;
//!     println!("{text}");
//!
//!     // Keep a pristine copy at outputs/00042.png.backup on first write
//!     write_metadata(path, &text.replace("Steps: 20", "Steps: 30"), true)?;
//!     assert!(has_backup(path));
//!
//!     let result = batch_replace(Path::new("outputs"), "lowres", "worst quality", true)?;
//!     println!("{} modified, {} failed", result.modified_count, result.errors.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Where the text lives |
//! |--------|----------------------|
//! | PNG (`.png`) | `tEXt` or `iTXt` chunk with keyword `parameters`; always written back as `tEXt` |
//! | JPEG (`.jpg`, `.jpeg`) | UTF-16BE text between the bytes `00 3C` and the next `FF DB` |
//!
//! ## Modules
//!
//! - [`png`] — PNG chunk codec and `parameters` adapter
//! - [`jpeg`] — JPEG text region adapter
//! - [`backup`] — create-once `.backup` sidecars
//! - [`pipeline`] — format dispatch, folder listing, batch replace
//! - [`cache`] — mtime-keyed metadata cache for long-running callers
//! - [`config`] — configuration for the command-line tool

pub mod backup;
pub mod cache;
pub mod config;
pub mod error;
pub mod jpeg;
pub mod pipeline;
pub mod png;

pub use backup::has_backup;
pub use error::{MetadataError, Result};
pub use pipeline::{BatchError, BatchResult, batch_replace, read_metadata, write_metadata};

//! # Tactics Development Tools
//!
//! Command-line tools for working with team catalogs:
//! - Catalog validation
//! - Team valuation

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod validate;
pub mod valuation;

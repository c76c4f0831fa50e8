//! Data structures for team catalogs.
//!
//! A catalog lists the unit blueprints a team may field. All structs are
//! designed to be deserialized from RON documents.
//!
//! **Note:** This module contains no file IO. Callers read the text and
//! hand it to [`Catalog::from_ron_str`].

mod blueprint;
mod catalog;

pub use blueprint::{PartSpec, PartSpecKind, UnitBlueprint};
pub use catalog::Catalog;

//! Validate and normalize register/field tables extracted from the NVMe
//! specification.
//!
//! Raw cell grids flow through [`parse`] into field records, then through
//! the [`transform`] pipeline, and are finally bucketed and reconciled by
//! [`group`]. [`schedule`] ties the stages together for a whole document.

pub mod config;
pub mod error;
pub mod group;
pub mod output;
pub mod parse;
pub mod schedule;
pub mod transform;

pub use config::Config;
pub use error::{LintError, LintResult};
pub use group::{Group, GroupTable, Groups};
pub use parse::{Extent, FieldRecord};
pub use transform::Table;

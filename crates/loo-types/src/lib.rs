//! Foundation types for the Toilet Map.
//!
//! Every other crate in the workspace depends on `loo-types`. It fixes the
//! record schema that the store persists and the façade exposes.
//!
//! # Key Types
//!
//! - [`LooId`] / [`ReportId`]: UUID v7 identifiers
//! - [`Location`] / [`Point`]: caller-facing and stored geometry (`[lng, lat]`)
//! - [`LooProperties`]: the explicit property schema, used for both diffs and merged state
//! - [`Loo`]: current-state projection of one physical toilet
//! - [`Report`]: one immutable contribution in a Loo's history
//! - [`ReportInput`] / [`RemovalInput`]: submission payloads
//! - [`Contributor`]: identity and permissions of the submitting user

pub mod contributor;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod input;
pub mod properties;
pub mod records;
pub mod temporal;

pub use contributor::{Contributor, REPORT_PERMISSION};
pub use error::TypeError;
pub use geometry::{Location, Point};
pub use ids::{LooId, ReportId};
pub use input::{RemovalInput, ReportInput};
pub use properties::{AccessPermission, Area, Facilities, LooProperties, SCHEMA_VERSION};
pub use records::{Loo, Report};
pub use temporal::{next_timestamp, parse_timestamp};

//! Built-in gate stages.

pub mod permission;
pub mod read_only;
pub mod validation;

pub use permission::PermissionStage;
pub use read_only::ReadOnlyStage;
pub use validation::ValidationStage;

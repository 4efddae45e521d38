//! Per-field checks and corrections. Everything here is pure and synchronous
//! except the optional deliverability lookup behind [`email::DeliverabilityCheck`].

pub mod columns;
pub mod correctors;
pub mod duplicates;
pub mod email;
pub mod job_mapper;
pub mod phone;
pub mod policy;
pub mod scorer;
pub mod validators;

pub use columns::{resolve_roles, ColumnRoles};
pub use policy::{AutoApplyPolicy, FixKind};

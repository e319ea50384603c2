//! Core domain types.

pub mod name;
pub mod record;
pub mod target;

pub use name::{InvalidName, RepoName, validate_component};
pub use record::{EventRecord, FIELD_SEPARATOR, prefix_record, timestamp_of};
pub use target::Target;

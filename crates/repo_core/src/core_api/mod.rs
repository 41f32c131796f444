mod edit;
mod engine;
mod error;
mod types;

pub use edit::{EditTarget, FieldEdit};
pub use engine::{Engine, Session};
pub use error::{CoreError, CoreErrorCode};
pub use types::Snapshot;

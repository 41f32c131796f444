//! Reading and writing R.E.P.O. `.es3` saves.
//!
//! Load: [`container::decrypt`] → [`document::SaveDocument`] → [`transform::to_view`].
//! Save: [`transform::from_view`] → serialize → [`container::encrypt`] → [`storage`] write
//! with a single `.bak` backup. [`core_api`] wraps both directions in an
//! [`core_api::Engine`]/[`core_api::Session`] pair.

pub mod container;
pub mod core_api;
pub mod document;
pub mod schema;
pub mod storage;
pub mod transform;
pub mod view;

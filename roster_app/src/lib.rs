#![forbid(unsafe_code)]
//! Member roster: the `Member` entity, its configuration profile and the two units
//! of work run by the `seed` and `lookup` binaries.

pub mod entity;
pub mod error;
pub mod operations;
pub mod settings;
pub mod telemetry;

pub use entity::Member;
pub use error::AppError;
pub use settings::{ProfileSettings, Settings, MAIN_PROFILE};

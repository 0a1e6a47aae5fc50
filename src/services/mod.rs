//! Application services.
//!
//! Account and guest logic shared by the HTTP handlers and the background
//! cleanup job. Everything here takes a locked `Connection`.

pub mod guest;
pub mod reaper;
pub mod users;

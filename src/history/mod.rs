//! Saved analysis histories.

pub mod db;
pub mod handlers;

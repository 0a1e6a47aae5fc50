pub mod analysis;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod history;
pub mod paths;
pub mod samples;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
pub mod testing;

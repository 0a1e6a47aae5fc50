//! Authentication: accounts, sessions and the auth endpoints.

pub mod db;
pub mod handlers;
pub mod middleware;
pub mod password;

pub use middleware::AuthContext;

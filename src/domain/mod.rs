pub mod history;
pub mod user;

pub use history::{Analysis, History};
pub use user::{Role, SignUp, User, UserInfo};

mod role_repo;
mod user_repo;

pub use role_repo::*;
pub use user_repo::*;

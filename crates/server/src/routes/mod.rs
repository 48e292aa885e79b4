pub mod auth;
pub mod comments;
pub mod films;
pub mod lists;
pub mod users;

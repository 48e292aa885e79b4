pub mod catalog;
pub mod comments;
pub mod engagement;
pub mod films;

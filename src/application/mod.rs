//! Application services over the repository traits.

pub mod auth;
pub mod catalog;
pub mod comments;
pub mod error;
pub mod feed;
pub mod pagination;
pub mod posts;
pub mod profile;
pub mod repos;
pub mod throttle;

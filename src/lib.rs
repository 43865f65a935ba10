//! Blogicum: a multi-user blogging server.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;

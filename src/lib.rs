mod error;
pub use error::*;

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod database;
pub mod links;
pub mod models;

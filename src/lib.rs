pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod services;
pub mod state;

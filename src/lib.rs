pub mod bridge;
pub mod cache;
pub mod discord;
pub mod ed;
pub mod error;
pub mod models;
pub mod settings;

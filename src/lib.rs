pub mod assets;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod slug;
pub mod state;
pub mod store;

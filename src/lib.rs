pub mod agent;
pub mod bridge;
pub mod config;
pub mod errors;
pub mod events;
pub mod llm;
pub mod models;
pub mod store;
pub mod transport;

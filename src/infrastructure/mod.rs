pub mod config;
pub mod grid;
pub mod llm_clients;
pub mod response;
pub mod security;

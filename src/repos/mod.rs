pub mod config;
pub mod crypto;
pub mod prompts;
pub mod roles;
pub mod settings;
pub mod store;
pub mod usage;

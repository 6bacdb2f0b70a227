pub mod commands;
pub mod config;
pub mod core;
pub mod database;
pub mod services;

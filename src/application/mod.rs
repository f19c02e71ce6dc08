pub mod commands;
pub mod config;
pub mod locks;
pub mod password_prompt;

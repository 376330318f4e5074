pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod gateway;
pub mod llm;

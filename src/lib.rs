pub mod app;
pub mod backend;
pub mod chat;
pub mod cli;
pub mod config;
pub mod models;
pub mod storage;
pub mod stream;

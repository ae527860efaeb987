pub mod config;
pub mod handler;
pub mod hydrus;
pub mod matrix;
pub mod models;
pub mod resolver;
pub mod tags;

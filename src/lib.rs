pub mod app;
pub mod client;
pub mod config;
pub mod demo;
pub mod details;
pub mod discovery;
pub mod error;
pub mod models;
pub mod normalize;
pub mod search;
pub mod session;
pub mod tags;
pub mod tmdb;
pub mod trending;
pub mod upstream;

pub mod app;
pub mod config;
pub mod models;
pub mod pages;
pub mod tmdb;
pub mod view_state;

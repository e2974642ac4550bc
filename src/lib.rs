pub mod app_config;
pub mod auth;
pub mod domain;
pub mod path;
pub mod route;
pub mod simulator;
pub mod store;
pub mod store_listener;
pub mod viewer;
pub mod web;

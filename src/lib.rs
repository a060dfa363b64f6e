pub mod api;
pub mod boundary;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod form;
pub mod logging;
pub mod models;
pub mod ui;
pub mod views;

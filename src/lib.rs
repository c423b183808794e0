//! Workshop retention service library exports

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod retention;
pub mod routes;
pub mod state;
pub mod store;
pub mod tasks;

//! Core library for music-platform-converter
pub mod api;
pub mod commands;
pub mod config;
pub mod convert;
pub mod error;
pub mod models;
pub mod query;
pub mod registry;

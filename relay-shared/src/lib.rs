#![cfg_attr(not(test), forbid(unsafe_code))]

//! Shared data models and configuration for the RelayCRM sync clients.

pub mod config;
pub mod models;

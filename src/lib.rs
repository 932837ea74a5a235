//! Library crate for stage-scoreboard, shared by the overlay and control binaries.

mod clock;
pub mod config;
pub mod dao;
mod dto;
mod error;
pub mod overlay;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;

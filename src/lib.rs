//! Gym attendance backend: shift-based time-in / time-out recording over a
//! MySQL ledger, with periodic reconciliation and a JWT-protected HTTP API.

pub mod api;
pub mod attendance;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod models;
pub mod notify;
pub mod routes;
pub mod utils;

//! # POLi payment server
//! This crate hosts the HTTP surface of the POLi integration. It is responsible for:
//! * Receiving events, settings, orders and checkout calls from the ticketing host (`/host/...`, HMAC signed).
//! * Sending buyers to POLi and handling their return or cancellation.
//! * Receiving POLi's webhook nudges and reconciling the payments they refer to.
//! * Sending delayed payment reminders for unpaid POLi orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/host/...`: The host API. See [routes](routes/index.html).
//! * `/{organizer}/{event}/poli/...`: Return, cancel and webhook callbacks. See [poli_routes](poli_routes/index.html).
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod poli_routes;
pub mod reminder_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;

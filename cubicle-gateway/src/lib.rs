//! HTTP server for the Cubicle blog and classroom code runner.
//!
//! Serves the blog pages behind a session login gate, and the code
//! execution endpoints used by the classroom editor.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod auth;
pub mod blog;
pub mod config;
pub mod error;
pub mod exec;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

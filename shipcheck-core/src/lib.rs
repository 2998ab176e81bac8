//! Core of the shipcheck deployment-readiness client.
//!
//! Everything here is independent of the terminal: the session state machine,
//! the configuration resolver, the question round, the Socket.IO channel, the
//! GitHub and service-status clients, and the local assessment history.

pub mod controller;
pub mod db;
pub mod envconfig;
pub mod error;
pub mod git;
pub mod github;
pub mod protocol;
pub mod questions;
pub mod repos;
pub mod schema;
pub mod service;
pub mod socketio;
pub mod timer;
pub mod transport;
pub mod types;
pub mod verdict;

//! Simulated sensor + pump device and an external controller, kept in step over MQTT.
pub mod auto;
pub mod config;
pub mod console;
pub mod controller;
pub mod device;
pub mod dummy;
pub mod errors;
pub mod maus;
pub mod models;
pub mod mqtt;

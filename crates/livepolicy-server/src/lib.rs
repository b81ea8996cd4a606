//! livepolicy server library entry.
//!
//! This crate wires the tenant registry, the engine contract and its HTTP
//! polling implementation, the decision router, and the admin/decision HTTP
//! surfaces into one server. It is consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod admin;
pub mod app_state;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod obs;
pub mod ops;
pub mod registry;
pub mod router;
pub mod server;

//! Admin and decision-serving HTTP handlers.
//!
//! Thin consumers of the registry and decision router: they validate form
//! and query input, call through, and map errors via `ApiError`.

pub mod demo;
pub mod tenants;

pub use demo::demo_decision;
pub use tenants::{list_tenants, show_tenant, submit_tenant_form};

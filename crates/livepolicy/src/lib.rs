//! Top-level facade crate for livepolicy.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use livepolicy_core::*;
}

pub mod server {
    pub use livepolicy_server::*;
}

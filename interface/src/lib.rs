//! Public interface layer for the `journal` program: program ids per cluster, seed layout,
//! account layout, instruction layout, and the program's error codes.
//!
//! Everything in here must agree byte for byte with the deployed program. Clients and test
//! ledgers both build on these definitions so that neither side drifts.

pub mod error;
pub mod instructions;
pub mod program;
pub mod seeds;
pub mod state;

pub use program::Cluster;

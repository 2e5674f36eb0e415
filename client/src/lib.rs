//! Client-side data access for the journal program.
//!
//! Includes address derivation, account decoding, transaction submission and confirmation, and a
//! query cache that keeps reads consistent with confirmed mutations.

pub mod cache;
pub mod config;
pub mod e2e_helpers;
pub mod error;
pub mod ledger;
pub mod logs;
pub mod pda;
pub mod program;
pub mod submitter;
pub mod transactions;
pub mod views;

pub use logs::LogColor;

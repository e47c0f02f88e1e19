//! A small framework that retries transient transactions until they succeed, are cancelled, or run out of retries.
//!
//! See: [`retry`], [`StateError`]

#![cfg(feature = "framework")]

mod state;

pub use state::*;

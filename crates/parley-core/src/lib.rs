//! Core types and client logic for the Parley chat client.
//!
//! The identity provider and the real-time message store are external
//! collaborators, expressed here as the [`identity::IdentityProvider`] and
//! [`store::MessageStore`] traits. Everything else in this crate (the session
//! controller, the feed binding, the composer, and the render shell's view
//! model) is written against those traits only.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod app;
pub mod composer;
pub mod config;
pub mod error;
pub mod feed;
pub mod identity;
pub mod listener;
pub mod message;
pub mod session;
pub mod shell;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

//! Client-side core of the Gather social events app.
//!
//! The crate ranks nearby events and keeps the follow graph consistent. It
//! also splits shared costs, walks an event draft to publication and manages
//! live subscriptions. Backends are reached only through the traits in
//! [`domain::ports`]; [`outbound::memory`] provides an in-process adapter.

pub mod config;
pub mod domain;
pub mod outbound;

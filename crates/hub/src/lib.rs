//! Websocket subscription hub, health endpoint, and USD price watcher.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

/// Errors surfaced to connected clients.
mod error;
pub use error::ClientProtocolError;

/// The subscription hub: per-client state, topic allow-list, dispatch.
mod hub;
pub use hub::{Hub, Topic};

/// Per-client read/write pump tasks.
mod client;

/// `axum` router wiring: websocket upgrade, health endpoint.
mod server;
pub use server::{router, HubState};

/// Background USD/ETH spot price watcher.
mod price;
pub use price::PriceWatcher;

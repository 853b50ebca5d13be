//! # yolink-bridge-app
//!
//! Application layer: the resilience core and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `HttpTransport`: send one JSON request, return the raw body
//!   - `PubSubTransport`: open, subscribe, and pump a broker session
//! - Provide the **use-cases** built on those ports:
//!   - `TokenAuthority`: bearer credential lifecycle
//!   - `ResilientRequestClient`: authenticated calls with error
//!     classification and bounded retry
//!   - `PubSubConnection`: connect/subscribe/poll with tracked connectivity
//!   - `HomeService`: home, device-list, state and command calls
//!
//! ## Concurrency
//! Everything here is blocking and single-threaded: no worker threads are
//! spawned, retry delays sleep the calling thread, and the pub/sub pump only
//! advances when the host calls it.
//!
//! ## Dependency rule
//! Depends on `yolink-bridge-domain` only. Never imports adapter crates.
//! Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod retry;
pub mod services;

#[cfg(test)]
mod test_support;

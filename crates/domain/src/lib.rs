//! # yolink-bridge-domain
//!
//! Pure domain model for the YoLink cloud bridge.
//!
//! ## Responsibilities
//! - Foundational types: credentials, timestamps, error conventions
//! - Define the **request envelope** sent to the control API and the
//!   **response envelope** it answers with
//! - Define the closed **error code** table and its success/failure
//!   classification
//! - Define **connection state** and the message types of the
//!   publish/subscribe link
//! - Describe the **devices** and **reports** the cloud hands back
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod code;
pub mod connection;
pub mod device;
pub mod envelope;
pub mod token;

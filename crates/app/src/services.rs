//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod home_service;
pub mod pubsub_connection;
pub mod request_client;
pub mod token_authority;

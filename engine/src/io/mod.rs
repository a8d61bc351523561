//! # I/O Module
//!
//! Collaborators the form creators talk to. Transport (HTTP clients, retries,
//! authentication) lives with the application; the engine only sees these
//! traits.

pub mod facades;

pub use facades::{ServiceCategoryFacade, ServiceFacade};

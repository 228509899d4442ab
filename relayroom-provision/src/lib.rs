//! # relayroom provisioning
//!
//! Creates rooms through the vendor REST API and mints the API credential
//! that authorizes those calls.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod token;

// Re-export main types
pub use client::{
    room_id_from_body, ProvisionConfig, RoomsClient, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT,
    ROOMS_PATH,
};
pub use token::{generate_token, generate_token_with, Permission, TokenClaims, DEFAULT_TOKEN_TTL};

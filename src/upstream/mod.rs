//! Client for the hosted completions-style image generation endpoint.
//!
//! - `client`: builds the payload, makes one bounded call, maps failures.
//! - `extract`: ordered strategies that pull an image reference out of the
//!   returned message content.
//! - `types`: wire shapes of the upstream request and response.
pub mod client;
pub mod extract;
pub mod types;

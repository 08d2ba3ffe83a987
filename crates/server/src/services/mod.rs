//! Business logic services for the relay.
//!
//! # Services
//!
//! - `auth` - Outbound authorization strategies per action
//! - `sanitize` - URL normalization for checkout payloads
//! - `upstream` - Forwarding gateway to the commerce API
//! - `email` - Transactional email dispatch
//! - `documents` - Credit note and invoice PDFs

pub mod auth;
pub mod documents;
pub mod email;
pub mod sanitize;
pub mod upstream;

//! Orders Relay Core - Shared types library.
//!
//! This crate provides the types shared by the relay server and its tests:
//! - the closed [`Action`] enumeration and its static descriptor table
//! - order and invoice records as read from the record store
//! - money formatting and VAT arithmetic for financial documents
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Anything
//! that talks to the network lives in `orders-relay-server`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

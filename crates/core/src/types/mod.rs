//! Core types for the orders relay.
//!
//! This module provides type-safe wrappers for the relay's domain concepts.

pub mod action;
pub mod email;
pub mod id;
pub mod invoice;
pub mod money;
pub mod order;
pub mod status;

pub use action::{Action, ActionSpec, AuthMode, Transport, UnknownAction};
pub use email::{Email, EmailError};
pub use id::*;
pub use invoice::{
    AmountOverflow, CREDIT_NOTE_PREFIX, Invoice, InvoiceItem, is_credit_note_number,
};
pub use money::{format_amount, split_vat};
pub use order::Order;
pub use status::OrderStatus;

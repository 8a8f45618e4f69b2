//! # Outlay Model
//!
//! Wire-format types for the outlay expense sync service.
//!
//! The model is deliberately small: a single [`Expense`] record and its
//! JSON encoding, shared by the store (on-disk files) and the server
//! (request and response bodies).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod expense;

pub use expense::Expense;

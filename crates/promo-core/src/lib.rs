//! Core types and services for the promo-code backend.
//!
//! Holds the partner quota model, the storage-collaborator trait, and the two
//! stateful services built on it: the [`QuotaManager`](quota::QuotaManager)
//! and the segment [distribution](distribution) engine. Free of HTTP and
//! database dependencies.

#![allow(async_fn_in_trait)]

pub mod customer;
pub mod distribution;
pub mod error;
pub mod memory;
pub mod partner;
pub mod quota;
pub mod store;

pub use error::{Error, Result};

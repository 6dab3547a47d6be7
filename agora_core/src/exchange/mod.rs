// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! The `exchange` module ties validation, nonce bookkeeping and settlement together.
//!
//! [`Exchange`] is the primary interface of the library. Every mutating call
//! (fulfillment, cancellation, counter increment) is one unit of work: calls are
//! serialized, and each runs between a checkpoint and a commit, or a rollback if
//! anything fails along the way.
//!
//! The `Exchange` uses user-defined adapters (see [adapters]) for storage, token
//! transfers, chain information and event delivery.

pub mod adapters;
mod agora_exchange;
#[cfg(feature = "in_memory")]
pub mod context;

pub use agora_exchange::Exchange;

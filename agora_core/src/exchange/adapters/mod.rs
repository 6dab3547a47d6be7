// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Context adapters for the Agora exchange.
//!
//! Each adapter should be defined by the user of the library based on the
//! environment the exchange settles in: where nonce state is persisted, how token
//! contracts are called, where chain information comes from and how emitted records
//! are delivered. Every mutating exchange call runs between a
//! [`Transactional::checkpoint`] and either a commit or a rollback, so adapters only
//! need to make their writes revertible.

mod asset;
mod currency;
mod environment;
mod events;
mod nonce;
mod transaction;

pub use asset::{AssetTransfer, InterfaceProbe};
pub use currency::CurrencyTransfer;
pub use environment::ChainEnvironment;
pub use events::EventEmitter;
pub use nonce::{NonceRead, NonceStore};
pub use transaction::Transactional;

// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

/// Moves fungible currency on behalf of the exchange.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait CurrencyTransfer {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Transfers `amount` of the `currency` token from `from` to `to`.
    ///
    /// Must fail, without moving anything, if the transfer cannot be made in full.
    async fn transfer_from(
        &self,
        currency: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), Self::AdapterError>;
}

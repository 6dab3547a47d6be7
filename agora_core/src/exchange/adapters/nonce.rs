// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

/// Reads per-address nonce state.
///
/// An address that was never written to must read as zero / empty.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait NonceRead {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Counter maintained by the exchange owner.
    async fn current_nonce(&self, user: Address) -> Result<U256, Self::AdapterError>;

    /// Bulk-cancellation watermark of `user`.
    async fn min_order_nonce(&self, user: Address) -> Result<U256, Self::AdapterError>;

    /// Whether `nonce` was consumed by a fulfillment or cancelled individually.
    async fn is_nonce_executed_or_cancelled(
        &self,
        user: Address,
        nonce: U256,
    ) -> Result<bool, Self::AdapterError>;
}

/// Writes per-address nonce state.
///
/// The exchange checks every rule before calling these methods, implementations only
/// persist.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait NonceStore {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Adds every entry of `nonces` to the executed-or-cancelled set of `user`.
    /// Entries already present stay present.
    async fn mark_nonces_executed_or_cancelled(
        &self,
        user: Address,
        nonces: &[U256],
    ) -> Result<(), Self::AdapterError>;

    /// Sets the bulk-cancellation watermark of `user`.
    async fn update_min_order_nonce(
        &self,
        user: Address,
        min_order_nonce: U256,
    ) -> Result<(), Self::AdapterError>;

    /// Increments the counter of `user` and returns its new value.
    async fn increment_current_nonce(&self, user: Address) -> Result<U256, Self::AdapterError>;
}

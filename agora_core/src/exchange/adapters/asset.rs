// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use async_trait::async_trait;

/// Capability probe on asset contracts, in the ERC165 sense.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait InterfaceProbe {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Whether `collection` declares support for `interface_id`.
    async fn supports_interface(
        &self,
        collection: Address,
        interface_id: FixedBytes<4>,
    ) -> Result<bool, Self::AdapterError>;
}

/// Moves assets on behalf of the exchange, one method per transfer convention.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait AssetTransfer {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// `safeTransferFrom(from, to, tokenId)` on a non-fungible collection.
    async fn safe_transfer_non_fungible(
        &self,
        collection: Address,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<(), Self::AdapterError>;

    /// `safeTransferFrom(from, to, id, amount, data)` on a semi-fungible collection.
    async fn safe_transfer_semi_fungible(
        &self,
        collection: Address,
        from: Address,
        to: Address,
        token_id: U256,
        amount: U256,
        data: Bytes,
    ) -> Result<(), Self::AdapterError>;
}

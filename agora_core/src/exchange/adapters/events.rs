// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::events::ExchangeEvent;

/// Delivers the records produced by successful exchange calls.
///
/// Emission happens inside the unit of work: a rolled back call must not leave its
/// events behind.
///
/// # Example
///
/// For example code see [crate::exchange::context::memory::InMemoryContext]
#[async_trait]
pub trait EventEmitter {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    async fn emit(&self, event: ExchangeEvent) -> Result<(), Self::AdapterError>;
}

// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Agora wire structs
//!
//! EIP712 structs exchanged between makers, takers and the settlement service.
//! [`Order`] is the maker's signed intent; the messages in [`requests`] are signed by
//! the acting party of a service call, so the service can attribute the call to a
//! caller identity.
//!

mod order;
pub mod requests;

pub use order::{Order, SignedOrder, DEFAULT_ORDER_LIFETIME_SECS};
pub use requests::{
    CancelAllOrders, CancelOrders, FillOrder, IncrementNonce, SignedCancelAllOrders,
    SignedCancelOrders, SignedFillOrder, SignedIncrementNonce,
};

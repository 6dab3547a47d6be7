// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0
#![doc = include_str!("../README.md")]
//! ## Getting started
//!
//! Implement the adapters for your environment, then drive everything through
//! [`exchange::Exchange`]. Take a look at [`exchange::context::memory`] for a complete
//! reference implementation.

use alloy::{
    primitives::Address,
    sol_types::{eip712_domain, Eip712Domain},
};

pub mod asset;
pub mod digest;
mod error;
pub mod events;
pub mod exchange;
pub mod nonce;
pub mod settlement;
pub mod signed_message;
pub mod validation;

pub use error::{Error, Result};
pub use nonce::NonceError;

/// The EIP712 domain separator builder for the Agora protocol.
///
/// The domain separator is defined as:
/// - `name`: "Agora"
/// - `version`: "1"
/// - `chain_id`: The chain ID of the chain the exchange settles on.
/// - `verifying_contract`: The address identifying the exchange instance.
///
/// The [`exchange::Exchange`] rebuilds it on every call from the chain ID reported by
/// its environment, so signatures never survive a change of chain.
pub fn agora_eip712_domain(chain_id: u64, verifying_contract_address: Address) -> Eip712Domain {
    eip712_domain! {
        name: "Agora",
        version: "1",
        chain_id: chain_id,
        verifying_contract: verifying_contract_address,
    }
}

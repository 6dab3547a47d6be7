// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Order digest
//!
//! An order is signed over `keccak256(0x19 0x01 || domainSeparator || structHash)`, where
//! `structHash` commits to the order type string (and therefore its field layout) and
//! every field value.

use agora_order::Order;
use alloy::{
    primitives::{keccak256, B256},
    sol_types::{Eip712Domain, SolStruct},
};

/// Prefix of every EIP712 signing preimage.
pub const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

/// Hash of the `Order(...)` type string.
pub fn order_type_hash() -> B256 {
    keccak256(Order::eip712_encode_type().as_bytes())
}

/// EIP712 struct hash of `order`. This is the order hash reported in fulfillment events.
pub fn order_struct_hash(order: &Order) -> B256 {
    order.eip712_hash_struct()
}

/// Composes a domain separator and a struct hash into the digest that gets signed.
pub fn signing_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut preimage = [0u8; 66];
    preimage[..2].copy_from_slice(&EIP712_PREFIX);
    preimage[2..34].copy_from_slice(domain_separator.as_slice());
    preimage[34..].copy_from_slice(struct_hash.as_slice());
    keccak256(preimage)
}

/// Digest of `order` under `domain_separator`.
pub fn order_digest(order: &Order, domain_separator: &Eip712Domain) -> B256 {
    signing_digest(domain_separator.separator(), order_struct_hash(order))
}

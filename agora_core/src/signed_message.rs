// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # EIP712 message and signature
//!
//! This module re-exports the signed message envelope used for orders and caller
//! authorizations.

pub use agora_eip712_message::*;

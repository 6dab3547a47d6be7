// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # Order validation
//!
//! Validation is a read-only pass: signature, start of the window, end of the window,
//! then the signer's nonce. The first failing check decides the error. Consuming the
//! nonce is left to the caller so the same pass can serve dry runs.

use agora_order::{Order, SignedOrder};
use alloy::{
    primitives::{Address, Signature, B256, U256},
    sol_types::Eip712Domain,
};

use crate::{
    digest::order_digest,
    exchange::adapters::NonceRead,
    nonce::NonceRegistry,
    signed_message::{recover_prehash, Eip712SignedMessage},
    Error, Result,
};

/// Checks that `signature` over `digest` was produced by `signer`.
///
/// Recovery failures and non-canonical signatures are reported as
/// [`Error::InvalidSignature`], like a signer mismatch.
pub fn check_signature(digest: &B256, signer: Address, signature: &Signature) -> Result<()> {
    let recovered = recover_prehash(signature, digest).map_err(|err| Error::InvalidSignature {
        signer,
        source_error_message: err.to_string(),
    })?;
    if recovered != signer {
        return Err(Error::InvalidSignature {
            signer,
            source_error_message: format!("recovered signer {recovered}"),
        });
    }
    Ok(())
}

/// Builds a [`SignedOrder`] from a raw `r || s || v` signature.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if the blob is malformed or non-canonical.
pub fn parse_signed_order(order: Order, signature: &[u8]) -> Result<SignedOrder> {
    let signer = order.signer;
    Eip712SignedMessage::from_signature_bytes(order, signature).map_err(|err| {
        Error::InvalidSignature {
            signer,
            source_error_message: err.to_string(),
        }
    })
}

/// Validates `signed_order` under `domain_separator` at chain time `now`.
///
/// The checks run in this order and the first failure is returned:
/// 1. the signature recovers to `order.signer` ([`Error::InvalidSignature`]),
/// 2. `order.startTime <= now` ([`Error::OrderNotActive`]),
/// 3. `order.endTime >= now` ([`Error::OrderExpired`]),
/// 4. the order nonce is still valid for the signer ([`Error::InvalidNonce`]).
pub async fn validate_order<C>(
    context: &C,
    domain_separator: &Eip712Domain,
    now: u64,
    signed_order: &SignedOrder,
) -> Result<()>
where
    C: NonceRead + Sync,
{
    let order = &signed_order.message;

    let digest = order_digest(order, domain_separator);
    check_signature(&digest, order.signer, &signed_order.signature)?;

    let chain_time = U256::from(now);
    if order.startTime > chain_time {
        return Err(Error::OrderNotActive {
            start_time: order.startTime,
            now,
        });
    }
    if order.endTime < chain_time {
        return Err(Error::OrderExpired {
            end_time: order.endTime,
            now,
        });
    }

    NonceRegistry::new(context).check(order.signer, order.nonce).await
}

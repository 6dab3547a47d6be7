// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! # EIP712 signed message
//!
//! This crate contains the `Eip712SignedMessage` struct which is used to sign and verify messages
//! using EIP712 standard.
//!
//! Signatures received from the outside as raw bytes go through
//! [`Eip712SignedMessage::from_signature_bytes`], which refuses anything that is not a
//! canonical 65-byte `r || s || v` encoding.
//!
//! # Example
//! ```rust
//! # use alloy::{primitives::{Address, U256}, signers::local::PrivateKeySigner, sol_types::Eip712Domain};
//! # let domain_separator = Eip712Domain::default();
//! use agora_eip712_message::Eip712SignedMessage;
//! # let wallet = PrivateKeySigner::random();
//! # let wallet_address = wallet.address();
//! # let message = agora_order::CancelAllOrders { minNonce: U256::from(10) };
//!
//! let signed_message = Eip712SignedMessage::new(&domain_separator, message, &wallet).unwrap();
//! let signer = signed_message.recover_signer(&domain_separator).unwrap();
//!
//! assert_eq!(signer, wallet_address);
//! ```
//!

use alloy::{
    primitives::{uint, Address, Signature, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
    sol_types::{Eip712Domain, SolStruct},
};
use serde::{Deserialize, Serialize};

/// Length of a raw `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Half of the secp256k1 group order. Signatures with `s` above it are malleable.
const SECP256K1_HALF_ORDER: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Errors returned by creation of messages and verify signature
#[derive(thiserror::Error, Debug)]
pub enum Eip712Error {
    /// `alloy` wallet error
    #[error(transparent)]
    WalletError(#[from] alloy::signers::Error),

    /// `alloy` signature error
    #[error(transparent)]
    SignatureError(#[from] alloy::primitives::SignatureError),

    #[error("Malformed signature: expected {SIGNATURE_LENGTH} bytes, got {length}")]
    MalformedSignature { length: usize },

    #[error("Non-canonical signature: s value is in the upper half of the curve order")]
    NonCanonicalSignature,

    #[error("Recovered signer {recovered} does not match expected signer {expected}")]
    SignerMismatch {
        expected: Address,
        recovered: Address,
    },
}

/// EIP712 signed message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Eip712SignedMessage<M: SolStruct> {
    /// Message to be signed
    pub message: M,
    /// ECDSA Signature of eip712 hash of message
    pub signature: Signature,
}

/// Returns an error if `s` is not in the lower half of the curve order.
fn ensure_canonical(signature: &Signature) -> Result<(), Eip712Error> {
    if signature.s() > SECP256K1_HALF_ORDER {
        return Err(Eip712Error::NonCanonicalSignature);
    }
    Ok(())
}

/// Recovers the address that produced `signature` over the already hashed `digest`.
///
/// High-`s` signatures are refused before recovery.
pub fn recover_prehash(signature: &Signature, digest: &B256) -> Result<Address, Eip712Error> {
    ensure_canonical(signature)?;
    Ok(signature.recover_address_from_prehash(digest)?)
}

impl<M: SolStruct> Eip712SignedMessage<M> {
    /// Creates a signed message with signed EIP712 hash of `message` using `signing_wallet`
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::WalletError`] if could not sign using the wallet
    ///
    pub fn new(
        domain_separator: &Eip712Domain,
        message: M,
        signing_wallet: &PrivateKeySigner,
    ) -> Result<Self, Eip712Error> {
        let recovery_message_hash = message.eip712_signing_hash(domain_separator);

        let signature = signing_wallet.sign_hash_sync(&recovery_message_hash)?;

        Ok(Self { message, signature })
    }

    /// Pairs `message` with a raw `r || s || v` signature blob.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::MalformedSignature`] if the blob is not exactly
    /// [`SIGNATURE_LENGTH`] bytes, [`Eip712Error::SignatureError`] if the parity byte is
    /// not a valid `v`, and [`Eip712Error::NonCanonicalSignature`] for high-`s` signatures.
    ///
    pub fn from_signature_bytes(message: M, signature: &[u8]) -> Result<Self, Eip712Error> {
        if signature.len() != SIGNATURE_LENGTH {
            return Err(Eip712Error::MalformedSignature {
                length: signature.len(),
            });
        }
        let signature = Signature::from_raw(signature)?;
        ensure_canonical(&signature)?;
        Ok(Self { message, signature })
    }

    /// EIP712 signing hash of the message under `domain_separator`.
    pub fn signing_hash(&self, domain_separator: &Eip712Domain) -> B256 {
        self.message.eip712_signing_hash(domain_separator)
    }

    /// Recovers and returns the signer of the message from the signature.
    pub fn recover_signer(&self, domain_separator: &Eip712Domain) -> Result<Address, Eip712Error> {
        let recovery_message_hash = self.signing_hash(domain_separator);
        recover_prehash(&self.signature, &recovery_message_hash)
    }

    /// Checks that the message was signed by `expected_address` under `domain_separator`.
    ///
    /// # Errors
    ///
    /// Returns [`Eip712Error::SignerMismatch`] if the recovered address from the
    /// signature is not equal to `expected_address`
    ///
    pub fn verify(
        &self,
        domain_separator: &Eip712Domain,
        expected_address: Address,
    ) -> Result<(), Eip712Error> {
        let recovered = self.recover_signer(domain_separator)?;
        if recovered != expected_address {
            return Err(Eip712Error::SignerMismatch {
                expected: expected_address,
                recovered,
            });
        }
        Ok(())
    }

    /// EIP-712 struct hash of the message. It leaves out the domain and the signature,
    /// so the same message signed by two wallets hashes the same.
    pub fn struct_hash(&self) -> B256 {
        self.message.eip712_hash_struct()
    }
}

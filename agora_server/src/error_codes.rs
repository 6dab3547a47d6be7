// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use agora_core::Error;

/// JSON-RPC error codes specific to the Agora settlement service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonRpcErrorCode {
    /// -32001 -- Invalid API version.
    InvalidVersion = -32001,
    /// -32002 -- Order signature does not recover to the order signer.
    InvalidSignature = -32002,
    /// -32003 -- Order start time is in the future.
    OrderNotActive = -32003,
    /// -32004 -- Order end time is in the past.
    OrderExpired = -32004,
    /// -32005 -- Order nonce or cancellation request rejected by the nonce rules.
    InvalidNonce = -32005,
    /// -32006 -- Collection supports neither asset standard.
    InvalidTokenAmount = -32006,
    /// -32007 -- Caller is not allowed to perform the operation.
    Unauthorized = -32007,
    /// -32008 -- A transfer leg failed; nothing was settled.
    SettlementFailed = -32008,
    /// -32009 -- Caller authorization is malformed or does not match the request.
    InvalidRequest = -32009,
    /// -32010 -- The exchange state could not be read or written.
    Internal = -32010,
}

impl From<&Error> for JsonRpcErrorCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::InvalidSignature { .. } => JsonRpcErrorCode::InvalidSignature,
            Error::OrderNotActive { .. } => JsonRpcErrorCode::OrderNotActive,
            Error::OrderExpired { .. } => JsonRpcErrorCode::OrderExpired,
            Error::InvalidNonce { .. } => JsonRpcErrorCode::InvalidNonce,
            Error::InvalidTokenAmount { .. } => JsonRpcErrorCode::InvalidTokenAmount,
            Error::Unauthorized { .. } => JsonRpcErrorCode::Unauthorized,
            Error::CurrencyTransferFailed { .. } | Error::AssetTransferFailed { .. } => {
                JsonRpcErrorCode::SettlementFailed
            }
            Error::AdapterError { .. } => JsonRpcErrorCode::Internal,
        }
    }
}

/// JSON-RPC warning codes
/// These are not part of the JSON-RPC spec, but are used to provide additional information to the
/// client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonRpcWarningCode {
    /// -32101 -- Requested API version is deprecated.
    DeprecatedVersion = -32101,
}

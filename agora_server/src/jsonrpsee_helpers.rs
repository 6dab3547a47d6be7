// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Response envelope shared by every method of the settlement API.

use serde::{Deserialize, Serialize};
use serde_json::value::Value;

use crate::{
    api_versioning::{agora_rpc_api_versions_info, AgoraRpcApiVersion},
    error_codes::{JsonRpcErrorCode, JsonRpcWarningCode},
};

/// Non-fatal notice attached to a successful response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JsonRpcWarning {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JsonRpcResponse<T: Serialize> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<JsonRpcWarning>>,
}

pub type JsonRpcError = jsonrpsee::types::ErrorObjectOwned;
pub type JsonRpcResult<T> = Result<JsonRpcResponse<T>, JsonRpcError>;

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_warnings(data, Vec::new())
    }

    /// The `warnings` field is left out of the payload when there is none.
    pub fn with_warnings(data: T, warnings: Vec<JsonRpcWarning>) -> Self {
        JsonRpcResponse {
            data,
            warnings: (!warnings.is_empty()).then_some(warnings),
        }
    }
}

impl JsonRpcWarning {
    pub fn new<S: Serialize>(code: JsonRpcWarningCode, message: String, data: Option<S>) -> Self {
        JsonRpcWarning {
            code: code as i32,
            message,
            data: data.and_then(|d| serde_json::to_value(&d).ok()),
        }
    }

    pub fn deprecated_version(api_version: &AgoraRpcApiVersion) -> Self {
        Self::new(
            JsonRpcWarningCode::DeprecatedVersion,
            format!(
                "The API version {api_version} will be deprecated. \
                 Call `api_versions` for the versions still supported."
            ),
            Some(agora_rpc_api_versions_info()),
        )
    }
}

/// Error object with optional structured `data`.
pub fn json_rpc_error<S: Serialize>(
    code: JsonRpcErrorCode,
    message: String,
    data: Option<S>,
) -> JsonRpcError {
    jsonrpsee::types::ErrorObject::owned(code as i32, message, data)
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn warnings_are_omitted_when_empty() {
        let json = serde_json::to_value(JsonRpcResponse::ok(7u8)).unwrap();
        assert_eq!(json, serde_json::json!({ "data": 7 }));
    }

    #[rstest]
    fn deprecation_warning_carries_versions() {
        let warning = JsonRpcWarning::deprecated_version(&AgoraRpcApiVersion::V0_1);
        assert_eq!(warning.code, JsonRpcWarningCode::DeprecatedVersion as i32);
        assert!(warning.data.unwrap().get("versions_supported").is_some());
    }

    #[rstest]
    fn error_code_is_numeric() {
        let error = json_rpc_error(JsonRpcErrorCode::InvalidNonce, "nope".to_owned(), None::<()>);
        assert_eq!(error.code(), -32005);
        assert_eq!(error.message(), "nope");
    }
}

// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{self, IntoEnumIterator};

/// The versions of the Agora JSON-RPC API implemented by this server.
/// The version numbers are independent of the crate versions, so the settlement library
/// can change without breaking the JSON-RPC API (or vice versa).
#[derive(
    Clone,
    Debug,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    strum::EnumIter,
)]
pub enum AgoraRpcApiVersion {
    #[strum(serialize = "0.1")]
    V0_1,
}

// Serialized through the `strum` strings (eg. "0.1") rather than the variant names
// `serde` would derive (eg. "V0_1").

impl Serialize for AgoraRpcApiVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> Deserialize<'de> for AgoraRpcApiVersion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<AgoraRpcApiVersion, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AgoraRpcApiVersion::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// RPC versions for which a deprecation warning is attached to every response.
pub static AGORA_RPC_API_VERSIONS_DEPRECATED: &[AgoraRpcApiVersion] = &[];

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AgoraRpcApiVersionsInfo {
    pub versions_supported: Vec<AgoraRpcApiVersion>,
    pub versions_deprecated: Vec<AgoraRpcApiVersion>,
}

pub fn agora_rpc_api_versions_info() -> AgoraRpcApiVersionsInfo {
    AgoraRpcApiVersionsInfo {
        versions_supported: AgoraRpcApiVersion::iter().collect::<Vec<_>>(),
        versions_deprecated: AGORA_RPC_API_VERSIONS_DEPRECATED.to_vec(),
    }
}

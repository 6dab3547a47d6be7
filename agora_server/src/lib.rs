// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

pub mod api_versioning;
pub mod error_codes;
pub mod genesis;
pub mod jsonrpsee_helpers;
pub mod metrics;
pub mod server;

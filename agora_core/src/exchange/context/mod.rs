// Copyright 2024-, Agora Exchange Contributors
// SPDX-License-Identifier: Apache-2.0

//! Context implementations for the Agora exchange.

pub mod memory;

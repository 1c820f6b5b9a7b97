// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations.

pub mod panel;
pub mod start;
pub mod status;
pub mod stop;

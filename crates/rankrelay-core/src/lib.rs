// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rankrelay core: ranking-table field resolution, local accumulation and CSV export.

pub mod export;
pub mod panel;
pub mod resolver;
pub mod store;
pub mod types;

pub use export::{escape_field, export, export_dated, export_file_name, render_csv, ExportOutcome};
pub use panel::{PanelRegistry, StatusPanel, DEFAULT_PANEL_ID};
pub use resolver::{ExtractError, FromRankTable, ACCOUNT_LAYOUT, NOTE_LAYOUT};
pub use store::{
    AccumulationStore, Drain, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore,
    MergeOutcome,
};
pub use types::*;

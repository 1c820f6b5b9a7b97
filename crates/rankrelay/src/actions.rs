// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Panel actions: collect, export, clear and sync.
//!
//! Every action ends by writing one status line and the cached row count to
//! its [`StatusPanel`]. Failures are reported there too; nothing escapes as
//! an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rankrelay_core::{
    export, AccountRecord, AccumulationStore, Category, FromRankTable, NoteRecord, StatusPanel,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::RelayChannel;
use crate::error::ChannelError;
use crate::protocol::{Destination, Endpoint, RelayRequest, RelayResult};

/// What an action did, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub ok: bool,
    pub category: Category,
    pub status: String,
    /// Rows left in the category buffer afterwards.
    pub cached: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RelayResult>,
}

/// Phases of one sync action, logged as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Requested,
    Dispatched,
    Awaiting,
    Succeeded,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncPhase::Requested => "requested",
            SyncPhase::Dispatched => "dispatched",
            SyncPhase::Awaiting => "awaiting",
            SyncPhase::Succeeded => "succeeded",
            SyncPhase::Failed => "failed",
        })
    }
}

/// Terminal state of a sync action.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The buffer was empty; nothing was dispatched.
    NothingToSend,
    /// The relay could not be reached or never answered.
    ChannelFailed(ChannelError),
    /// The relay answered with `ok: false`.
    Rejected(RelayResult),
    Succeeded(RelayResult),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Succeeded(_))
    }

    /// Status line for this outcome.
    pub fn status_text(&self, category: Category) -> String {
        match self {
            SyncOutcome::NothingToSend => "Nothing to send, collect some rows first.".to_string(),
            SyncOutcome::ChannelFailed(_) => {
                "Cannot reach the relay, restart it and retry.".to_string()
            }
            SyncOutcome::Rejected(result) => match result.error() {
                Some(message) if !message.is_empty() => message.to_string(),
                _ => format!(
                    "Upload of the {category} rank failed, check the local service or its configuration."
                ),
            },
            SyncOutcome::Succeeded(result) => match result.inserted() {
                Some(inserted) => format!(
                    "Saved {category} rank: {} records inserted into the local database.",
                    count_text(Some(inserted))
                ),
                None => format!(
                    "Uploaded {category} rank: {} records added to the remote table.",
                    count_text(result.uploaded())
                ),
            },
        }
    }

    fn into_result(self) -> Option<RelayResult> {
        match self {
            SyncOutcome::Rejected(result) | SyncOutcome::Succeeded(result) => Some(result),
            SyncOutcome::NothingToSend | SyncOutcome::ChannelFailed(_) => None,
        }
    }
}

/// A sink count as shown in a status line. Missing, zero or empty reads as 0.
fn count_text(count: Option<&Value>) -> String {
    match count {
        Some(Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(whole), _) => whole.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => "0".to_string(),
    }
}

/// The buttons of one collection panel.
pub struct RankActions {
    store: Arc<AccumulationStore>,
    panel: Arc<StatusPanel>,
}

impl RankActions {
    pub fn new(store: Arc<AccumulationStore>, panel: Arc<StatusPanel>) -> Self {
        Self { store, panel }
    }

    pub fn panel(&self) -> &StatusPanel {
        &self.panel
    }

    /// Extract the ranking table from `html` and append its rows to the buffer.
    pub async fn collect(
        &self,
        category: Category,
        html: &str,
        base_url: Option<&Url>,
    ) -> ActionReport {
        match category {
            Category::Note => self.collect_as::<NoteRecord>(html, base_url).await,
            Category::Account => self.collect_as::<AccountRecord>(html, base_url).await,
        }
    }

    async fn collect_as<R: FromRankTable>(&self, html: &str, base_url: Option<&Url>) -> ActionReport {
        let category = R::CATEGORY;
        self.panel.set_status("Collecting the current page...");

        let mut records = match R::extract(html, base_url) {
            Ok(records) => records,
            Err(e) => return self.finish(category, false, e.to_string()).await,
        };

        let today = Local::now().format("%Y-%m-%d").to_string();
        for record in &mut records {
            record.set_fetch_date(&today);
        }

        match self.store.merge(records).await {
            Ok(outcome) => {
                let status = format!(
                    "Page collected: {} new rows, {} total.",
                    outcome.inserted.len(),
                    outcome.merged.len()
                );
                self.finish(category, true, status).await
            }
            Err(e) => {
                self.finish(category, false, format!("Could not save the collected rows: {e}"))
                    .await
            }
        }
    }

    /// Write the buffer as CSV into `out_dir` and clear it.
    pub async fn export(&self, category: Category, out_dir: &Path) -> ActionReport {
        self.panel.set_status("Exporting CSV...");

        let exported = match category {
            Category::Note => export::<NoteRecord>(&self.store, out_dir).await,
            Category::Account => export::<AccountRecord>(&self.store, out_dir).await,
        };

        match exported {
            Ok(Some(outcome)) => {
                let status = format!(
                    "Exported {} rows to {}, cache cleared.",
                    outcome.rows,
                    outcome.path.display()
                );
                let mut report = self.finish(category, true, status).await;
                report.file = Some(outcome.path);
                report
            }
            Ok(None) => {
                self.finish(category, false, "Nothing to export, collect some rows first.")
                    .await
            }
            Err(e) => self.finish(category, false, format!("Export failed: {e}")).await,
        }
    }

    /// Empty the category buffer.
    pub async fn clear(&self, category: Category) -> ActionReport {
        match self.store.clear(category).await {
            Ok(()) => self.finish(category, true, "Cache cleared.").await,
            Err(e) => {
                self.finish(category, false, format!("Could not clear the cache: {e}"))
                    .await
            }
        }
    }

    /// Report how many rows are buffered.
    pub async fn count(&self, category: Category) -> ActionReport {
        match self.store.count(category).await {
            Ok(n) => self.finish(category, true, format!("{n} rows cached.")).await,
            Err(e) => {
                self.finish(category, false, format!("Could not read the cache: {e}"))
                    .await
            }
        }
    }

    /// Send the buffer to the relay. The buffer is kept whatever the outcome.
    pub async fn sync(
        &self,
        category: Category,
        destination: Destination,
        channel: &dyn RelayChannel,
        timeout: Duration,
    ) -> ActionReport {
        let endpoint = Endpoint::new(category, destination);
        self.panel.set_status(match destination {
            Destination::Upload => format!("Uploading the {category} rank..."),
            Destination::DbOnly => format!("Saving the {category} rank to the local database..."),
        });
        debug!(phase = %SyncPhase::Requested, %endpoint, "sync");

        let rows = match self.store.read_raw(category).await {
            Ok(rows) => rows,
            Err(e) => {
                return self
                    .finish(category, false, format!("Could not read the cache: {e}"))
                    .await
            }
        };

        let outcome = if rows.is_empty() {
            SyncOutcome::NothingToSend
        } else {
            let request = RelayRequest::upload(endpoint, rows);
            debug!(
                phase = %SyncPhase::Dispatched,
                id = request.id.as_deref().unwrap_or("-"),
                rows = request.rows.len(),
                "sync"
            );
            debug!(phase = %SyncPhase::Awaiting, ?timeout, "sync");
            match channel.send(request, timeout).await {
                Ok(result) if result.is_success() => SyncOutcome::Succeeded(result),
                Ok(result) => SyncOutcome::Rejected(result),
                Err(e) => {
                    tracing::warn!("relay channel failed: {e}");
                    SyncOutcome::ChannelFailed(e)
                }
            }
        };

        let phase = if outcome.is_success() {
            SyncPhase::Succeeded
        } else {
            SyncPhase::Failed
        };
        debug!(%phase, %endpoint, "sync");

        let ok = outcome.is_success();
        let status = outcome.status_text(category);
        let mut report = self.finish(category, ok, status).await;
        report.result = outcome.into_result();
        report
    }

    async fn finish(&self, category: Category, ok: bool, status: impl Into<String>) -> ActionReport {
        let status = status.into();
        let cached = self.store.count(category).await.unwrap_or(0);
        self.panel.set_row_count(cached);
        self.panel.set_status(status.clone());
        ActionReport {
            ok,
            category,
            status,
            cached,
            file: None,
            result: None,
        }
    }
}

// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! CSV export of an accumulated category buffer.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use crate::store::AccumulationStore;
use crate::types::{Category, CoreResult, RankRecord};

const LINE_END: &str = "\r\n";

/// A file written by [`export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub rows: usize,
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"')
}

/// Escape one field: newlines become spaces, then quote only when the field
/// holds a comma or a double quote.
pub fn escape_field(raw: &str) -> String {
    let flat = raw.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let flat = flat.trim();
    if needs_quotes(flat) {
        format!("\"{}\"", flat.replace('"', "\"\""))
    } else {
        flat.to_string()
    }
}

fn render_line<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    cells
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",")
}

/// Render records as CSV text: header line, then one 1-based ordinal line per record.
pub fn render_csv<R: RankRecord>(records: &[R]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(render_line(R::CSV_HEADER.iter().copied()));

    for (i, record) in records.iter().enumerate() {
        let ordinal = (i + 1).to_string();
        let cells = std::iter::once(ordinal.as_str()).chain(record.csv_fields());
        lines.push(render_line(cells));
    }

    lines.join(LINE_END)
}

/// `xhs_note_rank_20251101.csv` style file name.
pub fn export_file_name(category: Category, date: NaiveDate) -> String {
    format!("xhs_{}_rank_{}.csv", category, date.format("%Y%m%d"))
}

/// Export the category buffer into `out_dir` and clear it, dated today.
///
/// Returns `None` without touching the store or the filesystem when the
/// buffer is empty.
pub async fn export<R: RankRecord>(
    store: &AccumulationStore,
    out_dir: &Path,
) -> CoreResult<Option<ExportOutcome>> {
    export_dated::<R>(store, out_dir, Local::now().date_naive()).await
}

/// Same as [`export`] with an explicit date for the file name.
///
/// The category stays locked from the read until the buffer is emptied, so a
/// merge racing the export lands after it and is kept.
pub async fn export_dated<R: RankRecord>(
    store: &AccumulationStore,
    out_dir: &Path,
    date: NaiveDate,
) -> CoreResult<Option<ExportOutcome>> {
    let drain = store.drain::<R>().await?;
    if drain.is_empty() {
        tracing::debug!(category = %R::CATEGORY, "nothing to export");
        return Ok(None);
    }

    tokio::fs::create_dir_all(out_dir).await?;
    let path = out_dir.join(export_file_name(R::CATEGORY, date));
    tokio::fs::write(&path, render_csv(drain.records())).await?;

    // Only a written file empties the buffer.
    let records = drain.commit().await?;

    tracing::info!(
        category = %R::CATEGORY,
        rows = records.len(),
        path = %path.display(),
        "exported csv"
    );

    Ok(Some(ExportOutcome {
        path,
        rows: records.len(),
    }))
}

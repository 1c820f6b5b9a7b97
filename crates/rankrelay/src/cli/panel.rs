// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Panel commands: one per button.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rankrelay::actions::{ActionReport, RankActions};
use rankrelay::client::SocketChannel;
use rankrelay::config::RelayConfig;
use rankrelay::protocol::Destination;
use rankrelay_core::{AccumulationStore, Category, PanelRegistry, DEFAULT_PANEL_ID};
use url::Url;

fn actions(config: &RelayConfig) -> RankActions {
    let registry = PanelRegistry::new();
    let store = Arc::new(AccumulationStore::open(&config.store_dir));
    RankActions::new(store, registry.mount(DEFAULT_PANEL_ID))
}

/// Print a report and turn a failed action into a non-zero exit.
fn emit(report: ActionReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.status);
        println!("  Cached {} rows: {}", report.category, report.cached);
    }
    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn collect(
    config: &RelayConfig,
    category: Category,
    html_path: &Path,
    base_url: Option<&str>,
    json: bool,
) -> Result<()> {
    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("failed to read {}", html_path.display()))?;
    let base_url = base_url
        .map(Url::parse)
        .transpose()
        .context("invalid --base-url")?;

    let report = actions(config)
        .collect(category, &html, base_url.as_ref())
        .await;
    emit(report, json)
}

pub async fn export(config: &RelayConfig, category: Category, out_dir: &Path, json: bool) -> Result<()> {
    let report = actions(config).export(category, out_dir).await;
    emit(report, json)
}

pub async fn clear(config: &RelayConfig, category: Category, json: bool) -> Result<()> {
    let report = actions(config).clear(category).await;
    emit(report, json)
}

pub async fn count(config: &RelayConfig, category: Category, json: bool) -> Result<()> {
    let report = actions(config).count(category).await;
    emit(report, json)
}

pub async fn sync(
    config: &RelayConfig,
    category: Category,
    destination: Destination,
    json: bool,
) -> Result<()> {
    let channel = SocketChannel::new(&config.socket_path);
    let report = actions(config)
        .sync(category, destination, &channel, config.timeout)
        .await;
    emit(report, json)
}

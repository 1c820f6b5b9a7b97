// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Locate the ranking table inside a parsed page and split it into rows.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::columns::{resolve_columns, ColumnMap, Role, RoleRule};
use super::ExtractError;

/// Where a ranking table lives and how its columns are recognized.
#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    /// Container name reported when no root matches.
    pub container: &'static str,
    /// Page name reported when the table or its entity column is missing.
    pub page: &'static str,
    /// Entity column name reported when it cannot be resolved.
    pub primary_column: &'static str,
    /// Root selectors, most specific first.
    pub root_selectors: &'static [&'static str],
    pub rules: &'static [RoleRule],
}

/// Data rows of a located table, sentinel row already dropped.
pub(crate) struct RankTable<'a> {
    pub columns: ColumnMap,
    pub rows: Vec<Vec<ElementRef<'a>>>,
}

impl<'a> RankTable<'a> {
    /// Entity cell of a row. Present for every row whose width reaches it.
    pub fn primary_cell(&self, cells: &[ElementRef<'a>]) -> Option<ElementRef<'a>> {
        self.columns
            .get(Role::Primary)
            .and_then(|idx| cells.get(idx).copied())
    }

    /// Cleaned text of the cell resolved for `role`, or empty.
    pub fn text_of(&self, cells: &[ElementRef<'a>], role: Role) -> String {
        self.columns
            .get(role)
            .and_then(|idx| cells.get(idx))
            .map(|cell| element_text(*cell))
            .unwrap_or_default()
    }
}

pub(crate) fn locate<'a>(
    document: &'a Html,
    layout: &PageLayout,
) -> Result<RankTable<'a>, ExtractError> {
    let root = layout
        .root_selectors
        .iter()
        .find_map(|css| select_in_document(document, css))
        .ok_or(ExtractError::ContainerNotFound(layout.container))?;

    let table = find_table(root).ok_or(ExtractError::TableNotFound(layout.page))?;

    let headers: Vec<String> = select_all(table, "thead tr th, thead tr td")
        .into_iter()
        .map(|cell| cell.text().collect::<String>())
        .collect();
    if headers.is_empty() {
        return Err(ExtractError::HeaderNotFound);
    }

    let columns = resolve_columns(&headers, layout.rules);
    if columns.get(Role::Primary).is_none() {
        return Err(ExtractError::PrimaryColumnNotFound {
            column: layout.primary_column,
            page: layout.page,
        });
    }

    let tbody = select_first(table, "tbody").ok_or(ExtractError::BodyNotFound)?;

    // The first non-empty row of every page is the operator's own listing.
    let rows: Vec<Vec<ElementRef<'a>>> = select_all(tbody, "tr")
        .into_iter()
        .map(|tr| select_all(tr, "td"))
        .filter(|cells| !cells.is_empty())
        .skip(1)
        .collect();

    tracing::debug!(
        page = layout.page,
        columns = columns.len(),
        rows = rows.len(),
        "located ranking table"
    );

    Ok(RankTable { columns, rows })
}

fn find_table(root: ElementRef<'_>) -> Option<ElementRef<'_>> {
    select_first(root, "table")
        .or_else(|| select_first(root, ".d-table table"))
        .or_else(|| {
            let tbody = select_first(root, "tbody")?;
            tbody
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "table")
        })
}

fn select_in_document<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    document.select(&sel).next()
}

/// First descendant of `scope` matching `css`. Invalid selectors match nothing.
pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    scope.select(&sel).find(|el| el.id() != scope.id())
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => scope
            .select(&sel)
            .filter(|el| el.id() != scope.id())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// First match of an ordered selector fallback chain.
pub(crate) fn first_of<'a>(scope: ElementRef<'a>, chain: &[&str]) -> Option<ElementRef<'a>> {
    chain.iter().find_map(|css| select_first(scope, css))
}

/// Collapse whitespace runs to one space and trim.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// `href` of the first anchor matching `css`, resolved against `base` when given.
pub(crate) fn link_of(scope: ElementRef<'_>, css: &str, base: Option<&Url>) -> String {
    let Some(href) = select_first(scope, css).and_then(|a| a.value().attr("href")) else {
        return String::new();
    };
    match base {
        Some(base) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

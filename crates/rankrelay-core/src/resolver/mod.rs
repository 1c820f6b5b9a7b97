// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Field resolver: extract ranking records from a rendered page snapshot.
//!
//! The host page's markup is not under our control. The resolver locates the
//! table through ordered selector fallbacks, maps column roles from header
//! keywords, and transcribes cell text verbatim (whitespace-collapsed).
//! Only structural failures (container, table, header, entity column, body)
//! abort an extraction; a row missing individual cells still yields a record
//! with empty fields.

pub mod columns;
pub mod table;

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;
use url::Url;

use crate::types::{AccountRecord, NoteRecord, RankRecord};
use columns::{Role, ACCOUNT_RULES, NOTE_RULES};
use table::{element_text, first_of, link_of, locate, PageLayout};

pub use columns::{normalize_header, resolve_columns, ColumnMap, RoleRule};
pub use table::clean_text;

/// A structural expectation about the page that did not hold.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// No root selector of the layout matched. The built-in layouts end with
    /// `body`, which every parsed document has, so only a custom layout
    /// without that catch-all can report this.
    #[error("{0} container not found")]
    ContainerNotFound(&'static str),

    #[error("table not found, make sure the {0} page is open")]
    TableNotFound(&'static str),

    #[error("table header not found, make sure the page has fully loaded")]
    HeaderNotFound,

    #[error("\"{column}\" column not found, make sure the current table is the {page}")]
    PrimaryColumnNotFound {
        column: &'static str,
        page: &'static str,
    },

    #[error("table body (tbody) not found")]
    BodyNotFound,
}

/// The trailing `body` root searches the whole page when the panel wrapper
/// is missing, so a missing table reports [`ExtractError::TableNotFound`].
pub const NOTE_LAYOUT: PageLayout = PageLayout {
    container: "note-rank",
    page: "note rank",
    primary_column: "note",
    root_selectors: &[".note-rank", "[data-v-7d4260ee] .note-rank", "body"],
    rules: NOTE_RULES,
};

pub const ACCOUNT_LAYOUT: PageLayout = PageLayout {
    container: "account-rank",
    page: "account rank",
    primary_column: "account",
    root_selectors: &[".account-rank", "[data-v-7d4260ee] .account-rank", "body"],
    rules: ACCOUNT_RULES,
};

/// A record type that can be read out of its ranking page.
pub trait FromRankTable: RankRecord + Sized {
    /// Extract every non-sentinel data row of `html`.
    ///
    /// `base_url` is the page address; outbound links are resolved against
    /// it the way a browser resolves `a.href`.
    fn extract(html: &str, base_url: Option<&Url>) -> Result<Vec<Self>, ExtractError>;
}

impl FromRankTable for NoteRecord {
    fn extract(html: &str, base_url: Option<&Url>) -> Result<Vec<Self>, ExtractError> {
        let document = Html::parse_document(html);
        let table = locate(&document, &NOTE_LAYOUT)?;

        let records = table
            .rows
            .iter()
            .map(|cells| {
                let cell = table.primary_cell(cells);

                let title = match cell {
                    Some(c) => first_of(c, &[".note-title-wrapper .title", ".title", "a"])
                        .map(element_text)
                        .unwrap_or_else(|| element_text(c)),
                    None => String::new(),
                };
                let nickname = cell
                    .and_then(|c| first_of(c, &[".anchor-info .anchor-name", ".anchor-name"]))
                    .map(element_text)
                    .unwrap_or_default();
                let publish_time = cell
                    .and_then(|c| first_of(c, &[".note-time", ".publish-time"]))
                    .map(|el| strip_publish_label(&element_text(el)))
                    .unwrap_or_default();
                let note_url = cell
                    .map(|c| link_of(c, "a[href*='/note/'], a[href*='/notes/']", base_url))
                    .unwrap_or_default();

                NoteRecord {
                    title,
                    nickname,
                    publish_time,
                    read_count: table.text_of(cells, Role::ReadCount),
                    click_rate: table.text_of(cells, Role::ClickRate),
                    pay_conversion_rate: table.text_of(cells, Role::PayConversionRate),
                    gmv: table.text_of(cells, Role::Gmv),
                    note_url,
                    fetch_date: String::new(),
                }
            })
            .collect();

        Ok(records)
    }
}

impl FromRankTable for AccountRecord {
    fn extract(html: &str, base_url: Option<&Url>) -> Result<Vec<Self>, ExtractError> {
        let document = Html::parse_document(html);
        let table = locate(&document, &ACCOUNT_LAYOUT)?;

        let records = table
            .rows
            .iter()
            .map(|cells| {
                let cell = table.primary_cell(cells);

                let shop_name = match cell {
                    Some(c) => first_of(
                        c,
                        &[".shop-name", ".anchor-info .anchor-name", ".anchor-name", "a"],
                    )
                    .map(element_text)
                    .unwrap_or_else(|| element_text(c)),
                    None => String::new(),
                };
                let account_url = cell
                    .map(|c| link_of(c, "a[href*='/shop/'], a[href*='/user/']", base_url))
                    .unwrap_or_default();

                AccountRecord {
                    shop_name,
                    fans_count: table.text_of(cells, Role::FansCount),
                    read_count: table.text_of(cells, Role::ReadCount),
                    click_rate: table.text_of(cells, Role::ClickRate),
                    pay_conversion_rate: table.text_of(cells, Role::PayConversionRate),
                    gmv: table.text_of(cells, Role::Gmv),
                    account_url,
                    fetch_date: String::new(),
                }
            })
            .collect();

        Ok(records)
    }
}

/// Drop everything up to and including the "发布时间" label.
pub fn strip_publish_label(text: &str) -> String {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    let re = LABEL.get_or_init(|| {
        Regex::new(r"^.*?发布时间[:：]?\s*").expect("publish label regex is valid")
    });
    re.replace(text, "").trim().to_string()
}

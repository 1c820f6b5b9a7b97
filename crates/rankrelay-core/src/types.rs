// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core data types for collected ranking records.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::resolver::ExtractError;

/// One of the two ranking domains, each with its own buffer and endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Note,
    Account,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Note, Category::Account];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Note => "note",
            Category::Account => "account",
        }
    }

    /// Key of this category's buffer in the accumulation store.
    pub fn storage_key(&self) -> &'static str {
        match self {
            Category::Note => "xhsNoteRankRows",
            Category::Account => "xhsAccountRankRows",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "note" | "notes" => Ok(Category::Note),
            "account" | "accounts" => Ok(Category::Account),
            other => Err(CoreError::UnknownCategory(other.to_string())),
        }
    }
}

/// A row of the note ranking ("content rank") table.
///
/// Every field is the cell text as displayed. A cell that could not be
/// located is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteRecord {
    pub title: String,
    pub nickname: String,
    pub publish_time: String,
    pub read_count: String,
    pub click_rate: String,
    pub pay_conversion_rate: String,
    pub gmv: String,
    pub note_url: String,
    pub fetch_date: String,
}

/// A row of the account ranking ("deal rank") table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountRecord {
    pub shop_name: String,
    pub fans_count: String,
    pub read_count: String,
    pub click_rate: String,
    pub pay_conversion_rate: String,
    pub gmv: String,
    pub account_url: String,
    pub fetch_date: String,
}

/// Ties a record type to its category and its fixed CSV layout.
pub trait RankRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const CATEGORY: Category;

    /// CSV header row, ordinal column first.
    const CSV_HEADER: &'static [&'static str];

    /// Field values in CSV order, without the ordinal.
    fn csv_fields(&self) -> Vec<&str>;

    fn set_fetch_date(&mut self, date: &str);
}

impl RankRecord for NoteRecord {
    const CATEGORY: Category = Category::Note;

    const CSV_HEADER: &'static [&'static str] = &[
        "排名",
        "笔记标题",
        "账号昵称",
        "发布时间",
        "笔记阅读数",
        "笔记商品点击率",
        "笔记支付转化率",
        "笔记成交金额（元）",
        "获取时间",
    ];

    fn csv_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.nickname.as_str(),
            self.publish_time.as_str(),
            self.read_count.as_str(),
            self.click_rate.as_str(),
            self.pay_conversion_rate.as_str(),
            self.gmv.as_str(),
            self.fetch_date.as_str(),
        ]
    }

    fn set_fetch_date(&mut self, date: &str) {
        self.fetch_date = date.to_string();
    }
}

impl RankRecord for AccountRecord {
    const CATEGORY: Category = Category::Account;

    const CSV_HEADER: &'static [&'static str] = &[
        "排名",
        "店铺名",
        "粉丝数",
        "笔记阅读数",
        "笔记商品点击率",
        "笔记支付转化率",
        "笔记成交金额（元）",
        "获取时间",
    ];

    fn csv_fields(&self) -> Vec<&str> {
        vec![
            self.shop_name.as_str(),
            self.fans_count.as_str(),
            self.read_count.as_str(),
            self.click_rate.as_str(),
            self.pay_conversion_rate.as_str(),
            self.gmv.as_str(),
            self.fetch_date.as_str(),
        ]
    }

    fn set_fetch_date(&mut self, date: &str) {
        self.fetch_date = date.to_string();
    }
}

/// Errors that can occur in the core library.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// Convenience result type.
pub type CoreResult<T> = Result<T, CoreError>;

// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Header-keyword column resolution.
//!
//! Maps semantic column roles onto physical column indices by matching the
//! header text of a ranking table against an ordered list of rules. This is a
//! pure function over header strings so it can be exercised without a DOM.

use std::collections::HashMap;

/// Semantic role of a ranking-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The entity column (note or account). Title, nickname, publish time
    /// and outbound links live inside this cell.
    Primary,
    ReadCount,
    ClickRate,
    PayConversionRate,
    Gmv,
    FansCount,
}

/// A (role, predicate) pair. The predicate receives normalized header text.
#[derive(Clone, Copy)]
pub struct RoleRule {
    pub role: Role,
    pub matches: fn(&str) -> bool,
}

impl std::fmt::Debug for RoleRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRule").field("role", &self.role).finish()
    }
}

const NOTE_METRIC_KEYWORDS: &[&str] = &["阅读", "商品", "支付", "成交"];
const ACCOUNT_METRIC_KEYWORDS: &[&str] = &["粉丝", "阅读", "商品", "支付", "成交"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn is_note_primary(text: &str) -> bool {
    text.contains("笔记") && !contains_any(text, NOTE_METRIC_KEYWORDS)
}

fn is_account_primary(text: &str) -> bool {
    (text.contains("账号") || text.contains("店铺")) && !contains_any(text, ACCOUNT_METRIC_KEYWORDS)
}

fn is_read_count(text: &str) -> bool {
    text.contains("阅读")
}

fn is_click_rate(text: &str) -> bool {
    text.contains("商品") && text.contains("点击")
}

fn is_pay_conversion_rate(text: &str) -> bool {
    text.contains("支付") && text.contains("转化")
}

fn is_gmv(text: &str) -> bool {
    text.contains("成交") && text.contains("金额")
}

fn is_fans_count(text: &str) -> bool {
    text.contains("粉丝")
}

/// Rules for the note ranking table, in evaluation order.
pub const NOTE_RULES: &[RoleRule] = &[
    RoleRule { role: Role::Primary, matches: is_note_primary },
    RoleRule { role: Role::ReadCount, matches: is_read_count },
    RoleRule { role: Role::ClickRate, matches: is_click_rate },
    RoleRule { role: Role::PayConversionRate, matches: is_pay_conversion_rate },
    RoleRule { role: Role::Gmv, matches: is_gmv },
];

/// Rules for the account ranking table, in evaluation order.
pub const ACCOUNT_RULES: &[RoleRule] = &[
    RoleRule { role: Role::Primary, matches: is_account_primary },
    RoleRule { role: Role::FansCount, matches: is_fans_count },
    RoleRule { role: Role::ReadCount, matches: is_read_count },
    RoleRule { role: Role::ClickRate, matches: is_click_rate },
    RoleRule { role: Role::PayConversionRate, matches: is_pay_conversion_rate },
    RoleRule { role: Role::Gmv, matches: is_gmv },
];

/// Strip all whitespace, byte order marks and U+FFFD replacement characters.
pub fn normalize_header(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !matches!(*c, '\u{FEFF}' | '\u{FFFD}'))
        .collect()
}

/// Resolved role → column index mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: HashMap<Role, usize>,
}

impl ColumnMap {
    pub fn get(&self, role: Role) -> Option<usize> {
        self.indices.get(&role).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Scan headers once, left to right.
///
/// Each header is claimed by the first rule whose predicate matches; each
/// role keeps the first index that claimed it.
pub fn resolve_columns<S: AsRef<str>>(headers: &[S], rules: &[RoleRule]) -> ColumnMap {
    let mut map = ColumnMap::default();

    for (index, raw) in headers.iter().enumerate() {
        let text = normalize_header(raw.as_ref());
        if text.is_empty() {
            continue;
        }
        if let Some(rule) = rules.iter().find(|r| (r.matches)(&text)) {
            map.indices.entry(rule.role).or_insert(index);
        }
    }

    map
}

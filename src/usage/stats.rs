//! Usage statistics
//!
//! Counters are authoritative for totals. The history log only started
//! recording at some point in a shortcut's life, so "taps this month" is an
//! estimate for shortcuts created before the current month: taps present in
//! the counter but missing from the log are assumed to be spread uniformly
//! over the shortcut's lifetime, and the share falling into the elapsed part
//! of this month is added to the logged taps of this month. This is a display
//! heuristic, not an exact count.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::history::UsageRecord;
use crate::shortcuts::{Shortcut, ShortcutKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutUsage {
    pub id: String,
    pub name: String,
    pub kind: ShortcutKind,
    pub usage_count: u64,
    pub taps_this_month: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_shortcuts: usize,
    pub total_taps: u64,
    pub taps_this_month: u64,
    /// Most used first, ties broken by name
    pub top: Vec<ShortcutUsage>,
}

/// Start of the calendar month containing `now`, in UTC
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Estimated taps of one shortcut in the current month. See the module docs.
pub fn estimate_taps_this_month(
    shortcut: &Shortcut,
    logged_total: u64,
    logged_this_month: u64,
    now: DateTime<Utc>,
) -> u64 {
    let now_ms = now.timestamp_millis();
    let month_start_ms = month_start(now).timestamp_millis();
    if shortcut.created_at >= month_start_ms {
        return logged_this_month;
    }

    let unlogged = shortcut.usage_count.saturating_sub(logged_total);
    if unlogged == 0 {
        return logged_this_month;
    }
    let lifetime = (now_ms - shortcut.created_at).max(1) as f64;
    let elapsed = (now_ms - month_start_ms).max(0) as f64;
    let share = (unlogged as f64 * elapsed / lifetime).round() as u64;
    logged_this_month + share.min(unlogged)
}

pub fn compute_stats(
    shortcuts: &[Shortcut],
    history: &[UsageRecord],
    now: DateTime<Utc>,
    top_n: usize,
) -> UsageStats {
    let month_start_ms = month_start(now).timestamp_millis();
    let now_ms = now.timestamp_millis();

    // The same tap can be logged twice if a drain is retried
    let mut seen: HashSet<(&str, i64)> = HashSet::new();
    let mut logged_total: HashMap<&str, u64> = HashMap::new();
    let mut logged_month: HashMap<&str, u64> = HashMap::new();
    for record in history {
        if !seen.insert((record.shortcut_id.as_str(), record.timestamp)) {
            continue;
        }
        *logged_total.entry(record.shortcut_id.as_str()).or_default() += 1;
        if record.timestamp >= month_start_ms && record.timestamp <= now_ms {
            *logged_month.entry(record.shortcut_id.as_str()).or_default() += 1;
        }
    }

    let mut usage: Vec<ShortcutUsage> = shortcuts
        .iter()
        .map(|s| {
            let total = logged_total.get(s.id.as_str()).copied().unwrap_or(0);
            let month = logged_month.get(s.id.as_str()).copied().unwrap_or(0);
            ShortcutUsage {
                id: s.id.clone(),
                name: s.name.clone(),
                kind: s.kind,
                usage_count: s.usage_count,
                taps_this_month: estimate_taps_this_month(s, total, month, now),
            }
        })
        .collect();

    let total_taps: u64 = usage.iter().map(|u| u.usage_count).sum();
    let taps_this_month: u64 = usage.iter().map(|u| u.taps_this_month).sum();

    usage.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    usage.retain(|u| u.usage_count > 0);
    usage.truncate(top_n);

    UsageStats {
        total_shortcuts: shortcuts.len(),
        total_taps,
        taps_this_month,
        top: usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortcuts::ShortcutDraft;
    use crate::usage::UsageSource;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn shortcut(id: &str, created: DateTime<Utc>, usage_count: u64) -> Shortcut {
        let mut s = ShortcutDraft::new(id, ShortcutKind::Link, "https://example.com")
            .into_shortcut(id.to_string(), created.timestamp_millis());
        s.usage_count = usage_count;
        s
    }

    fn tap(id: &str, when: DateTime<Utc>) -> UsageRecord {
        UsageRecord::new(id, when.timestamp_millis(), UsageSource::UiTap)
    }

    #[test]
    fn test_new_shortcut_uses_logged_taps_only() {
        let now = at(2026, 3, 20);
        let s = shortcut("a", at(2026, 3, 10), 9);
        assert_eq!(estimate_taps_this_month(&s, 2, 2, now), 2);
    }

    #[test]
    fn test_old_shortcut_spreads_unlogged_taps_over_lifetime() {
        // Created 2026-01-01, now 2026-03-11: 69 days of lifetime, 10 this month
        let now = at(2026, 3, 11);
        let s = shortcut("a", at(2026, 1, 1), 69);
        assert_eq!(estimate_taps_this_month(&s, 0, 0, now), 10);
        // Fully logged counters need no estimate
        let logged = shortcut("b", at(2026, 1, 1), 3);
        assert_eq!(estimate_taps_this_month(&logged, 3, 1, now), 1);
    }

    #[test]
    fn test_compute_stats_dedups_and_ranks() {
        let now = at(2026, 3, 20);
        let shortcuts = vec![
            shortcut("docs", at(2026, 3, 1), 2),
            shortcut("mail", at(2026, 3, 2), 5),
            shortcut("idle", at(2026, 3, 3), 0),
        ];
        let history = vec![
            tap("docs", at(2026, 3, 5)),
            tap("docs", at(2026, 3, 5)),
            tap("mail", at(2026, 3, 6)),
            tap("gone", at(2026, 3, 7)),
        ];

        let stats = compute_stats(&shortcuts, &history, now, 5);

        assert_eq!(stats.total_shortcuts, 3);
        assert_eq!(stats.total_taps, 7);
        assert_eq!(stats.taps_this_month, 2);
        let ids: Vec<&str> = stats.top.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["mail", "docs"]);
    }
}

//! Per-subject version history, layered on top of the triple store.
//!
//! A regulatory subject (an article, a motion) is rarely a single
//! timeless fact: it has a sequence of versions, each valid over some
//! interval. This module tracks that sequence independently of the
//! triples themselves so the query layer can ask "what did this look
//! like as of 2021-03-01" without the store having to version every
//! triple individually.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

/// Where a version sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionStatus {
    Draft,
    Active,
    Superseded,
    Withdrawn,
}

/// One recorded version of a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
    pub uri: String,
    pub version: u32,
    pub valid_from: DateTime<Utc>,
    /// `None` means "still in force" — the current version.
    pub valid_until: Option<DateTime<Utc>>,
    pub status: VersionStatus,
    pub meeting_uri: Option<String>,
    pub supersedes_uri: Option<String>,
}

impl VersionInfo {
    fn covers(&self, at: DateTime<Utc>) -> bool {
        at >= self.valid_from && self.valid_until.map_or(true, |until| at < until)
    }
}

/// A single step in a subject's timeline between two points in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeChangeType {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeChange {
    pub subject: String,
    pub change_type: RangeChangeType,
    pub date: DateTime<Utc>,
    pub old_version: Option<u32>,
    pub new_version: Option<u32>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Each subject's versions, kept sorted by `valid_from` ascending.
    history: HashMap<String, Vec<VersionInfo>>,
}

/// Version history for every tracked subject, synchronized with an
/// `RwLock` like [`crate::TripleStore`].
#[derive(Debug, Default)]
pub struct TemporalStore {
    inner: RwLock<Inner>,
}

impl TemporalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new version of `subject`. Versions are kept sorted by
    /// `valid_from`; inserting one out of order does not disturb the
    /// ordering of the versions already recorded.
    pub fn add_version(&self, subject: impl Into<String>, version: VersionInfo) {
        let mut guard = self.inner.write().expect("temporal store lock poisoned");
        let entries = guard.history.entry(subject.into()).or_default();
        let pos = entries
            .binary_search_by(|existing| existing.valid_from.cmp(&version.valid_from))
            .unwrap_or_else(|p| p);
        entries.insert(pos, version);
    }

    /// Marks `version` as the current one for `subject`: every other
    /// recorded version with `status == Active` for that subject becomes
    /// `Superseded`, and the targeted version becomes `Active` with its
    /// `valid_until` cleared.
    pub fn set_current_version(&self, subject: &str, version: u32) -> bool {
        let mut guard = self.inner.write().expect("temporal store lock poisoned");
        let Some(entries) = guard.history.get_mut(subject) else {
            return false;
        };
        let Some(target_idx) = entries.iter().position(|v| v.version == version) else {
            return false;
        };
        for (idx, v) in entries.iter_mut().enumerate() {
            if idx == target_idx {
                v.status = VersionStatus::Active;
                v.valid_until = None;
            } else if v.status == VersionStatus::Active {
                v.status = VersionStatus::Superseded;
            }
        }
        true
    }

    /// The version of `subject` that was in force at `at`, if any.
    pub fn version_at(&self, subject: &str, at: DateTime<Utc>) -> Option<VersionInfo> {
        let guard = self.inner.read().expect("temporal store lock poisoned");
        guard
            .history
            .get(subject)?
            .iter()
            .find(|v| v.covers(at))
            .cloned()
    }

    /// Whether `subject` has a version in force at `at`.
    pub fn is_active_at(&self, subject: &str, at: DateTime<Utc>) -> bool {
        self.version_at(subject, at).is_some()
    }

    /// The full recorded history of `subject`, oldest first.
    pub fn get_version_history(&self, subject: &str) -> Vec<VersionInfo> {
        let guard = self.inner.read().expect("temporal store lock poisoned");
        guard
            .history
            .get(subject)
            .map(|v| v.to_vec())
            .unwrap_or_default()
    }

    /// Every subject's currently active version.
    pub fn get_active_versions(&self) -> Vec<VersionInfo> {
        let guard = self.inner.read().expect("temporal store lock poisoned");
        guard
            .history
            .values()
            .flat_map(|versions| versions.iter())
            .filter(|v| v.status == VersionStatus::Active)
            .cloned()
            .collect()
    }

    /// The sequence of version transitions for `subject` in the
    /// half-open-on-the-left range `(from, to]`. The first version in
    /// range, if not also the subject's first ever, is reported as
    /// `Modified`; a version withdrawn (not merely superseded) with a
    /// `valid_until` inside the range is reported as `Removed`.
    pub fn changes_between(
        &self,
        subject: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<RangeChange> {
        let guard = self.inner.read().expect("temporal store lock poisoned");
        let Some(entries) = guard.history.get(subject) else {
            return Vec::new();
        };
        let mut changes = Vec::new();
        for (idx, v) in entries.iter().enumerate() {
            if v.valid_from > from && v.valid_from <= to {
                let change_type = if idx == 0 {
                    RangeChangeType::Added
                } else {
                    RangeChangeType::Modified
                };
                changes.push(RangeChange {
                    subject: subject.to_string(),
                    change_type,
                    date: v.valid_from,
                    old_version: if idx == 0 { None } else { Some(entries[idx - 1].version) },
                    new_version: Some(v.version),
                });
            }
            if v.status == VersionStatus::Withdrawn {
                if let Some(until) = v.valid_until {
                    if until > from && until <= to {
                        changes.push(RangeChange {
                            subject: subject.to_string(),
                            change_type: RangeChangeType::Removed,
                            date: until,
                            old_version: Some(v.version),
                            new_version: None,
                        });
                    }
                }
            }
        }
        changes.sort_by_key(|c| c.date);
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn version(v: u32, from: DateTime<Utc>, until: Option<DateTime<Utc>>, status: VersionStatus) -> VersionInfo {
        VersionInfo {
            uri: "<art1>".to_string(),
            version: v,
            valid_from: from,
            valid_until: until,
            status,
            meeting_uri: None,
            supersedes_uri: None,
        }
    }

    #[test]
    fn version_at_finds_the_covering_interval() {
        let store = TemporalStore::new();
        store.add_version(
            "<art1>",
            version(1, date(2020, 1, 1), Some(date(2021, 1, 1)), VersionStatus::Superseded),
        );
        store.add_version("<art1>", version(2, date(2021, 1, 1), None, VersionStatus::Active));

        assert_eq!(store.version_at("<art1>", date(2020, 6, 1)).unwrap().version, 1);
        assert_eq!(store.version_at("<art1>", date(2022, 1, 1)).unwrap().version, 2);
        assert!(store.version_at("<art1>", date(2019, 1, 1)).is_none());
    }

    #[test]
    fn is_active_at_matches_version_at() {
        let store = TemporalStore::new();
        store.add_version("<art1>", version(1, date(2020, 1, 1), None, VersionStatus::Active));
        assert!(store.is_active_at("<art1>", date(2020, 6, 1)));
        assert!(!store.is_active_at("<art1>", date(2019, 1, 1)));
    }

    #[test]
    fn set_current_version_supersedes_the_previous_active() {
        let store = TemporalStore::new();
        store.add_version("<art1>", version(1, date(2020, 1, 1), None, VersionStatus::Active));
        store.add_version("<art1>", version(2, date(2021, 1, 1), None, VersionStatus::Draft));

        assert!(store.set_current_version("<art1>", 2));

        let history = store.get_version_history("<art1>");
        let v1 = history.iter().find(|v| v.version == 1).unwrap();
        let v2 = history.iter().find(|v| v.version == 2).unwrap();
        assert_eq!(v1.status, VersionStatus::Superseded);
        assert_eq!(v2.status, VersionStatus::Active);
        assert_eq!(v2.valid_until, None);
    }

    #[test]
    fn get_active_versions_collects_across_subjects() {
        let store = TemporalStore::new();
        store.add_version("<art1>", version(1, date(2020, 1, 1), None, VersionStatus::Active));
        store.add_version("<art2>", version(1, date(2020, 1, 1), None, VersionStatus::Withdrawn));
        let active = store.get_active_versions();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].uri, "<art1>");
    }

    #[test]
    fn changes_between_reports_added_and_modified_for_an_ordinary_supersession() {
        let store = TemporalStore::new();
        store.add_version(
            "<art1>",
            version(1, date(2020, 1, 1), Some(date(2021, 1, 1)), VersionStatus::Superseded),
        );
        store.add_version("<art1>", version(2, date(2021, 1, 1), None, VersionStatus::Active));

        let changes = store.changes_between("<art1>", date(2019, 6, 1), date(2021, 6, 1));
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].change_type, RangeChangeType::Added);
        assert_eq!(changes[0].new_version, Some(1));
        assert_eq!(changes[1].change_type, RangeChangeType::Modified);
        assert_eq!(changes[1].new_version, Some(2));
    }

    #[test]
    fn changes_between_reports_removed_only_for_withdrawn_versions() {
        let store = TemporalStore::new();
        store.add_version(
            "<art1>",
            version(1, date(2020, 1, 1), Some(date(2021, 1, 1)), VersionStatus::Withdrawn),
        );

        let changes = store.changes_between("<art1>", date(2020, 6, 1), date(2021, 6, 1));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, RangeChangeType::Removed);
        assert_eq!(changes[0].old_version, Some(1));
    }

    #[test]
    fn changes_between_excludes_the_lower_bound() {
        let store = TemporalStore::new();
        store.add_version("<art1>", version(1, date(2020, 1, 1), None, VersionStatus::Active));

        let changes = store.changes_between("<art1>", date(2020, 1, 1), date(2021, 1, 1));
        assert!(changes.is_empty());
    }
}

//! Wraps [`Executor`] with point-in-time, range, and lifecycle queries
//! over a [`TemporalStore`].
//!
//! Grounded in the teacher's `fukurow-sparql` evaluator pattern of
//! layering a specialized evaluator over the generic one rather than
//! forking it — here the specialization is temporal rather than
//! engine-specific. spec.md §4.7 only narrates five of the nine methods
//! in spec.md §6.2's list in prose; `execute_between_meetings`,
//! `provisions_in_force_at`, `amendments_adopted_in_range`, and
//! `average_time_to_adoption` are named but undescribed — their exact
//! shape is an Open Question decision recorded in DESIGN.md.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lexigraph_core::{term, Error, Result};
use lexigraph_store::{RangeChange, RangeChangeType, TemporalStore, VersionInfo};

use crate::ast::Query;
use crate::executor::{CancellationToken, ExecutionContext, ExecutionOutcome, Executor, QueryMetrics, QueryResult};
use crate::filter::Binding;

const DISCUSSED_AT: &str = "discussedAt";
const DECIDED_AT: &str = "decidedAt";
const MEETING_DATE: &str = "meetingDate";
const VERSION_OF: &str = "versionOf";
const AMENDS: &str = "amends";

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalResult {
    pub at: DateTime<Utc>,
    pub variables: Vec<String>,
    pub bindings: Vec<Binding>,
    pub count: usize,
    pub metrics: QueryMetrics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeSummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeQueryResult {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub changes: Vec<RangeChange>,
    pub summary: RangeSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionsResult {
    pub uri: String,
    pub versions: Vec<VersionInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEventType {
    VersionAdded,
    Discussed,
    Decided,
    Amended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub event_type: TimelineEventType,
    pub date: DateTime<Utc>,
    pub meeting_uri: Option<String>,
    pub version: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub uri: String,
    pub events: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationResult {
    pub uri: String,
    pub valid_from: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub discussion_count: usize,
    pub amendment_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingRangeSummary {
    pub meeting_uri: String,
    pub changes: Vec<RangeChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmendmentAdoption {
    pub amendment: String,
    pub target: Option<String>,
    pub meeting_uri: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageAdoptionTime {
    pub sample_size: usize,
    pub average_days: Option<f64>,
}

/// Combines an [`Executor`] with a [`TemporalStore`] to answer
/// point-in-time and lifecycle questions about the subjects a SELECT
/// would otherwise return unversioned.
pub struct TemporalExecutor {
    executor: Executor,
    temporal: Arc<TemporalStore>,
}

impl TemporalExecutor {
    pub fn new(executor: Executor, temporal: Arc<TemporalStore>) -> Self {
        TemporalExecutor { executor, temporal }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn temporal_store(&self) -> &Arc<TemporalStore> {
        &self.temporal
    }

    /// Runs the SELECT, then drops any binding containing a URI-like
    /// value whose version is not in force at `at`. Values with no
    /// recorded history are kept — absence of version info is not
    /// evidence of absence at a point in time.
    pub fn execute_as_of(&self, query: &Query, at: DateTime<Utc>) -> Result<TemporalResult> {
        self.execute_as_of_with(&ExecutionContext::default(), query, at)
    }

    pub fn execute_as_of_with(&self, ctx: &ExecutionContext, query: &Query, at: DateTime<Utc>) -> Result<TemporalResult> {
        let select = self.executor.execute_with(ctx, query)?;
        let QueryResult {
            variables,
            bindings,
            metrics,
            ..
        } = require_select(select)?;

        let kept: Vec<Binding> = bindings
            .into_iter()
            .filter(|binding| {
                binding.values().all(|value| {
                    if !is_uri_like(value) {
                        return true;
                    }
                    match self.temporal.get_version_history(value).is_empty() {
                        true => true,
                        false => self.temporal.is_active_at(value, at),
                    }
                })
            })
            .collect();

        let count = kept.len();
        Ok(TemporalResult {
            at,
            variables,
            bindings: kept,
            count,
            metrics,
        })
    }

    /// Collects URI-like values bound by the SELECT as candidate
    /// subjects, then reports every version transition each subject had
    /// in `(from, to]`.
    pub fn execute_between(&self, query: &Query, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<RangeQueryResult> {
        let select = self.executor.execute(query)?;
        let QueryResult { bindings, .. } = require_select(select)?;
        let subjects = candidate_subjects(&bindings);
        self.range_changes_for(&subjects, from, to)
    }

    /// Like [`Self::execute_between`], but groups the resulting changes
    /// by the meeting at which each change was decided (`s decidedAt
    /// m`). Changes with no resolvable meeting are omitted from every
    /// group but still counted in the flat `RangeQueryResult` a caller
    /// can get from [`Self::execute_between`].
    pub fn execute_between_meetings(
        &self,
        query: &Query,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MeetingRangeSummary>> {
        let range = self.execute_between(query, from, to)?;
        let mut by_meeting: HashMap<String, Vec<RangeChange>> = HashMap::new();
        for change in range.changes {
            if let Some(meeting) = self.decided_at_meeting(&change.subject) {
                by_meeting.entry(meeting).or_default().push(change);
            }
        }
        let mut grouped: Vec<MeetingRangeSummary> = by_meeting
            .into_iter()
            .map(|(meeting_uri, changes)| MeetingRangeSummary { meeting_uri, changes })
            .collect();
        grouped.sort_by(|a, b| a.meeting_uri.cmp(&b.meeting_uri));
        Ok(grouped)
    }

    fn range_changes_for(&self, subjects: &[String], from: DateTime<Utc>, to: DateTime<Utc>) -> Result<RangeQueryResult> {
        let mut changes = Vec::new();
        for subject in subjects {
            changes.extend(self.temporal.changes_between(subject, from, to));
        }
        changes.sort_by_key(|c| c.date);

        let mut summary = RangeSummary::default();
        for change in &changes {
            match change.change_type {
                RangeChangeType::Added => summary.added += 1,
                RangeChangeType::Modified => summary.modified += 1,
                RangeChangeType::Removed => summary.removed += 1,
            }
        }

        Ok(RangeQueryResult { from, to, changes, summary })
    }

    /// Prefers the indexed history; if `s` has none, reconstructs a
    /// single-version timeline from the triples `(?v, versionOf, s)` in
    /// the underlying store (per spec.md §4.7).
    pub fn get_versions(&self, s: &str) -> VersionsResult {
        let versions = self.temporal.get_version_history(s);
        if !versions.is_empty() {
            return VersionsResult {
                uri: s.to_string(),
                versions,
            };
        }

        let reconstructed: Vec<VersionInfo> = self
            .executor
            .store()
            .find("", VERSION_OF, s)
            .into_iter()
            .map(|triple| VersionInfo {
                uri: triple.subject,
                version: 1,
                valid_from: DateTime::<Utc>::MIN_UTC,
                valid_until: None,
                status: lexigraph_store::VersionStatus::Active,
                meeting_uri: None,
                supersedes_uri: None,
            })
            .collect();
        VersionsResult {
            uri: s.to_string(),
            versions: reconstructed,
        }
    }

    /// The union of version events, discussions, decisions, and
    /// amendments targeting `s`, sorted ascending by date.
    pub fn get_timeline(&self, s: &str) -> Timeline {
        let mut events = Vec::new();

        for version in self.temporal.get_version_history(s) {
            events.push(TimelineEvent {
                event_type: TimelineEventType::VersionAdded,
                date: version.valid_from,
                meeting_uri: version.meeting_uri.clone(),
                version: Some(version.version),
            });
        }

        for triple in self.executor.store().find(s, DISCUSSED_AT, "") {
            if let Some(date) = self.meeting_date(&triple.object) {
                events.push(TimelineEvent {
                    event_type: TimelineEventType::Discussed,
                    date,
                    meeting_uri: Some(triple.object),
                    version: None,
                });
            }
        }

        for triple in self.executor.store().find(s, DECIDED_AT, "") {
            if let Some(date) = self.meeting_date(&triple.object) {
                events.push(TimelineEvent {
                    event_type: TimelineEventType::Decided,
                    date,
                    meeting_uri: Some(triple.object),
                    version: None,
                });
            }
        }

        for triple in self.executor.store().find("", AMENDS, s) {
            for decided in self.executor.store().find(&triple.subject, DECIDED_AT, "") {
                if let Some(date) = self.meeting_date(&decided.object) {
                    events.push(TimelineEvent {
                        event_type: TimelineEventType::Amended,
                        date,
                        meeting_uri: Some(decided.object),
                        version: None,
                    });
                }
            }
        }

        events.sort_by_key(|e| e.date);
        Timeline { uri: s.to_string(), events }
    }

    /// The span from `s`'s earliest recorded `valid_from` to the
    /// `valid_from` of its first version with status `active`, plus how
    /// many discussions and amendments it accumulated along the way.
    pub fn get_duration(&self, s: &str) -> DurationResult {
        let history = self.temporal.get_version_history(s);
        let valid_from = history.first().map(|v| v.valid_from);
        let activated_at = history
            .iter()
            .find(|v| v.status == lexigraph_store::VersionStatus::Active)
            .map(|v| v.valid_from);

        let discussion_count = self.executor.store().find(s, DISCUSSED_AT, "").len();
        let amendment_count = self.executor.store().find("", AMENDS, s).len();

        DurationResult {
            uri: s.to_string(),
            valid_from,
            activated_at,
            discussion_count,
            amendment_count,
        }
    }

    /// Every URI-like value bound by the SELECT whose version is active
    /// at `at`, deduplicated. Built on [`TemporalStore::is_active_at`]
    /// the same way [`Self::execute_as_of`] is, but returns the bare
    /// subject list a caller asking "what's in force" wants instead of
    /// full query bindings.
    pub fn provisions_in_force_at(&self, query: &Query, at: DateTime<Utc>) -> Result<Vec<String>> {
        let select = self.executor.execute(query)?;
        let QueryResult { bindings, .. } = require_select(select)?;
        let mut subjects: Vec<String> = candidate_subjects(&bindings)
            .into_iter()
            .filter(|s| self.temporal.is_active_at(s, at))
            .collect();
        subjects.sort();
        subjects.dedup();
        Ok(subjects)
    }

    /// Every amendment `(?amendment, amends, ?target)` whose decision
    /// meeting date falls in `(from, to]`, sorted by date.
    pub fn amendments_adopted_in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<AmendmentAdoption> {
        let mut adoptions = Vec::new();
        for amends in self.executor.store().find("", AMENDS, "") {
            let target = if amends.object.is_empty() { None } else { Some(amends.object.clone()) };
            for decided in self.executor.store().find(&amends.subject, DECIDED_AT, "") {
                let Some(date) = self.meeting_date(&decided.object) else {
                    continue;
                };
                if date > from && date <= to {
                    adoptions.push(AmendmentAdoption {
                        amendment: amends.subject.clone(),
                        target: target.clone(),
                        meeting_uri: decided.object.clone(),
                        date,
                    });
                }
            }
        }
        adoptions.sort_by_key(|a| a.date);
        adoptions
    }

    /// The average span between `s discussedAt m1` and `s decidedAt m2`
    /// across every subject with at least one of each, in days.
    pub fn average_time_to_adoption(&self) -> AverageAdoptionTime {
        let mut total_days = 0.0;
        let mut sample_size = 0usize;

        let decided_subjects: Vec<String> = self
            .executor
            .store()
            .find("", DECIDED_AT, "")
            .into_iter()
            .map(|t| t.subject)
            .collect::<Vec<String>>()
            .unique_or_self();

        for subject in decided_subjects {
            let earliest_discussed = self
                .executor
                .store()
                .find(&subject, DISCUSSED_AT, "")
                .into_iter()
                .filter_map(|t| self.meeting_date(&t.object))
                .min();
            let earliest_decided = self
                .executor
                .store()
                .find(&subject, DECIDED_AT, "")
                .into_iter()
                .filter_map(|t| self.meeting_date(&t.object))
                .min();
            if let (Some(discussed), Some(decided)) = (earliest_discussed, earliest_decided) {
                if decided >= discussed {
                    let span = decided - discussed;
                    total_days += span.num_seconds() as f64 / 86_400.0;
                    sample_size += 1;
                }
            }
        }

        AverageAdoptionTime {
            sample_size,
            average_days: if sample_size == 0 { None } else { Some(total_days / sample_size as f64) },
        }
    }

    fn meeting_date(&self, meeting: &str) -> Option<DateTime<Utc>> {
        self.executor
            .store()
            .find(meeting, MEETING_DATE, "")
            .into_iter()
            .find_map(|t| parse_date_literal(&t.object))
    }

    fn decided_at_meeting(&self, subject: &str) -> Option<String> {
        self.executor
            .store()
            .find(subject, DECIDED_AT, "")
            .into_iter()
            .next()
            .map(|t| t.object)
    }
}

fn require_select(outcome: ExecutionOutcome) -> Result<QueryResult> {
    match outcome {
        ExecutionOutcome::Select(r) => Ok(r),
        _ => Err(Error::UnsupportedQueryType(
            "temporal executor entry points require a SELECT query".to_string(),
        )),
    }
}

fn is_uri_like(value: &str) -> bool {
    matches!(term::classify(value), term::TermKind::Uri(_))
}

fn candidate_subjects(bindings: &[Binding]) -> Vec<String> {
    let mut subjects: Vec<String> = bindings
        .iter()
        .flat_map(|b| b.values())
        .filter(|v| is_uri_like(v))
        .cloned()
        .collect();
    subjects.sort();
    subjects.dedup();
    subjects
}

fn parse_date_literal(object: &str) -> Option<DateTime<Utc>> {
    let inner = object.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(object);
    if let Ok(dt) = DateTime::parse_from_rfc3339(inner) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(inner, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

trait UniqueOrSelf {
    fn unique_or_self(self) -> Vec<String>;
}

impl UniqueOrSelf for Vec<String> {
    fn unique_or_self(mut self) -> Vec<String> {
        self.sort();
        self.dedup();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorConfig;
    use crate::parser;
    use chrono::TimeZone;
    use lexigraph_core::Triple;
    use lexigraph_store::{TripleStore, VersionStatus};

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn build() -> TemporalExecutor {
        let store = Arc::new(TripleStore::new());
        store.add(Triple::new("<GDPR:Art17>", "rdf:type", "<reg:Article>"));
        store.add(Triple::new("<GDPR:Art17>", DISCUSSED_AT, "<meeting:1>"));
        store.add(Triple::new("<GDPR:Art17>", DECIDED_AT, "<meeting:2>"));
        store.add(Triple::new("<meeting:1>", MEETING_DATE, "\"2020-01-01\""));
        store.add(Triple::new("<meeting:2>", MEETING_DATE, "\"2020-03-01\""));
        store.add(Triple::new("<amend:1>", AMENDS, "<GDPR:Art17>"));
        store.add(Triple::new("<amend:1>", DECIDED_AT, "<meeting:2>"));

        let temporal = Arc::new(TemporalStore::new());
        temporal.add_version(
            "<GDPR:Art17>",
            VersionInfo {
                uri: "<GDPR:Art17>".to_string(),
                version: 1,
                valid_from: date(2018, 1, 1),
                valid_until: Some(date(2020, 3, 1)),
                status: VersionStatus::Superseded,
                meeting_uri: None,
                supersedes_uri: None,
            },
        );
        temporal.add_version(
            "<GDPR:Art17>",
            VersionInfo {
                uri: "<GDPR:Art17>".to_string(),
                version: 2,
                valid_from: date(2020, 3, 1),
                valid_until: None,
                status: VersionStatus::Active,
                meeting_uri: Some("<meeting:2>".to_string()),
                supersedes_uri: None,
            },
        );

        let executor = Executor::new(store, ExecutorConfig::default());
        TemporalExecutor::new(executor, temporal)
    }

    #[test]
    fn as_of_drops_versions_not_yet_in_force() {
        let temporal_exec = build();
        let query = parser::parse("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }").unwrap();
        let before = temporal_exec.execute_as_of(&query, date(2019, 1, 1)).unwrap();
        assert_eq!(before.count, 1);
        let after = temporal_exec.execute_as_of(&query, date(2021, 1, 1)).unwrap();
        assert_eq!(after.count, 1);
        let gap = temporal_exec.execute_as_of(&query, date(2020, 2, 1)).unwrap();
        assert_eq!(gap.count, 1);
    }

    #[test]
    fn between_reports_version_transition() {
        let temporal_exec = build();
        let query = parser::parse("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }").unwrap();
        let range = temporal_exec.execute_between(&query, date(2020, 1, 1), date(2020, 6, 1)).unwrap();
        assert_eq!(range.summary.modified, 1);
    }

    #[test]
    fn timeline_merges_and_sorts_events() {
        let temporal_exec = build();
        let timeline = temporal_exec.get_timeline("<GDPR:Art17>");
        assert!(timeline.events.windows(2).all(|w| w[0].date <= w[1].date));
        assert!(timeline.events.iter().any(|e| e.event_type == TimelineEventType::Discussed));
        assert!(timeline.events.iter().any(|e| e.event_type == TimelineEventType::Amended));
    }

    #[test]
    fn duration_counts_discussions_and_amendments() {
        let temporal_exec = build();
        let duration = temporal_exec.get_duration("<GDPR:Art17>");
        assert_eq!(duration.discussion_count, 1);
        assert_eq!(duration.amendment_count, 1);
        assert_eq!(duration.activated_at, Some(date(2020, 3, 1)));
    }

    #[test]
    fn provisions_in_force_at_filters_by_activity() {
        let temporal_exec = build();
        let query = parser::parse("SELECT ?a WHERE { ?a rdf:type <reg:Article> . }").unwrap();
        let active = temporal_exec.provisions_in_force_at(&query, date(2021, 1, 1)).unwrap();
        assert_eq!(active, vec!["<GDPR:Art17>".to_string()]);
    }

    #[test]
    fn amendments_adopted_in_range_uses_decision_meeting_date() {
        let temporal_exec = build();
        let adoptions = temporal_exec.amendments_adopted_in_range(date(2020, 1, 1), date(2020, 12, 31));
        assert_eq!(adoptions.len(), 1);
        assert_eq!(adoptions[0].amendment, "<amend:1>");
        assert_eq!(adoptions[0].target, Some("<GDPR:Art17>".to_string()));
    }

    #[test]
    fn average_time_to_adoption_spans_discussion_to_decision() {
        let temporal_exec = build();
        let average = temporal_exec.average_time_to_adoption();
        assert_eq!(average.sample_size, 1);
        assert_eq!(average.average_days, Some(60.0));
    }
}

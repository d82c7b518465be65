//! # Read-Side Projections
//!
//! Pure views over a slice of cases: review queue and priority, per-checker
//! and per-village statistics, funding listings and platform-wide counters.
//! None of these mutate a case; the service loads the slice and hands it in.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use shared_types::{Amount, CaseId, CaseStatus, Timestamp, UserId};

use super::entities::Case;
use super::progress::donation_progress;

/// Destruction percentage at or above which a home counts as destroyed.
pub const DESTROYED_THRESHOLD: u8 = 50;

// =============================================================================
// REVIEW PRIORITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Raw priority score, before bucketing.
///
/// destruction% × 0.4, plus household size × 5 (max 25), plus days waiting
/// × 2 (max 20), plus special-needs members × 10.
#[must_use]
pub fn priority_score(case: &Case, now: Timestamp) -> f64 {
    let data = &case.family_data;
    let destruction = f64::from(data.destruction_percentage.unwrap_or(0)) * 0.4;
    let household = (f64::from(data.members_or_one()) * 5.0).min(25.0);

    let since = case.submitted_at.unwrap_or(case.created_at);
    let waited_secs = (now - since).num_seconds().max(0) as f64;
    let waiting = (waited_secs / 86_400.0 * 2.0).min(20.0);

    let special = f64::from(data.special_needs_count) * 10.0;
    destruction + household + waiting + special
}

#[must_use]
pub fn review_priority(case: &Case, now: Timestamp) -> Priority {
    let score = priority_score(case, now);
    if score >= 80.0 {
        Priority::High
    } else if score >= 50.0 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

// =============================================================================
// REVIEW QUEUE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub case_id: CaseId,
    pub status: CaseStatus,
    pub family_name: Option<String>,
    pub village: Option<String>,
    pub submitted_at: Option<Timestamp>,
    pub assigned_to_me: bool,
    pub priority: Priority,
}

/// Work visible to `checker`: its own open reviews plus unassigned submissions,
/// oldest submission first, at most `limit` items.
#[must_use]
pub fn review_queue(cases: &[Case], checker: UserId, now: Timestamp, limit: usize) -> Vec<QueueItem> {
    let mut items: Vec<QueueItem> = cases
        .iter()
        .filter(|case| match case.status {
            CaseStatus::Submitted => case.assigned_checker().map_or(true, |c| c == checker),
            CaseStatus::UnderReview => case.assigned_checker() == Some(checker),
            _ => false,
        })
        .map(|case| QueueItem {
            case_id: case.case_id.clone(),
            status: case.status,
            family_name: case.family_data.family_name.clone(),
            village: case.family_data.village.clone(),
            submitted_at: case.submitted_at,
            assigned_to_me: case.assigned_checker() == Some(checker),
            priority: review_priority(case, now),
        })
        .collect();

    items.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.case_id.cmp(&b.case_id))
    });
    items.truncate(limit);
    items
}

// =============================================================================
// CHECKER STATISTICS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerStats {
    pub total_assigned: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Mean hours from assignment to decision, rounded; 0 with no decisions.
    pub average_review_hours: u64,
    /// Unassigned submissions anyone can pick up.
    pub available: usize,
}

#[must_use]
pub fn checker_stats(cases: &[Case], checker: UserId) -> CheckerStats {
    let mut stats = CheckerStats::default();
    let mut review_secs: i64 = 0;
    let mut reviewed: i64 = 0;

    for case in cases {
        if case.status == CaseStatus::Submitted && case.checker_assignment.is_none() {
            stats.available += 1;
        }
        let Some(assignment) = case.checker_assignment.as_ref() else {
            continue;
        };
        if assignment.checker_id != checker {
            continue;
        }
        stats.total_assigned += 1;
        match case.status {
            CaseStatus::UnderReview => stats.pending += 1,
            CaseStatus::Approved | CaseStatus::FullyFunded => stats.approved += 1,
            CaseStatus::Rejected => stats.rejected += 1,
            CaseStatus::Draft | CaseStatus::Submitted => {}
        }
        if let Some(decision) = case.checker_decision.as_ref() {
            review_secs += (decision.decided_at - assignment.assigned_at)
                .num_seconds()
                .max(0);
            reviewed += 1;
        }
    }

    if reviewed > 0 {
        let hours = review_secs as f64 / reviewed as f64 / 3_600.0;
        stats.average_review_hours = hours.round() as u64;
    }
    stats
}

// =============================================================================
// VILLAGES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VillageSummary {
    pub village: String,
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total_needed: Amount,
    pub total_raised: Amount,
    pub funded_percentage: u8,
}

/// Per-village case counts, largest village first.
///
/// Villages are grouped case-insensitively; the first spelling seen is
/// reported. Drafts and cases without a village are skipped.
#[must_use]
pub fn village_summaries(cases: &[Case]) -> Vec<VillageSummary> {
    let mut by_key: BTreeMap<String, VillageSummary> = BTreeMap::new();

    for case in cases.iter().filter(|c| c.status != CaseStatus::Draft) {
        let Some(key) = case.family_data.village_key() else {
            continue;
        };
        let summary = by_key.entry(key).or_insert_with(|| VillageSummary {
            village: case
                .family_data
                .village
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_string(),
            ..VillageSummary::default()
        });
        summary.total += 1;
        match case.status {
            CaseStatus::Submitted | CaseStatus::UnderReview => summary.pending += 1,
            CaseStatus::Approved | CaseStatus::FullyFunded => summary.approved += 1,
            CaseStatus::Rejected => summary.rejected += 1,
            CaseStatus::Draft => {}
        }
        summary.total_needed = summary.total_needed.saturating_add(case.total_needed);
        summary.total_raised = summary.total_raised.saturating_add(case.total_raised);
    }

    let mut summaries: Vec<_> = by_key
        .into_values()
        .map(|mut s| {
            s.funded_percentage = donation_progress(s.total_raised, s.total_needed);
            s
        })
        .collect();
    summaries.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.village.cmp(&b.village)));
    summaries
}

// =============================================================================
// FUNDING
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSummary {
    pub families: usize,
    pub people_affected: u64,
    pub total_needed: Amount,
    pub total_raised: Amount,
    pub overall_progress: u8,
    pub case_ids: Vec<CaseId>,
}

/// Funding totals for the donor-facing listing of `status` cases.
///
/// Only `approved` and `fully_funded` are fundable; any other status yields
/// an empty summary.
#[must_use]
pub fn funding_summary(cases: &[Case], status: CaseStatus) -> FundingSummary {
    if !matches!(status, CaseStatus::Approved | CaseStatus::FullyFunded) {
        return FundingSummary::default();
    }
    let mut summary = FundingSummary::default();
    for case in cases.iter().filter(|c| c.status == status) {
        summary.families += 1;
        summary.people_affected += u64::from(case.family_data.members_or_one());
        summary.total_needed = summary.total_needed.saturating_add(case.total_needed);
        summary.total_raised = summary.total_raised.saturating_add(case.total_raised);
        summary.case_ids.push(case.case_id.clone());
    }
    summary.overall_progress = donation_progress(summary.total_raised, summary.total_needed);
    summary
}

// =============================================================================
// PLATFORM
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub families_helped: usize,
    pub villages_covered: usize,
    pub total_cases: usize,
    pub verified_cases: usize,
    /// Verified share of all cases, rounded to a whole percent.
    pub verification_percentage: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactStats {
    pub homes_destroyed: usize,
    pub people_affected: u64,
    pub cases_verified: usize,
    pub funds_raised: Amount,
}

fn is_helped(status: CaseStatus) -> bool {
    matches!(status, CaseStatus::Approved | CaseStatus::FullyFunded)
}

fn is_verified(status: CaseStatus) -> bool {
    matches!(
        status,
        CaseStatus::Approved | CaseStatus::Rejected | CaseStatus::FullyFunded
    )
}

#[must_use]
pub fn platform_stats(cases: &[Case]) -> PlatformStats {
    let helped: Vec<&Case> = cases.iter().filter(|c| is_helped(c.status)).collect();
    let villages: BTreeSet<String> = helped
        .iter()
        .filter_map(|c| c.family_data.village_key())
        .collect();
    let verified_cases = cases.iter().filter(|c| is_verified(c.status)).count();

    PlatformStats {
        families_helped: helped.len(),
        villages_covered: villages.len(),
        total_cases: cases.len(),
        verified_cases,
        verification_percentage: donation_progress(verified_cases as u64, cases.len() as u64),
    }
}

#[must_use]
pub fn impact_stats(cases: &[Case]) -> ImpactStats {
    let mut stats = ImpactStats::default();
    for case in cases {
        let data = &case.family_data;
        if data.destruction_percentage.unwrap_or(0) >= DESTROYED_THRESHOLD {
            stats.homes_destroyed += 1;
        }
        stats.people_affected += u64::from(data.number_of_members.unwrap_or(0));
        if is_verified(case.status) {
            stats.cases_verified += 1;
        }
        if is_helped(case.status) {
            stats.funds_raised = stats.funds_raised.saturating_add(case.total_raised);
        }
    }
    stats
}

// =============================================================================
// KANBAN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanCard {
    pub case_id: CaseId,
    pub family_name: Option<String>,
    pub village: Option<String>,
    pub number_of_members: Option<u32>,
    pub destruction_percentage: Option<u8>,
    pub assigned_checker: Option<UserId>,
    pub total_needed: Amount,
    pub total_raised: Amount,
    pub donation_progress: u8,
    pub last_modified: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KanbanBoard {
    pub submitted: Vec<KanbanCard>,
    pub under_review: Vec<KanbanCard>,
    pub approved: Vec<KanbanCard>,
}

impl KanbanBoard {
    #[must_use]
    pub fn len(&self) -> usize {
        self.submitted.len() + self.under_review.len() + self.approved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Admin board of open work; most recently modified first in each column.
#[must_use]
pub fn kanban(cases: &[Case]) -> KanbanBoard {
    let mut ordered: Vec<&Case> = cases.iter().collect();
    ordered.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    let mut board = KanbanBoard::default();
    for case in ordered {
        let column = match case.status {
            CaseStatus::Submitted => &mut board.submitted,
            CaseStatus::UnderReview => &mut board.under_review,
            CaseStatus::Approved => &mut board.approved,
            _ => continue,
        };
        column.push(KanbanCard {
            case_id: case.case_id.clone(),
            family_name: case.family_data.family_name.clone(),
            village: case.family_data.village.clone(),
            number_of_members: case.family_data.number_of_members,
            destruction_percentage: case.family_data.destruction_percentage,
            assigned_checker: case.assigned_checker(),
            total_needed: case.total_needed,
            total_raised: case.total_raised,
            donation_progress: case.donation_progress,
            last_modified: case.last_modified,
        });
    }
    board
}

//! Aggregate queries over a published graph.
//!
//! Everything here reads `&Tables` only and derives state through
//! [`Tables::resolve_grade`]; nothing is cached between calls.

use crate::model::Tables;
use crate::types::{AssignmentIdx, GradeActionIdx, GradeState, GroupIdx, PersonId, SubmissionIdx};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Per-state counts for one group over a set of assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub approved: usize,
    pub pending: usize,
    pub not_approved: usize,
    pub no_submission: usize,
}

impl StatusBreakdown {
    pub fn add(&mut self, state: GradeState) {
        match state {
            GradeState::Approved => self.approved += 1,
            GradeState::Pending => self.pending += 1,
            GradeState::NotApproved => self.not_approved += 1,
            GradeState::NoSubmission => self.no_submission += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.approved + self.pending + self.not_approved + self.no_submission
    }
}

/// Submissions of `group` for the given assignments, skipping pairs the
/// graph has no slot for.
fn group_submissions<'a>(
    tables: &'a Tables,
    group: GroupIdx,
    assignments: &'a [AssignmentIdx],
) -> impl Iterator<Item = SubmissionIdx> + 'a {
    assignments
        .iter()
        .filter_map(move |&a| tables.submission_for(group, a))
}

/// Number of `assignments` whose submission by `group` resolves to approved.
pub fn approval_count(tables: &Tables, group: GroupIdx, assignments: &[AssignmentIdx]) -> usize {
    group_submissions(tables, group, assignments)
        .filter(|&s| tables.resolve_grade(s) == GradeState::Approved)
        .count()
}

pub fn status_breakdown(
    tables: &Tables,
    group: GroupIdx,
    assignments: &[AssignmentIdx],
) -> StatusBreakdown {
    let mut breakdown = StatusBreakdown::default();
    for s in group_submissions(tables, group, assignments) {
        breakdown.add(tables.resolve_grade(s));
    }
    breakdown
}

/// The most recent grade action on any submission of a group containing one
/// of `students`. Equal timestamps go to the action inserted last.
pub fn latest_grader(tables: &Tables, students: &[PersonId]) -> Option<GradeActionIdx> {
    let groups: HashSet<GroupIdx> = students
        .iter()
        .filter_map(|id| tables.student_by_person(id))
        .map(|s| tables.student(s).group)
        .collect();
    if groups.is_empty() {
        return None;
    }

    let mut latest: Option<GradeActionIdx> = None;
    for (i, action) in tables.grade_actions().iter().enumerate() {
        if !groups.contains(&tables.submission(action.submission).group) {
            continue;
        }
        let newer = match latest {
            Some(best) => action.time >= tables.grade_action(best).time,
            None => true,
        };
        if newer {
            latest = Some(GradeActionIdx(i));
        }
    }
    latest
}

/// Groups bucketed by the current state of their submission of `assignment`.
pub fn assignment_overview(
    tables: &Tables,
    assignment: AssignmentIdx,
) -> BTreeMap<GradeState, Vec<GroupIdx>> {
    let mut overview: BTreeMap<GradeState, Vec<GroupIdx>> = BTreeMap::new();
    for &s in &tables.assignment(assignment).submissions {
        let submission = tables.submission(s);
        overview
            .entry(tables.resolve_grade(s))
            .or_default()
            .push(submission.group);
    }
    overview
}

/// Member emails of a group, in row order.
pub fn group_emails(tables: &Tables, group: GroupIdx) -> Vec<&str> {
    tables
        .group(group)
        .students
        .iter()
        .map(|&s| tables.student(s).person.email.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_tables;
    use crate::test_utils::{RawBuilder, at};
    use crate::types::{AssignmentId, CourseId};

    fn course() -> Tables {
        let raw = RawBuilder::new()
            .assignment("a1", "Week 1")
            .assignment("a2", "Week 2")
            .assignment("a3", "Week 3")
            .group("A", &["10", "11"])
            .group("B", &["20"])
            .student("10", "Ann")
            .student("11", "Abe")
            .student("20", "Bob")
            .teacher("1", "Tia")
            .teacher("2", "Tom")
            // A: a1 approved, a2 rejected, a3 missing
            .submit(at(1), "10", "a1")
            .grade(at(2), "1", "a1", "11", "Approved")
            .submit(at(1), "11", "a2")
            .grade(at(3), "2", "a2", "10", "Not approved")
            // B: a1 approved, a2 pending
            .submit(at(1), "20", "a1")
            .grade(at(3), "1", "a1", "20", "Approved")
            .submit(at(4), "20", "a2")
            .build();
        build_tables(CourseId::from("c"), &raw)
    }

    fn all(tables: &Tables) -> Vec<AssignmentIdx> {
        (0..tables.assignments().len()).map(AssignmentIdx).collect()
    }

    #[test]
    fn approvals_are_counted_per_group() {
        let tables = course();
        let a = tables.group_by_name("A").unwrap();
        let b = tables.group_by_name("B").unwrap();
        assert_eq!(approval_count(&tables, a, &all(&tables)), 1);
        assert_eq!(approval_count(&tables, b, &all(&tables)), 1);

        let only_a2 = [tables.assignment_by_id(&AssignmentId::from("a2")).unwrap()];
        assert_eq!(approval_count(&tables, a, &only_a2), 0);
    }

    #[test]
    fn breakdown_covers_every_requested_assignment() {
        let tables = course();
        let a = tables.group_by_name("A").unwrap();
        let b = tables.group_by_name("B").unwrap();

        let breakdown = status_breakdown(&tables, a, &all(&tables));
        assert_eq!(
            breakdown,
            StatusBreakdown {
                approved: 1,
                pending: 0,
                not_approved: 1,
                no_submission: 1,
            }
        );
        assert_eq!(breakdown.total(), 3);

        let breakdown = status_breakdown(&tables, b, &all(&tables));
        assert_eq!(breakdown.pending, 1);
        assert_eq!(breakdown.no_submission, 1);
    }

    #[test]
    fn latest_grader_looks_at_the_whole_group() {
        let tables = course();
        let latest = latest_grader(&tables, &[PersonId::from("11")]).unwrap();
        let action = tables.grade_action(latest);
        assert_eq!(action.time, at(3));
        assert_eq!(tables.teacher(action.teacher).person.id, PersonId::from("2"));
    }

    #[test]
    fn latest_grader_tie_goes_to_last_inserted() {
        let tables = course();
        // A's grade at t=3 and B's grade at t=3; B's row comes later in the log.
        let latest =
            latest_grader(&tables, &[PersonId::from("10"), PersonId::from("20")]).unwrap();
        let action = tables.grade_action(latest);
        assert_eq!(tables.teacher(action.teacher).person.id, PersonId::from("1"));
        assert_eq!(latest, GradeActionIdx(2));
    }

    #[test]
    fn latest_grader_of_unknown_students_is_none() {
        let tables = course();
        assert_eq!(latest_grader(&tables, &[PersonId::from("999")]), None);
        assert_eq!(latest_grader(&tables, &[]), None);
    }

    #[test]
    fn overview_buckets_groups_by_state() {
        let tables = course();
        let a1 = tables.assignment_by_id(&AssignmentId::from("a1")).unwrap();
        let overview = assignment_overview(&tables, a1);

        let a = tables.group_by_name("A").unwrap();
        let b = tables.group_by_name("B").unwrap();
        let sentinel = tables.default_group().unwrap();
        assert_eq!(overview.get(&GradeState::Approved), Some(&vec![a, b]));
        assert_eq!(overview.get(&GradeState::NoSubmission), Some(&vec![sentinel]));
    }

    #[test]
    fn emails_follow_row_order() {
        let tables = course();
        let a = tables.group_by_name("A").unwrap();
        assert_eq!(group_emails(&tables, a), vec!["10@example.org", "11@example.org"]);
    }
}

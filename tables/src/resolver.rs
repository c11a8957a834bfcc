//! # Grade Resolver
//!
//! Derives the current [`GradeState`] of a submission from its timeline using
//! last-write-wins:
//!
//! - no submit action at all: `NoSubmission`, whatever grades were recorded;
//! - otherwise the last action of the [`Timeline`] decides: a submit means
//!   `Pending` (submitted and not graded since), a grade maps its carried
//!   value (`NoGrade` is `Pending`).
//!
//! A resubmission after a grade therefore resets the status to `Pending`.

use crate::model::{Submission, Tables};
use crate::timeline::{Action, Timeline};
use crate::types::{GradeState, SubmissionIdx};

pub fn resolve(tables: &Tables, submission: &Submission) -> GradeState {
    if submission.submit_actions.is_empty() {
        return GradeState::NoSubmission;
    }
    resolve_timeline(tables, &Timeline::of(tables, submission))
}

/// Resolve an already built timeline.
pub fn resolve_timeline(tables: &Tables, timeline: &Timeline) -> GradeState {
    if !timeline.has_submit() {
        return GradeState::NoSubmission;
    }
    match timeline.last().map(|entry| entry.action) {
        Some(Action::Grade(idx)) => tables.grade_action(idx).grade.into(),
        Some(Action::Submit(_)) | None => GradeState::Pending,
    }
}

impl Tables {
    pub fn resolve_grade(&self, idx: SubmissionIdx) -> GradeState {
        resolve(self, self.submission(idx))
    }
}

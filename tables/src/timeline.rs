//! # Action Timeline
//!
//! Chronological view over the grade and submit actions of one submission.
//!
//! ## Ordering
//!
//! Entries compare by, in order:
//! 1. timestamp, ascending;
//! 2. kind: a submit sorts before a grade carrying the same timestamp, since
//!    grading follows the submission it grades;
//! 3. insertion order: the arena index of the action, i.e. the position of its
//!    row in the activity log.
//!
//! The last entry is therefore the action that decides the current status.

use crate::model::{Submission, Tables};
use crate::types::{GradeActionIdx, SubmitActionIdx};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Kind of an action. Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Submit,
    Grade,
}

/// A grade or submit action of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Submit(SubmitActionIdx),
    Grade(GradeActionIdx),
}

impl Action {
    pub fn kind(self) -> ActionKind {
        match self {
            Action::Submit(_) => ActionKind::Submit,
            Action::Grade(_) => ActionKind::Grade,
        }
    }

    fn sequence(self) -> usize {
        match self {
            Action::Submit(idx) => idx.0,
            Action::Grade(idx) => idx.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    pub time: DateTime<Utc>,
    pub action: Action,
}

impl TimelineEntry {
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

impl Ord for TimelineEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.kind().cmp(&other.kind()))
            .then_with(|| self.action.sequence().cmp(&other.action.sequence()))
    }
}

impl PartialOrd for TimelineEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The sorted union of a submission's grade and submit actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn of(tables: &Tables, submission: &Submission) -> Self {
        let submits = submission.submit_actions.iter().map(|&idx| TimelineEntry {
            time: tables.submit_action(idx).time,
            action: Action::Submit(idx),
        });
        let grades = submission.grade_actions.iter().map(|&idx| TimelineEntry {
            time: tables.grade_action(idx).time,
            action: Action::Grade(idx),
        });

        let mut entries: Vec<TimelineEntry> = submits.chain(grades).collect();
        entries.sort();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TimelineEntry> {
        self.entries.last()
    }

    pub fn has_submit(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.kind() == ActionKind::Submit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }
}

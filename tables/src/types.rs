//! # Types Module
//!
//! Identifiers and small value types shared by the raw rows, the entity graph
//! and the resolver.
//!
//! Upstream identifiers (`CourseId`, `PersonId`, `AssignmentId`) are opaque
//! strings as they appear in the scraped pages. Arena indices (`GroupIdx`,
//! `StudentIdx`, ...) are positions inside one built [`crate::model::Tables`]
//! and are only meaningful together with the `Tables` that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Upstream course id.
    CourseId
);
string_id!(
    /// Upstream user id. Ordering is plain string ordering.
    PersonId
);
string_id!(
    /// Upstream assignment (course module) id.
    AssignmentId
);

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_index!(GroupIdx);
arena_index!(
    /// Position in the person-id-sorted student list.
    StudentIdx
);
arena_index!(TeacherIdx);
arena_index!(AssignmentIdx);
arena_index!(SubmissionIdx);
arena_index!(
    /// Insertion order of grade rows that survived resolution.
    GradeActionIdx
);
arena_index!(
    /// Insertion order of submit rows that survived resolution.
    SubmitActionIdx
);

/// When a person last opened the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastAccess {
    Never,
    At(DateTime<Utc>),
}

impl LastAccess {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        match self {
            LastAccess::Never => None,
            LastAccess::At(t) => Some(*t),
        }
    }
}

/// Outcome recorded by one grading event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    NoGrade,
    Approved,
    NotApproved,
}

impl Grade {
    /// Map the free-text grade of a log line onto a [`Grade`].
    ///
    /// Matching is case-insensitive and checks "not approved" before
    /// "approved". Returns `None` for text that fits none of the outcomes.
    pub fn from_text(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        if lower.contains("not approved") {
            Some(Grade::NotApproved)
        } else if lower.contains("approved") {
            Some(Grade::Approved)
        } else if lower.contains("no grade") || lower.contains('-') {
            Some(Grade::NoGrade)
        } else {
            None
        }
    }
}

/// Current status of a submission, derived from its timeline.
///
/// Declaration order is the order used when grouping by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeState {
    NoSubmission,
    Pending,
    NotApproved,
    Approved,
}

impl GradeState {
    pub fn name(self) -> &'static str {
        match self {
            GradeState::NoSubmission => "No submission",
            GradeState::Pending => "Pending",
            GradeState::NotApproved => "Not approved",
            GradeState::Approved => "Approved",
        }
    }
}

impl From<Grade> for GradeState {
    fn from(grade: Grade) -> Self {
        match grade {
            Grade::NoGrade => GradeState::Pending,
            Grade::Approved => GradeState::Approved,
            Grade::NotApproved => GradeState::NotApproved,
        }
    }
}

impl fmt::Display for GradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_text_is_matched_case_insensitively() {
        assert_eq!(Grade::from_text("Approved"), Some(Grade::Approved));
        assert_eq!(Grade::from_text("Grade: NOT APPROVED"), Some(Grade::NotApproved));
        assert_eq!(Grade::from_text("No grade"), Some(Grade::NoGrade));
        assert_eq!(Grade::from_text("-"), Some(Grade::NoGrade));
        assert_eq!(Grade::from_text("7/10"), None);
    }

    #[test]
    fn not_approved_wins_over_approved() {
        // "not approved" contains "approved"; the negative must be checked first.
        assert_eq!(Grade::from_text("not approved"), Some(Grade::NotApproved));
    }

    #[test]
    fn carried_grades_map_onto_states() {
        assert_eq!(GradeState::from(Grade::NoGrade), GradeState::Pending);
        assert_eq!(GradeState::from(Grade::Approved), GradeState::Approved);
        assert_eq!(GradeState::from(Grade::NotApproved), GradeState::NotApproved);
        assert_eq!(GradeState::NotApproved.to_string(), "Not approved");
    }

    #[test]
    fn ids_order_as_strings() {
        let mut ids = vec![PersonId::from("20"), PersonId::from("100"), PersonId::from("3")];
        ids.sort();
        assert_eq!(ids, vec![PersonId::from("100"), PersonId::from("20"), PersonId::from("3")]);
    }
}

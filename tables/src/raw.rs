//! Flat rows handed over by the page scraper.
//!
//! These are the already-extracted tuples of the four upstream tables. They
//! carry no cross references beyond the upstream ids; resolving those ids is
//! the builder's job.

use crate::types::{AssignmentId, LastAccess, PersonId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub id: AssignmentId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRow {
    pub name: String,
    #[serde(default)]
    pub members: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRow {
    pub id: PersonId,
    #[serde(default)]
    pub icon: Option<String>,
    pub name: String,
    pub email: String,
    pub last_access: LastAccess,
}

/// A teacher grading one student's submission of one assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRow {
    pub time: DateTime<Utc>,
    pub teacher: PersonId,
    pub assignment: AssignmentId,
    pub student: PersonId,
    /// Grade text exactly as printed in the log.
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRow {
    pub time: DateTime<Utc>,
    pub student: PersonId,
    pub assignment: AssignmentId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    #[serde(default)]
    pub grades: Vec<GradeRow>,
    #[serde(default)]
    pub submits: Vec<SubmitRow>,
}

/// The joined result of every upstream fetch for one course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTables {
    pub assignments: Vec<AssignmentRow>,
    pub groups: Vec<GroupRow>,
    /// Every enrolled person, any role.
    pub persons: Vec<PersonRow>,
    /// Persons enrolled with the student role.
    pub roster: Vec<PersonRow>,
    pub log: ActivityLog,
}

/// Role filter understood by the person directory page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleFilter {
    All,
    Students,
    Teachers,
    Assistants,
}

impl RoleFilter {
    /// Upstream role id used in the directory query string.
    pub fn role_id(self) -> u32 {
        match self {
            RoleFilter::All => 0,
            RoleFilter::Teachers => 3,
            RoleFilter::Students => 5,
            RoleFilter::Assistants => 9,
        }
    }
}

/// The upstream tables, used to label fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Assignments,
    Groups,
    Persons,
    Roster,
    ActivityLog,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableKind::Assignments => "assignment table",
            TableKind::Groups => "group table",
            TableKind::Persons => "person table",
            TableKind::Roster => "student roster",
            TableKind::ActivityLog => "activity log",
        };
        f.write_str(name)
    }
}

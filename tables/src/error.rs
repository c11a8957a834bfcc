//! Tables Error Types
//!
//! Three families of failure exist and they are handled very differently:
//!
//! - [`SourceFetchError`]: an upstream fetch failed. Fatal for the build in
//!   progress and returned to the caller unchanged. No partial graph exists.
//! - [`IntegrityWarning`]: a row references something the other tables do not
//!   know about. The row is dropped, the warning is recorded on the
//!   [`crate::builder::BuildOutcome`] and logged. Never returned as an `Err`.
//! - [`CacheError`]: a cache blob could not be written or read back. Reads are
//!   absorbed by [`crate::cache::TableCache::fetch`], which treats the entry as
//!   absent; writes are logged by [`crate::store::TableStore`].

use crate::raw::TableKind;
use crate::types::{AssignmentId, CourseId, PersonId};
use thiserror::Error;

/// An upstream fetch failed.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("failed to fetch {table} for course {course}: {message}")]
    Source {
        table: TableKind,
        course: CourseId,
        message: String,
    },

    #[error("failed to read {table} for course {course}: {source}")]
    Io {
        table: TableKind,
        course: CourseId,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {table} for course {course}: {source}")]
    Decode {
        table: TableKind,
        course: CourseId,
        #[source]
        source: serde_json::Error,
    },

    #[error("fetch of {table} for course {course} was aborted")]
    Aborted { table: TableKind, course: CourseId },
}

impl SourceFetchError {
    pub fn table(&self) -> TableKind {
        match self {
            SourceFetchError::Source { table, .. }
            | SourceFetchError::Io { table, .. }
            | SourceFetchError::Decode { table, .. }
            | SourceFetchError::Aborted { table, .. } => *table,
        }
    }
}

/// Counting key for [`IntegrityWarning`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningKind {
    DuplicateGroup,
    DuplicatePerson,
    DuplicateAssignment,
    UnknownMember,
    ConflictingMembership,
    UnknownTeacher,
    UnknownStudent,
    UnknownAssignment,
    UnparsedGrade,
}

/// A row that could not be linked into the graph and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityWarning {
    #[error("group '{0}' listed more than once, later rows ignored")]
    DuplicateGroup(String),

    #[error("person {0} listed more than once, later rows ignored")]
    DuplicatePerson(PersonId),

    #[error("assignment {0} listed more than once, later rows ignored")]
    DuplicateAssignment(AssignmentId),

    #[error("group '{group}' lists unknown person {person}")]
    UnknownMember { group: String, person: PersonId },

    #[error("person {person} is in group '{kept}' and '{ignored}', keeping '{kept}'")]
    ConflictingMembership {
        person: PersonId,
        kept: String,
        ignored: String,
    },

    #[error("log row names unknown teacher {0}")]
    UnknownTeacher(PersonId),

    #[error("log row names unknown student {0}")]
    UnknownStudent(PersonId),

    #[error("log row names unknown assignment {0}")]
    UnknownAssignment(AssignmentId),

    #[error("log row carries unrecognised grade '{0}'")]
    UnparsedGrade(String),
}

impl IntegrityWarning {
    pub fn kind(&self) -> WarningKind {
        match self {
            IntegrityWarning::DuplicateGroup(_) => WarningKind::DuplicateGroup,
            IntegrityWarning::DuplicatePerson(_) => WarningKind::DuplicatePerson,
            IntegrityWarning::DuplicateAssignment(_) => WarningKind::DuplicateAssignment,
            IntegrityWarning::UnknownMember { .. } => WarningKind::UnknownMember,
            IntegrityWarning::ConflictingMembership { .. } => WarningKind::ConflictingMembership,
            IntegrityWarning::UnknownTeacher(_) => WarningKind::UnknownTeacher,
            IntegrityWarning::UnknownStudent(_) => WarningKind::UnknownStudent,
            IntegrityWarning::UnknownAssignment(_) => WarningKind::UnknownAssignment,
            IntegrityWarning::UnparsedGrade(_) => WarningKind::UnparsedGrade,
        }
    }

    /// True for warnings raised while linking activity-log rows.
    pub fn is_dropped_log_row(&self) -> bool {
        matches!(
            self.kind(),
            WarningKind::UnknownTeacher
                | WarningKind::UnknownStudent
                | WarningKind::UnknownAssignment
                | WarningKind::UnparsedGrade
        )
    }
}

/// A cache blob could not be written or loaded.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache blob is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("cache format version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("cache blob belongs to course {found}, expected {expected}")]
    CourseMismatch { found: CourseId, expected: CourseId },

    #[error("cache blob has a dangling reference: {0}")]
    Dangling(String),

    #[error("cache blob breaks a graph invariant: {0}")]
    Inconsistent(String),
}

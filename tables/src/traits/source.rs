//! Table Source Trait
//!
//! This module defines the [`TableSource`] trait, the boundary to whatever
//! scrapes the learning-management pages. Implementations hand back flat,
//! already-parsed rows; authentication, page fetching and text extraction
//! stay on their side of the trait.
//!
//! Each call is independent and read-only, so the core is free to run them
//! concurrently. A failure must be returned as a [`SourceFetchError`], never
//! papered over with an empty table.

use crate::error::SourceFetchError;
use crate::raw::{ActivityLog, AssignmentRow, GroupRow, PersonRow, RoleFilter};
use crate::types::CourseId;
use async_trait::async_trait;

#[async_trait]
pub trait TableSource: Send + Sync {
    /// `(assignment id, title)` for every assignment of the course.
    async fn fetch_assignments(
        &self,
        course: &CourseId,
    ) -> Result<Vec<AssignmentRow>, SourceFetchError>;

    /// `(group name, member ids)` for every group of the course.
    async fn fetch_groups(&self, course: &CourseId) -> Result<Vec<GroupRow>, SourceFetchError>;

    /// Person directory, restricted to one role.
    async fn fetch_persons(
        &self,
        course: &CourseId,
        role: RoleFilter,
    ) -> Result<Vec<PersonRow>, SourceFetchError>;

    /// Grade and submit events of the course log.
    async fn fetch_activity_log(&self, course: &CourseId) -> Result<ActivityLog, SourceFetchError>;
}

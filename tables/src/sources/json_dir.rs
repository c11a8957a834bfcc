//! A [`TableSource`] reading scraped dumps from disk.
//!
//! Layout, one directory per course under the root:
//!
//! ```text
//! <root>/<course>/assignments.json   [{"id": "...", "title": "..."}]
//! <root>/<course>/groups.json        [{"name": "...", "members": ["..."]}]
//! <root>/<course>/persons.json       every enrolled person
//! <root>/<course>/students.json      persons with the student role
//! <root>/<course>/log.json           {"grades": [...], "submits": [...]}
//! ```
//!
//! A missing or undecodable file is a fetch failure, never an empty table.

use crate::error::SourceFetchError;
use crate::raw::{ActivityLog, AssignmentRow, GroupRow, PersonRow, RoleFilter, TableKind};
use crate::traits::source::TableSource;
use crate::types::CourseId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;
use util::paths;

#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source rooted at `AppConfig::source_root`.
    pub fn from_config() -> Self {
        Self::new(paths::source_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(table: TableKind) -> &'static str {
        match table {
            TableKind::Assignments => "assignments.json",
            TableKind::Groups => "groups.json",
            TableKind::Persons => "persons.json",
            TableKind::Roster => "students.json",
            TableKind::ActivityLog => "log.json",
        }
    }

    pub fn path_for(&self, course: &CourseId, table: TableKind) -> PathBuf {
        paths::course_source_dir(&self.root, course.as_str()).join(Self::file_name(table))
    }

    async fn read<T: DeserializeOwned>(
        &self,
        course: &CourseId,
        table: TableKind,
    ) -> Result<T, SourceFetchError> {
        let path = self.path_for(course, table);
        debug!(course = %course, path = %path.display(), "reading dump");
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| SourceFetchError::Io {
                table,
                course: course.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| SourceFetchError::Decode {
            table,
            course: course.clone(),
            source,
        })
    }
}

#[async_trait]
impl TableSource for JsonDirSource {
    async fn fetch_assignments(
        &self,
        course: &CourseId,
    ) -> Result<Vec<AssignmentRow>, SourceFetchError> {
        self.read(course, TableKind::Assignments).await
    }

    async fn fetch_groups(&self, course: &CourseId) -> Result<Vec<GroupRow>, SourceFetchError> {
        self.read(course, TableKind::Groups).await
    }

    /// Only the student filter has its own dump; any other filter reads the
    /// full directory.
    async fn fetch_persons(
        &self,
        course: &CourseId,
        role: RoleFilter,
    ) -> Result<Vec<PersonRow>, SourceFetchError> {
        let table = match role {
            RoleFilter::Students => TableKind::Roster,
            _ => TableKind::Persons,
        };
        self.read(course, table).await
    }

    async fn fetch_activity_log(&self, course: &CourseId) -> Result<ActivityLog, SourceFetchError> {
        self.read(course, TableKind::ActivityLog).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LastAccess, PersonId};
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;
    use util::test_helpers::setup_test_source_root;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn dump() -> (TempDir, JsonDirSource) {
        let root = TempDir::new().unwrap();
        let course = root.path().join("42");
        fs::create_dir_all(&course).unwrap();
        write(&course, "assignments.json", r#"[{"id": "901", "title": "Hand-in 1"}]"#);
        write(&course, "groups.json", r#"[{"name": "G1", "members": ["5000"]}]"#);
        write(
            &course,
            "persons.json",
            r#"[
                {"id": "5000", "name": "Ann", "email": "ann@example.org", "last_access": "never"},
                {"id": "1000", "name": "Tia", "email": "tia@example.org",
                 "last_access": {"at": "2016-09-01T08:00:00Z"}}
            ]"#,
        );
        write(
            &course,
            "students.json",
            r#"[{"id": "5000", "name": "Ann", "email": "ann@example.org", "last_access": "never"}]"#,
        );
        write(
            &course,
            "log.json",
            r#"{"submits": [{"time": "2016-09-01T09:00:00Z", "student": "5000", "assignment": "901"}]}"#,
        );
        let source = JsonDirSource::new(root.path());
        (root, source)
    }

    #[tokio::test]
    async fn reads_every_table() {
        let (_root, source) = dump();
        let course = CourseId::from("42");

        assert_eq!(source.fetch_assignments(&course).await.unwrap().len(), 1);
        assert_eq!(source.fetch_groups(&course).await.unwrap()[0].members, vec![PersonId::from("5000")]);

        let persons = source.fetch_persons(&course, RoleFilter::All).await.unwrap();
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0].last_access, LastAccess::Never);
        assert!(persons[1].last_access.time().is_some());

        let roster = source.fetch_persons(&course, RoleFilter::Students).await.unwrap();
        assert_eq!(roster.len(), 1);

        let log = source.fetch_activity_log(&course).await.unwrap();
        assert_eq!(log.submits.len(), 1);
        assert!(log.grades.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn configured_root_is_used() {
        let root = setup_test_source_root();
        let course = root.path().join("7");
        fs::create_dir_all(&course).unwrap();
        write(&course, "assignments.json", r#"[{"id": "1", "title": "Intro"}]"#);

        let source = JsonDirSource::from_config();
        assert_eq!(source.root(), root.path().canonicalize().unwrap());
        let rows = source.fetch_assignments(&CourseId::from("7")).await.unwrap();
        assert_eq!(rows[0].title, "Intro");

        util::config::AppConfig::reset();
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let (_root, source) = dump();
        let err = source
            .fetch_groups(&CourseId::from("unknown"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceFetchError::Io { table: TableKind::Groups, .. }));
    }

    #[tokio::test]
    async fn malformed_file_is_a_decode_error() {
        let (root, source) = dump();
        write(&root.path().join("42"), "groups.json", "{ not a list");
        let err = source.fetch_groups(&CourseId::from("42")).await.unwrap_err();
        assert!(matches!(err, SourceFetchError::Decode { table: TableKind::Groups, .. }));
    }
}

//! Fixtures shared by unit and integration tests.

use crate::error::SourceFetchError;
use crate::raw::{
    ActivityLog, AssignmentRow, GradeRow, GroupRow, PersonRow, RawTables, RoleFilter, SubmitRow,
    TableKind,
};
use crate::traits::source::TableSource;
use crate::types::{AssignmentId, CourseId, LastAccess, PersonId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed instant plus `minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 9, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn person_row(id: &str, name: &str) -> PersonRow {
    PersonRow {
        id: PersonId::from(id),
        icon: None,
        name: name.to_string(),
        email: format!("{id}@example.org"),
        last_access: LastAccess::Never,
    }
}

/// Fluent builder for [`RawTables`].
#[derive(Debug, Clone, Default)]
pub struct RawBuilder {
    raw: RawTables,
}

impl RawBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignment(mut self, id: &str, title: &str) -> Self {
        self.raw.assignments.push(AssignmentRow {
            id: AssignmentId::from(id),
            title: title.to_string(),
        });
        self
    }

    pub fn group(mut self, name: &str, members: &[&str]) -> Self {
        self.raw.groups.push(GroupRow {
            name: name.to_string(),
            members: members.iter().map(|m| PersonId::from(*m)).collect(),
        });
        self
    }

    /// Person present in the directory only.
    pub fn person(mut self, id: &str, name: &str) -> Self {
        self.raw.persons.push(person_row(id, name));
        self
    }

    /// Person present in the directory and the student roster.
    pub fn student(mut self, id: &str, name: &str) -> Self {
        self.raw.persons.push(person_row(id, name));
        self.raw.roster.push(person_row(id, name));
        self
    }

    /// Person in the directory with no group and no student role.
    pub fn teacher(self, id: &str, name: &str) -> Self {
        self.person(id, name)
    }

    pub fn grade(
        mut self,
        time: DateTime<Utc>,
        teacher: &str,
        assignment: &str,
        student: &str,
        grade: &str,
    ) -> Self {
        self.raw.log.grades.push(GradeRow {
            time,
            teacher: PersonId::from(teacher),
            assignment: AssignmentId::from(assignment),
            student: PersonId::from(student),
            grade: grade.to_string(),
        });
        self
    }

    pub fn submit(mut self, time: DateTime<Utc>, student: &str, assignment: &str) -> Self {
        self.raw.log.submits.push(SubmitRow {
            time,
            student: PersonId::from(student),
            assignment: AssignmentId::from(assignment),
        });
        self
    }

    pub fn build(self) -> RawTables {
        self.raw
    }
}

/// A course shaped like the production one: 146 people, of which 7 teach,
/// 124 sit in 62 groups of two, and 15 are enrolled without a group.
pub fn large_course() -> RawTables {
    let mut builder = RawBuilder::new();
    for a in 1..=8 {
        builder = builder.assignment(&format!("90{a}"), &format!("Hand-in {a}"));
    }
    for t in 0..7 {
        builder = builder.teacher(&format!("1{t:03}"), &format!("Teacher {t}"));
    }

    let mut next_student = 5000;
    for g in 0..62 {
        let first = next_student.to_string();
        let second = (next_student + 1).to_string();
        next_student += 2;
        builder = builder
            .group(&format!("G{g:02}"), &[first.as_str(), second.as_str()])
            .student(&first, &format!("Student {first}"))
            .student(&second, &format!("Student {second}"));
    }
    for _ in 0..15 {
        let id = next_student.to_string();
        next_student += 1;
        builder = builder.student(&id, &format!("Student {id}"));
    }

    // Every group submits hand-in 1, the first 20 get approved.
    for g in 0..62 {
        let student = (5000 + 2 * g).to_string();
        builder = builder.submit(at(g), &student, "901");
        if g < 20 {
            builder = builder.grade(at(100 + g), "1000", "901", &student, "Approved");
        }
    }
    builder.build()
}

/// In-memory [`TableSource`] recording how many fetches overlap.
#[derive(Debug, Default)]
pub struct InMemorySource {
    courses: HashMap<CourseId, RawTables>,
    failing: Mutex<Option<TableKind>>,
    delay_ms: u64,
    running: AtomicUsize,
    max_running: AtomicUsize,
    calls: AtomicUsize,
    replacements: Mutex<HashMap<CourseId, RawTables>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_course(mut self, course: &str, raw: RawTables) -> Self {
        self.courses.insert(CourseId::from(course), raw);
        self
    }

    /// Make every fetch of `table` fail.
    pub fn failing(self, table: TableKind) -> Self {
        self.set_failing(Some(table));
        self
    }

    /// Start (or stop) failing fetches of one table, as if the upstream broke.
    pub fn set_failing(&self, table: Option<TableKind>) {
        if let Ok(mut failing) = self.failing.lock() {
            *failing = table;
        }
    }

    /// Hold every fetch for `ms` milliseconds.
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Serve `raw` for `course` from now on, as if the upstream changed.
    pub fn replace(&self, course: &str, raw: RawTables) {
        if let Ok(mut replacements) = self.replacements.lock() {
            replacements.insert(CourseId::from(course), raw);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    async fn serve<T>(
        &self,
        table: TableKind,
        course: &CourseId,
        pick: impl FnOnce(&RawTables) -> T,
    ) -> Result<T, SourceFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(current, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing.lock().ok().and_then(|f| *f);
        if failing == Some(table) {
            return Err(SourceFetchError::Source {
                table,
                course: course.clone(),
                message: "upstream returned 503".into(),
            });
        }

        let replaced = self
            .replacements
            .lock()
            .ok()
            .and_then(|r| r.get(course).cloned());
        let raw = match replaced.as_ref().or_else(|| self.courses.get(course)) {
            Some(raw) => raw,
            None => {
                return Err(SourceFetchError::Source {
                    table,
                    course: course.clone(),
                    message: "unknown course".into(),
                });
            }
        };
        Ok(pick(raw))
    }
}

#[async_trait]
impl TableSource for InMemorySource {
    async fn fetch_assignments(
        &self,
        course: &CourseId,
    ) -> Result<Vec<AssignmentRow>, SourceFetchError> {
        self.serve(TableKind::Assignments, course, |raw| raw.assignments.clone())
            .await
    }

    async fn fetch_groups(&self, course: &CourseId) -> Result<Vec<GroupRow>, SourceFetchError> {
        self.serve(TableKind::Groups, course, |raw| raw.groups.clone())
            .await
    }

    async fn fetch_persons(
        &self,
        course: &CourseId,
        role: RoleFilter,
    ) -> Result<Vec<PersonRow>, SourceFetchError> {
        match role {
            RoleFilter::Students => {
                self.serve(TableKind::Roster, course, |raw| raw.roster.clone())
                    .await
            }
            _ => {
                self.serve(TableKind::Persons, course, |raw| raw.persons.clone())
                    .await
            }
        }
    }

    async fn fetch_activity_log(&self, course: &CourseId) -> Result<ActivityLog, SourceFetchError> {
        self.serve(TableKind::ActivityLog, course, |raw| raw.log.clone())
            .await
    }
}

//! # Entity Graph
//!
//! The cross-referenced graph of one course: groups, students, teachers,
//! assignments, submissions and the grade/submit actions linking them.
//!
//! Entities live in flat arenas owned by [`Tables`]; relationships are arena
//! indices. Every relationship is stored on both ends (a grade action knows
//! its teacher and submission, and both list the action), which
//! [`Tables::validate`] checks. A `Tables` is only ever created whole by the
//! builder or the cache loader and is read-only afterwards.

use crate::error::CacheError;
use crate::types::{
    AssignmentId, AssignmentIdx, CourseId, Grade, GradeActionIdx, GroupIdx, LastAccess, PersonId,
    StudentIdx, SubmissionIdx, SubmitActionIdx, TeacherIdx,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Name given to the sentinel group holding students without a group.
pub const DEFAULT_GROUP_NAME: &str = "No group";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub email: String,
    pub icon: Option<String>,
    pub last_access: LastAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Set only on the sentinel group.
    pub is_default: bool,
    /// Members in row order (ascending person id).
    pub students: Vec<StudentIdx>,
    pub submissions: Vec<SubmissionIdx>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub person: Person,
    pub group: GroupIdx,
    pub submit_actions: Vec<SubmitActionIdx>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub person: Person,
    pub grade_actions: Vec<GradeActionIdx>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub title: String,
    pub submissions: Vec<SubmissionIdx>,
}

/// The grading slot of one (group, assignment) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Row of the group in the upstream grading table, `None` for a group
    /// without students.
    pub row: Option<usize>,
    pub group: GroupIdx,
    pub assignment: AssignmentIdx,
    pub grade_actions: Vec<GradeActionIdx>,
    pub submit_actions: Vec<SubmitActionIdx>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeAction {
    pub time: DateTime<Utc>,
    pub grade: Grade,
    pub teacher: TeacherIdx,
    pub submission: SubmissionIdx,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAction {
    pub time: DateTime<Utc>,
    pub student: StudentIdx,
    pub submission: SubmissionIdx,
}

/// How a person id is classified in a built graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student(StudentIdx),
    Teacher(TeacherIdx),
}

/// Lookup tables derived from the arenas. Never serialised.
#[derive(Debug, Clone, Default)]
struct TableIndex {
    persons: HashMap<PersonId, Role>,
    assignments: HashMap<AssignmentId, AssignmentIdx>,
    groups: HashMap<String, GroupIdx>,
    submissions: HashMap<(GroupIdx, AssignmentIdx), SubmissionIdx>,
}

impl TableIndex {
    fn build(tables: &Tables) -> Self {
        let mut index = TableIndex::default();
        for (i, student) in tables.students.iter().enumerate() {
            index
                .persons
                .insert(student.person.id.clone(), Role::Student(StudentIdx(i)));
        }
        for (i, teacher) in tables.teachers.iter().enumerate() {
            index
                .persons
                .entry(teacher.person.id.clone())
                .or_insert(Role::Teacher(TeacherIdx(i)));
        }
        for (i, assignment) in tables.assignments.iter().enumerate() {
            index
                .assignments
                .entry(assignment.id.clone())
                .or_insert(AssignmentIdx(i));
        }
        for (i, group) in tables.groups.iter().enumerate() {
            index.groups.entry(group.name.clone()).or_insert(GroupIdx(i));
        }
        for (i, submission) in tables.submissions.iter().enumerate() {
            index
                .submissions
                .entry((submission.group, submission.assignment))
                .or_insert(SubmissionIdx(i));
        }
        index
    }
}

/// The published graph of one course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tables {
    pub(crate) course: CourseId,
    pub(crate) groups: Vec<Group>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) teachers: Vec<Teacher>,
    pub(crate) students: Vec<Student>,
    pub(crate) submissions: Vec<Submission>,
    pub(crate) grade_actions: Vec<GradeAction>,
    pub(crate) submit_actions: Vec<SubmitAction>,
    #[serde(skip)]
    index: TableIndex,
}

impl Tables {
    /// Assemble a graph from finished arenas and index it.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        course: CourseId,
        groups: Vec<Group>,
        assignments: Vec<Assignment>,
        teachers: Vec<Teacher>,
        students: Vec<Student>,
        submissions: Vec<Submission>,
        grade_actions: Vec<GradeAction>,
        submit_actions: Vec<SubmitAction>,
    ) -> Self {
        let mut tables = Tables {
            course,
            groups,
            assignments,
            teachers,
            students,
            submissions,
            grade_actions,
            submit_actions,
            index: TableIndex::default(),
        };
        tables.reindex();
        tables
    }

    /// Rebuild the lookup index, e.g. after deserialisation.
    pub(crate) fn reindex(&mut self) {
        self.index = TableIndex::build(self);
    }

    pub fn course(&self) -> &CourseId {
        &self.course
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// Students sorted by person id.
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn grade_actions(&self) -> &[GradeAction] {
        &self.grade_actions
    }

    pub fn submit_actions(&self) -> &[SubmitAction] {
        &self.submit_actions
    }

    pub fn group(&self, idx: GroupIdx) -> &Group {
        &self.groups[idx.0]
    }

    pub fn assignment(&self, idx: AssignmentIdx) -> &Assignment {
        &self.assignments[idx.0]
    }

    pub fn teacher(&self, idx: TeacherIdx) -> &Teacher {
        &self.teachers[idx.0]
    }

    pub fn student(&self, idx: StudentIdx) -> &Student {
        &self.students[idx.0]
    }

    pub fn submission(&self, idx: SubmissionIdx) -> &Submission {
        &self.submissions[idx.0]
    }

    pub fn grade_action(&self, idx: GradeActionIdx) -> &GradeAction {
        &self.grade_actions[idx.0]
    }

    pub fn submit_action(&self, idx: SubmitActionIdx) -> &SubmitAction {
        &self.submit_actions[idx.0]
    }

    /// Index of every arena entry, handy for iteration with ids.
    pub fn group_indices(&self) -> impl Iterator<Item = GroupIdx> + '_ {
        (0..self.groups.len()).map(GroupIdx)
    }

    pub fn submission_indices(&self) -> impl Iterator<Item = SubmissionIdx> + '_ {
        (0..self.submissions.len()).map(SubmissionIdx)
    }

    pub fn role_of(&self, person: &PersonId) -> Option<Role> {
        self.index.persons.get(person).copied()
    }

    pub fn student_by_person(&self, person: &PersonId) -> Option<StudentIdx> {
        match self.role_of(person)? {
            Role::Student(idx) => Some(idx),
            Role::Teacher(_) => None,
        }
    }

    pub fn teacher_by_person(&self, person: &PersonId) -> Option<TeacherIdx> {
        match self.role_of(person)? {
            Role::Teacher(idx) => Some(idx),
            Role::Student(_) => None,
        }
    }

    pub fn assignment_by_id(&self, id: &AssignmentId) -> Option<AssignmentIdx> {
        self.index.assignments.get(id).copied()
    }

    pub fn group_by_name(&self, name: &str) -> Option<GroupIdx> {
        self.index.groups.get(name).copied()
    }

    /// The sentinel group. Always the last group of a built graph.
    pub fn default_group(&self) -> Option<GroupIdx> {
        self.groups
            .iter()
            .rposition(|g| g.is_default)
            .map(GroupIdx)
    }

    pub fn submission_for(
        &self,
        group: GroupIdx,
        assignment: AssignmentIdx,
    ) -> Option<SubmissionIdx> {
        self.index.submissions.get(&(group, assignment)).copied()
    }

    /// Submission graded or submitted on behalf of `student` for `assignment`.
    pub fn submission_of_student(
        &self,
        student: &PersonId,
        assignment: &AssignmentId,
    ) -> Option<SubmissionIdx> {
        let group = self.student(self.student_by_person(student)?).group;
        self.submission_for(group, self.assignment_by_id(assignment)?)
    }

    /// Check referential closure and that every link is stored on both ends.
    pub fn validate(&self) -> Result<(), CacheError> {
        let dangling = |what: String| -> Result<(), CacheError> { Err(CacheError::Dangling(what)) };

        for (g, group) in self.groups.iter().enumerate() {
            for &s in &group.students {
                match self.students.get(s.0) {
                    Some(student) if student.group.0 == g => {}
                    Some(_) => return dangling(format!("group {g} lists foreign student {}", s.0)),
                    None => return dangling(format!("group {g} lists student {}", s.0)),
                }
            }
            for &sub in &group.submissions {
                match self.submissions.get(sub.0) {
                    Some(submission) if submission.group.0 == g => {}
                    _ => return dangling(format!("group {g} lists submission {}", sub.0)),
                }
            }
        }

        for (i, student) in self.students.iter().enumerate() {
            let Some(group) = self.groups.get(student.group.0) else {
                return dangling(format!("student {i} points at group {}", student.group.0));
            };
            if !group.students.contains(&StudentIdx(i)) {
                return dangling(format!("student {i} missing from its group"));
            }
            for &a in &student.submit_actions {
                match self.submit_actions.get(a.0) {
                    Some(action) if action.student.0 == i => {}
                    _ => return dangling(format!("student {i} lists submit action {}", a.0)),
                }
            }
        }

        for (i, teacher) in self.teachers.iter().enumerate() {
            for &a in &teacher.grade_actions {
                match self.grade_actions.get(a.0) {
                    Some(action) if action.teacher.0 == i => {}
                    _ => return dangling(format!("teacher {i} lists grade action {}", a.0)),
                }
            }
        }

        for (a, assignment) in self.assignments.iter().enumerate() {
            for &sub in &assignment.submissions {
                match self.submissions.get(sub.0) {
                    Some(submission) if submission.assignment.0 == a => {}
                    _ => return dangling(format!("assignment {a} lists submission {}", sub.0)),
                }
            }
        }

        for (i, submission) in self.submissions.iter().enumerate() {
            let here = SubmissionIdx(i);
            let group_ok = self
                .groups
                .get(submission.group.0)
                .is_some_and(|g| g.submissions.contains(&here));
            let assignment_ok = self
                .assignments
                .get(submission.assignment.0)
                .is_some_and(|a| a.submissions.contains(&here));
            if !group_ok || !assignment_ok {
                return dangling(format!("submission {i} not linked from its group/assignment"));
            }
            for &g in &submission.grade_actions {
                match self.grade_actions.get(g.0) {
                    Some(action) if action.submission == here => {}
                    _ => return dangling(format!("submission {i} lists grade action {}", g.0)),
                }
            }
            for &s in &submission.submit_actions {
                match self.submit_actions.get(s.0) {
                    Some(action) if action.submission == here => {}
                    _ => return dangling(format!("submission {i} lists submit action {}", s.0)),
                }
            }
        }

        for (i, action) in self.grade_actions.iter().enumerate() {
            let here = GradeActionIdx(i);
            let linked = self
                .teachers
                .get(action.teacher.0)
                .is_some_and(|t| t.grade_actions.contains(&here))
                && self
                    .submissions
                    .get(action.submission.0)
                    .is_some_and(|s| s.grade_actions.contains(&here));
            if !linked {
                return dangling(format!("grade action {i} not linked from both ends"));
            }
        }

        for (i, action) in self.submit_actions.iter().enumerate() {
            let here = SubmitActionIdx(i);
            let linked = self
                .students
                .get(action.student.0)
                .is_some_and(|s| s.submit_actions.contains(&here))
                && self
                    .submissions
                    .get(action.submission.0)
                    .is_some_and(|s| s.submit_actions.contains(&here));
            if !linked {
                return dangling(format!("submit action {i} not linked from both ends"));
            }
        }

        self.check_roles()?;
        self.check_submissions()
    }

    /// Every person holds exactly one role.
    fn check_roles(&self) -> Result<(), CacheError> {
        let mut seen = HashSet::new();
        let persons = self
            .students
            .iter()
            .map(|s| &s.person)
            .chain(self.teachers.iter().map(|t| &t.person));
        for person in persons {
            if !seen.insert(&person.id) {
                return Err(CacheError::Inconsistent(format!(
                    "person {} holds more than one role",
                    person.id
                )));
            }
        }
        Ok(())
    }

    /// One submission per (group, assignment), each on its group's first row.
    fn check_submissions(&self) -> Result<(), CacheError> {
        let mut pairs = HashSet::new();
        for (i, submission) in self.submissions.iter().enumerate() {
            if !pairs.insert((submission.group, submission.assignment)) {
                return Err(CacheError::Inconsistent(format!(
                    "submission {i} duplicates group {} and assignment {}",
                    submission.group.0, submission.assignment.0
                )));
            }
            let first = self.groups[submission.group.0]
                .students
                .iter()
                .map(|s| s.index())
                .min();
            if submission.row != first {
                return Err(CacheError::Inconsistent(format!(
                    "submission {i} sits on row {:?}, its group starts at {:?}",
                    submission.row, first
                )));
            }
        }
        Ok(())
    }
}

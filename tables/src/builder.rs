//! # Entity Graph Builder
//!
//! Turns the joined [`RawTables`] of one course into a [`Tables`] graph.
//!
//! ## Steps
//! 1. One group per named group row with members, plus the sentinel group.
//! 2. One person per person row.
//! 3. A person is a student when some group lists them (first listing group
//!    wins) or the student roster does (sentinel group); everyone else is a
//!    teacher.
//! 4. Students are sorted by person id. That order alone fixes row numbers.
//! 5. One submission per (group, assignment) pair.
//! 6. A submission's row is the sorted position of its group's first student.
//! 7. Grade rows are linked to their teacher and to the submission of the
//!    graded student's group.
//! 8. Submit rows are linked to their student and submission likewise.
//!
//! Rows that cannot be resolved are dropped and reported as
//! [`IntegrityWarning`]s; they never abort the build. The builder performs no
//! I/O and produces the same graph for the same input.

use crate::error::{IntegrityWarning, WarningKind};
use crate::model::{
    Assignment, DEFAULT_GROUP_NAME, GradeAction, Group, Person, Student, Submission, SubmitAction,
    Tables, Teacher,
};
use crate::raw::{GradeRow, PersonRow, RawTables, SubmitRow};
use crate::types::{
    AssignmentId, AssignmentIdx, CourseId, Grade, GradeActionIdx, GroupIdx, PersonId, StudentIdx,
    SubmissionIdx, SubmitActionIdx, TeacherIdx,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// A built graph together with every row dropped on the way.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub tables: Tables,
    pub warnings: Vec<IntegrityWarning>,
}

impl BuildOutcome {
    /// Number of activity-log rows that could not be linked.
    pub fn dropped_log_rows(&self) -> usize {
        self.warnings.iter().filter(|w| w.is_dropped_log_row()).count()
    }

    pub fn warning_counts(&self) -> BTreeMap<WarningKind, usize> {
        let mut counts = BTreeMap::new();
        for warning in &self.warnings {
            *counts.entry(warning.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// Build the graph for `course` and log (rather than return) the warnings.
pub fn build_tables(course: CourseId, raw: &RawTables) -> Tables {
    EntityGraphBuilder::new(course).build(raw).tables
}

/// Single-use builder holding the arenas while they are filled in.
pub struct EntityGraphBuilder {
    course: CourseId,
    groups: Vec<Group>,
    assignments: Vec<Assignment>,
    teachers: Vec<Teacher>,
    students: Vec<Student>,
    submissions: Vec<Submission>,
    grade_actions: Vec<GradeAction>,
    submit_actions: Vec<SubmitAction>,
    warnings: Vec<IntegrityWarning>,
}

/// Lookups used while linking log rows.
#[derive(Default)]
struct Resolve {
    teachers: HashMap<PersonId, TeacherIdx>,
    students: HashMap<PersonId, StudentIdx>,
    assignments: HashMap<AssignmentId, AssignmentIdx>,
    submissions: HashMap<(GroupIdx, AssignmentIdx), SubmissionIdx>,
}

impl EntityGraphBuilder {
    pub fn new(course: CourseId) -> Self {
        Self {
            course,
            groups: Vec::new(),
            assignments: Vec::new(),
            teachers: Vec::new(),
            students: Vec::new(),
            submissions: Vec::new(),
            grade_actions: Vec::new(),
            submit_actions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn build(mut self, raw: &RawTables) -> BuildOutcome {
        let mut resolve = Resolve::default();

        let (membership, default_group) = self.add_groups(raw);
        let persons = self.add_persons(&raw.persons);
        self.report_unknown_members(raw, &persons);
        self.classify(persons, &membership, default_group, raw, &mut resolve);
        self.add_assignments(raw, &mut resolve);
        self.add_submissions(&mut resolve);

        for row in &raw.log.grades {
            self.link_grade(row, &resolve);
        }
        for row in &raw.log.submits {
            self.link_submit(row, &resolve);
        }

        self.finish()
    }

    fn warn(&mut self, warning: IntegrityWarning) {
        debug!(course = %self.course, "{warning}");
        self.warnings.push(warning);
    }

    /// Steps 1 and the membership half of step 3.
    fn add_groups(&mut self, raw: &RawTables) -> (HashMap<PersonId, GroupIdx>, GroupIdx) {
        let mut membership: HashMap<PersonId, GroupIdx> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for row in raw.groups.iter().filter(|row| !row.members.is_empty()) {
            if !seen.insert(row.name.as_str()) {
                self.warn(IntegrityWarning::DuplicateGroup(row.name.clone()));
                continue;
            }
            let idx = GroupIdx(self.groups.len());
            self.groups.push(Group {
                name: row.name.clone(),
                is_default: false,
                students: Vec::new(),
                submissions: Vec::new(),
            });
            for member in &row.members {
                if let Some(&kept) = membership.get(member) {
                    if kept != idx {
                        let warning = IntegrityWarning::ConflictingMembership {
                            person: member.clone(),
                            kept: self.groups[kept.0].name.clone(),
                            ignored: row.name.clone(),
                        };
                        self.warn(warning);
                    }
                    continue;
                }
                membership.insert(member.clone(), idx);
            }
        }

        let default_group = GroupIdx(self.groups.len());
        self.groups.push(Group {
            name: DEFAULT_GROUP_NAME.to_string(),
            is_default: true,
            students: Vec::new(),
            submissions: Vec::new(),
        });
        (membership, default_group)
    }

    /// Step 2.
    fn add_persons(&mut self, rows: &[PersonRow]) -> Vec<Person> {
        let mut seen: HashSet<&PersonId> = HashSet::new();
        let mut persons = Vec::with_capacity(rows.len());
        for row in rows {
            if !seen.insert(&row.id) {
                self.warn(IntegrityWarning::DuplicatePerson(row.id.clone()));
                continue;
            }
            persons.push(Person {
                id: row.id.clone(),
                name: row.name.clone(),
                email: row.email.clone(),
                icon: row.icon.clone(),
                last_access: row.last_access,
            });
        }
        persons
    }

    fn report_unknown_members(&mut self, raw: &RawTables, persons: &[Person]) {
        let known: HashSet<&PersonId> = persons.iter().map(|p| &p.id).collect();
        let unknown: Vec<IntegrityWarning> = raw
            .groups
            .iter()
            .flat_map(|row| {
                row.members
                    .iter()
                    .filter(|m| !known.contains(m))
                    .map(|m| IntegrityWarning::UnknownMember {
                        group: row.name.clone(),
                        person: m.clone(),
                    })
            })
            .collect();
        for warning in unknown {
            self.warn(warning);
        }
    }

    /// Steps 3, 4 and the student half of the group links.
    fn classify(
        &mut self,
        persons: Vec<Person>,
        membership: &HashMap<PersonId, GroupIdx>,
        default_group: GroupIdx,
        raw: &RawTables,
        resolve: &mut Resolve,
    ) {
        let roster: HashSet<&PersonId> = raw.roster.iter().map(|row| &row.id).collect();

        for person in persons {
            let group = match membership.get(&person.id) {
                Some(&group) => Some(group),
                None if roster.contains(&person.id) => Some(default_group),
                None => None,
            };
            match group {
                Some(group) => self.students.push(Student {
                    person,
                    group,
                    submit_actions: Vec::new(),
                }),
                None => {
                    resolve
                        .teachers
                        .insert(person.id.clone(), TeacherIdx(self.teachers.len()));
                    self.teachers.push(Teacher {
                        person,
                        grade_actions: Vec::new(),
                    });
                }
            }
        }

        self.students
            .sort_by(|a, b| a.person.id.cmp(&b.person.id));

        for (i, student) in self.students.iter().enumerate() {
            let idx = StudentIdx(i);
            self.groups[student.group.0].students.push(idx);
            resolve.students.insert(student.person.id.clone(), idx);
        }
    }

    fn add_assignments(&mut self, raw: &RawTables, resolve: &mut Resolve) {
        for row in &raw.assignments {
            if resolve.assignments.contains_key(&row.id) {
                self.warn(IntegrityWarning::DuplicateAssignment(row.id.clone()));
                continue;
            }
            resolve
                .assignments
                .insert(row.id.clone(), AssignmentIdx(self.assignments.len()));
            self.assignments.push(Assignment {
                id: row.id.clone(),
                title: row.title.clone(),
                submissions: Vec::new(),
            });
        }
    }

    /// Steps 5 and 6.
    fn add_submissions(&mut self, resolve: &mut Resolve) {
        for g in 0..self.groups.len() {
            // Group members are pushed in sorted order, so the first is the lowest row.
            let row = self.groups[g].students.first().map(|s| s.0);
            for a in 0..self.assignments.len() {
                let idx = SubmissionIdx(self.submissions.len());
                self.submissions.push(Submission {
                    row,
                    group: GroupIdx(g),
                    assignment: AssignmentIdx(a),
                    grade_actions: Vec::new(),
                    submit_actions: Vec::new(),
                });
                self.groups[g].submissions.push(idx);
                self.assignments[a].submissions.push(idx);
                resolve
                    .submissions
                    .insert((GroupIdx(g), AssignmentIdx(a)), idx);
            }
        }
    }

    /// Submission of the group `student` belongs to, for `assignment`.
    fn target(
        &mut self,
        resolve: &Resolve,
        student: &PersonId,
        assignment: &AssignmentId,
    ) -> Option<(StudentIdx, SubmissionIdx)> {
        let Some(&a) = resolve.assignments.get(assignment) else {
            self.warn(IntegrityWarning::UnknownAssignment(assignment.clone()));
            return None;
        };
        let Some(&s) = resolve.students.get(student) else {
            self.warn(IntegrityWarning::UnknownStudent(student.clone()));
            return None;
        };
        let group = self.students[s.0].group;
        resolve
            .submissions
            .get(&(group, a))
            .map(|&submission| (s, submission))
    }

    /// Step 7.
    fn link_grade(&mut self, row: &GradeRow, resolve: &Resolve) {
        let Some(&teacher) = resolve.teachers.get(&row.teacher) else {
            self.warn(IntegrityWarning::UnknownTeacher(row.teacher.clone()));
            return;
        };
        let Some((_, submission)) = self.target(resolve, &row.student, &row.assignment) else {
            return;
        };
        let Some(grade) = Grade::from_text(&row.grade) else {
            self.warn(IntegrityWarning::UnparsedGrade(row.grade.clone()));
            return;
        };

        let idx = GradeActionIdx(self.grade_actions.len());
        self.grade_actions.push(GradeAction {
            time: row.time,
            grade,
            teacher,
            submission,
        });
        self.teachers[teacher.0].grade_actions.push(idx);
        self.submissions[submission.0].grade_actions.push(idx);
    }

    /// Step 8.
    fn link_submit(&mut self, row: &SubmitRow, resolve: &Resolve) {
        let Some((student, submission)) = self.target(resolve, &row.student, &row.assignment)
        else {
            return;
        };

        let idx = SubmitActionIdx(self.submit_actions.len());
        self.submit_actions.push(SubmitAction {
            time: row.time,
            student,
            submission,
        });
        self.students[student.0].submit_actions.push(idx);
        self.submissions[submission.0].submit_actions.push(idx);
    }

    fn finish(self) -> BuildOutcome {
        let outcome = BuildOutcome {
            tables: Tables::from_parts(
                self.course,
                self.groups,
                self.assignments,
                self.teachers,
                self.students,
                self.submissions,
                self.grade_actions,
                self.submit_actions,
            ),
            warnings: self.warnings,
        };

        let tables = &outcome.tables;
        info!(
            course = %tables.course(),
            groups = tables.groups().len(),
            students = tables.students().len(),
            teachers = tables.teachers().len(),
            assignments = tables.assignments().len(),
            grade_actions = tables.grade_actions().len(),
            submit_actions = tables.submit_actions().len(),
            "built course tables"
        );
        if !outcome.warnings.is_empty() {
            warn!(
                course = %tables.course(),
                dropped_log_rows = outcome.dropped_log_rows(),
                warnings = outcome.warnings.len(),
                "course tables built with unresolved references"
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RawBuilder, at};

    fn small_course() -> RawTables {
        RawBuilder::new()
            .assignment("a1", "Week 1")
            .assignment("a2", "Week 2")
            .group("A", &["30", "10"])
            .group("B", &["20"])
            .student("10", "Ann")
            .student("20", "Bob")
            .student("30", "Cid")
            .student("40", "Dan")
            .teacher("1", "Tia")
            .build()
    }

    #[test]
    fn classifies_students_and_teachers() {
        let tables = build_tables(CourseId::from("c"), &small_course());

        assert_eq!(tables.teachers().len(), 1);
        assert_eq!(tables.teachers()[0].person.id, PersonId::from("1"));
        assert_eq!(tables.students().len(), 4);

        let dan = tables.student_by_person(&PersonId::from("40")).unwrap();
        let group = tables.group(tables.student(dan).group);
        assert!(group.is_default);
        assert_eq!(group.name, DEFAULT_GROUP_NAME);
    }

    #[test]
    fn groups_without_members_are_skipped_and_sentinel_is_last() {
        let raw = RawBuilder::new()
            .group("Empty", &[])
            .group("A", &["10"])
            .student("10", "Ann")
            .build();
        let tables = build_tables(CourseId::from("c"), &raw);

        let names: Vec<&str> = tables.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["A", DEFAULT_GROUP_NAME]);
        assert_eq!(tables.default_group(), Some(GroupIdx(1)));
    }

    #[test]
    fn rows_follow_sorted_student_positions() {
        let tables = build_tables(CourseId::from("c"), &small_course());

        let ids: Vec<&str> = tables.students().iter().map(|s| s.person.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "20", "30", "40"]);

        let row_of = |group: &str| {
            let g = tables.group_by_name(group).unwrap();
            tables.submission(tables.group(g).submissions[0]).row
        };
        // Group A holds 10 and 30, so its first row is 10's position.
        assert_eq!(row_of("A"), Some(0));
        assert_eq!(row_of("B"), Some(1));
        assert_eq!(row_of(DEFAULT_GROUP_NAME), Some(3));
    }

    #[test]
    fn one_submission_per_group_and_assignment() {
        let tables = build_tables(CourseId::from("c"), &small_course());
        assert_eq!(tables.submissions().len(), 3 * 2);

        let mut pairs: Vec<_> = tables
            .submissions()
            .iter()
            .map(|s| (s.group, s.assignment))
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn empty_sentinel_has_no_row() {
        let raw = RawBuilder::new()
            .assignment("a1", "Week 1")
            .group("A", &["10"])
            .student("10", "Ann")
            .build();
        let tables = build_tables(CourseId::from("c"), &raw);
        let sentinel = tables.default_group().unwrap();
        let sub = tables.submission(tables.group(sentinel).submissions[0]);
        assert_eq!(sub.row, None);
    }

    #[test]
    fn first_group_wins_for_conflicting_membership() {
        let raw = RawBuilder::new()
            .group("A", &["10"])
            .group("B", &["10", "20"])
            .student("10", "Ann")
            .student("20", "Bob")
            .build();
        let outcome = EntityGraphBuilder::new(CourseId::from("c")).build(&raw);
        let tables = &outcome.tables;

        let ann = tables.student_by_person(&PersonId::from("10")).unwrap();
        assert_eq!(tables.group(tables.student(ann).group).name, "A");
        assert_eq!(
            outcome.warning_counts().get(&WarningKind::ConflictingMembership),
            Some(&1)
        );
    }

    #[test]
    fn group_members_are_students_even_off_roster() {
        let raw = RawBuilder::new()
            .group("A", &["10"])
            .person("10", "Ann")
            .build();
        let tables = build_tables(CourseId::from("c"), &raw);
        assert!(tables.student_by_person(&PersonId::from("10")).is_some());
        assert!(tables.teachers().is_empty());
    }

    #[test]
    fn log_rows_link_both_ends() {
        let raw = RawBuilder::new()
            .assignment("a1", "Week 1")
            .group("A", &["10", "30"])
            .student("10", "Ann")
            .student("30", "Cid")
            .teacher("1", "Tia")
            .submit(at(1), "30", "a1")
            .grade(at(2), "1", "a1", "10", "Approved")
            .build();
        let outcome = EntityGraphBuilder::new(CourseId::from("c")).build(&raw);
        let tables = &outcome.tables;
        assert!(outcome.warnings.is_empty());
        tables.validate().unwrap();

        let via_ann = tables
            .submission_of_student(&PersonId::from("10"), &AssignmentId::from("a1"))
            .unwrap();
        let via_cid = tables
            .submission_of_student(&PersonId::from("30"), &AssignmentId::from("a1"))
            .unwrap();
        assert_eq!(via_ann, via_cid);

        let sub = tables.submission(via_ann);
        assert_eq!(sub.grade_actions, vec![GradeActionIdx(0)]);
        assert_eq!(sub.submit_actions, vec![SubmitActionIdx(0)]);
        assert_eq!(tables.teachers()[0].grade_actions, vec![GradeActionIdx(0)]);

        let cid = tables.student_by_person(&PersonId::from("30")).unwrap();
        assert_eq!(tables.student(cid).submit_actions, vec![SubmitActionIdx(0)]);
    }

    #[test]
    fn unresolvable_rows_are_dropped_and_counted() {
        let raw = RawBuilder::new()
            .assignment("a1", "Week 1")
            .group("A", &["10"])
            .student("10", "Ann")
            .teacher("1", "Tia")
            .grade(at(1), "99", "a1", "10", "Approved")
            .grade(at(2), "1", "zz", "10", "Approved")
            .grade(at(3), "1", "a1", "77", "Approved")
            .grade(at(4), "1", "a1", "10", "8 points")
            .grade(at(5), "10", "a1", "10", "Approved")
            .submit(at(6), "1", "a1")
            .build();
        let outcome = EntityGraphBuilder::new(CourseId::from("c")).build(&raw);

        assert!(outcome.tables.grade_actions().is_empty());
        assert!(outcome.tables.submit_actions().is_empty());
        assert_eq!(outcome.dropped_log_rows(), 6);

        let counts = outcome.warning_counts();
        assert_eq!(counts.get(&WarningKind::UnknownTeacher), Some(&2));
        assert_eq!(counts.get(&WarningKind::UnknownAssignment), Some(&1));
        assert_eq!(counts.get(&WarningKind::UnknownStudent), Some(&2));
        assert_eq!(counts.get(&WarningKind::UnparsedGrade), Some(&1));
    }

    #[test]
    fn duplicates_keep_the_first_row() {
        let raw = RawBuilder::new()
            .assignment("a1", "Week 1")
            .assignment("a1", "Week 1 again")
            .group("A", &["10"])
            .group("A", &["20"])
            .student("10", "Ann")
            .student("20", "Bob")
            .person("10", "Ann twice")
            .build();
        let outcome = EntityGraphBuilder::new(CourseId::from("c")).build(&raw);
        let tables = &outcome.tables;

        assert_eq!(tables.assignments().len(), 1);
        assert_eq!(tables.assignments()[0].title, "Week 1");
        assert_eq!(tables.groups().len(), 2);
        assert_eq!(tables.students().len(), 2);
        assert_eq!(tables.students()[0].person.name, "Ann");

        let counts = outcome.warning_counts();
        assert_eq!(counts.get(&WarningKind::DuplicateAssignment), Some(&1));
        assert_eq!(counts.get(&WarningKind::DuplicateGroup), Some(&1));
        assert_eq!(counts.get(&WarningKind::DuplicatePerson), Some(&1));
    }

    #[test]
    fn unknown_members_are_reported() {
        let raw = RawBuilder::new()
            .group("A", &["10", "55"])
            .student("10", "Ann")
            .build();
        let outcome = EntityGraphBuilder::new(CourseId::from("c")).build(&raw);
        assert_eq!(
            outcome.warnings,
            vec![IntegrityWarning::UnknownMember {
                group: "A".into(),
                person: PersonId::from("55"),
            }]
        );
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let raw = small_course();
        let first = build_tables(CourseId::from("c"), &raw);
        let second = build_tables(CourseId::from("c"), &raw);
        assert_eq!(first.students(), second.students());
        assert_eq!(first.submissions(), second.submissions());
        assert_eq!(first.groups(), second.groups());
    }
}

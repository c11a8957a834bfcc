//! Rendering for each subcommand. Everything here works on a published graph
//! and returns text, so `main` only decides where it goes.

use anyhow::{Result, anyhow};
use tables::Tables;
use tables::queries::{assignment_overview, group_emails, latest_grader};
use tables::report::ResultsReport;
use tables::types::{AssignmentId, AssignmentIdx, GradeState, PersonId};

fn lookup(tables: &Tables, id: &str) -> Result<AssignmentIdx> {
    tables
        .assignment_by_id(&AssignmentId::from(id))
        .ok_or_else(|| anyhow!("unknown assignment {id} in course {}", tables.course()))
}

pub fn summary(tables: &Tables) -> String {
    format!(
        "Course {}: {} groups, {} students, {} teachers, {} assignments, {} log actions",
        tables.course(),
        tables.groups().len(),
        tables.students().len(),
        tables.teachers().len(),
        tables.assignments().len(),
        tables.grade_actions().len() + tables.submit_actions().len(),
    )
}

pub fn results(tables: &Tables, assignments: &[String]) -> Result<ResultsReport> {
    let selected = assignments
        .iter()
        .map(|id| lookup(tables, id))
        .collect::<Result<Vec<_>>>()?;
    Ok(ResultsReport::build(tables, &selected))
}

pub fn assignments(tables: &Tables) -> String {
    tables
        .assignments()
        .iter()
        .enumerate()
        .map(|(i, assignment)| {
            let overview = assignment_overview(tables, AssignmentIdx(i));
            let approved = overview.get(&GradeState::Approved).map_or(0, Vec::len);
            format!(
                "{}\t{}\t{approved}/{} approved\n",
                assignment.id,
                assignment.title,
                assignment.submissions.len()
            )
        })
        .collect()
}

pub fn emails(tables: &Tables) -> String {
    tables
        .group_indices()
        .filter_map(|g| {
            let emails = group_emails(tables, g);
            if emails.is_empty() {
                return None;
            }
            Some(format!("{}:\t{}\n", tables.group(g).name, emails.join("; ")))
        })
        .collect()
}

pub fn status(tables: &Tables, assignment: &str) -> Result<String> {
    let idx = lookup(tables, assignment)?;
    let text = assignment_overview(tables, idx)
        .into_iter()
        .map(|(state, groups)| {
            let names: Vec<&str> = groups
                .iter()
                .map(|&g| tables.group(g).name.as_str())
                .collect();
            format!("{state} ({}):\t{}\n", names.len(), names.join(", "))
        })
        .collect();
    Ok(text)
}

pub fn grader(tables: &Tables, students: &[String]) -> String {
    let ids: Vec<PersonId> = students.iter().map(|s| PersonId::from(s.as_str())).collect();
    match latest_grader(tables, &ids) {
        Some(idx) => {
            let action = tables.grade_action(idx);
            let teacher = &tables.teacher(action.teacher).person;
            let submission = tables.submission(action.submission);
            format!(
                "{} <{}> graded {} for {} at {}",
                teacher.name,
                teacher.email,
                tables.assignment(submission.assignment).id,
                tables.group(submission.group).name,
                action.time.format("%Y-%m-%d %H:%M"),
            )
        }
        None => "No grading found for these students".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tables::build_tables;
    use tables::test_utils::{RawBuilder, at};
    use tables::types::CourseId;

    fn tables() -> Tables {
        let raw = RawBuilder::new()
            .assignment("a1", "Week 1")
            .assignment("a2", "Week 2")
            .group("A", &["10", "11"])
            .group("B", &["20"])
            .student("10", "Ann")
            .student("11", "Abe")
            .student("20", "Bob")
            .teacher("1", "Tia")
            .submit(at(1), "10", "a1")
            .grade(at(2), "1", "a1", "11", "Approved")
            .submit(at(3), "20", "a1")
            .build();
        build_tables(CourseId::from("c"), &raw)
    }

    #[test]
    fn unknown_assignment_is_an_error() {
        let tables = tables();
        assert!(results(&tables, &["zz".to_string()]).is_err());
        assert!(status(&tables, "zz").is_err());
    }

    #[test]
    fn status_lists_groups_per_state() {
        let text = status(&tables(), "a1").unwrap();
        assert!(text.contains("Pending (1):\tB\n"));
        assert!(text.contains("Approved (1):\tA\n"));
    }

    #[test]
    fn assignments_show_approval_ratio() {
        let text = assignments(&tables());
        assert!(text.starts_with("a1\tWeek 1\t1/3 approved\n"));
        assert!(text.contains("a2\tWeek 2\t0/3 approved\n"));
    }

    #[test]
    fn emails_skip_empty_groups() {
        let text = emails(&tables());
        assert_eq!(text, "A:\t10@example.org; 11@example.org\nB:\t20@example.org\n");
    }

    #[test]
    fn grader_names_the_teacher() {
        let tables = tables();
        let line = grader(&tables, &["10".to_string()]);
        assert_eq!(line, "Tia <1@example.org> graded a1 for A at 2016-09-01 08:02");
        assert_eq!(
            grader(&tables, &["20".to_string()]),
            "No grading found for these students"
        );
    }
}

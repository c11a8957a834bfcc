//! # Results Report
//!
//! Course-wide overview used by staff to see how far every group has come:
//! groups are bucketed by how many of the selected assignments are approved,
//! and each group lists its members' emails and what is still outstanding.
//!
//! ## Text Output Example
//!
//! ```text
//! 1 Approves:
//! A:	ann@example.org; abe@example.org (1 not approved, 1 not submitted)
//!
//! 2 Approves:
//! B:	bob@example.org
//! ```
//!
//! The same data serialises to JSON for scripting.

use crate::model::Tables;
use crate::queries::{StatusBreakdown, approval_count, group_emails, status_breakdown};
use crate::types::AssignmentIdx;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Label used for a group whose upstream name is empty.
pub const UNNAMED_GROUP_LABEL: &str = "Default Group";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupResult {
    pub name: String,
    pub emails: Vec<String>,
    pub breakdown: StatusBreakdown,
}

impl GroupResult {
    /// "(1 pending, 2 not approved, 3 not submitted)", zero counts omitted.
    pub fn tags(&self) -> String {
        let tags: Vec<String> = [
            (self.breakdown.pending, "pending"),
            (self.breakdown.not_approved, "not approved"),
            (self.breakdown.no_submission, "not submitted"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();

        if tags.is_empty() {
            String::new()
        } else {
            format!("({})", tags.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultsReport {
    /// Approval count to the groups that reached exactly that many.
    pub buckets: BTreeMap<usize, Vec<GroupResult>>,
}

impl ResultsReport {
    /// Build the report over `assignments`, or over every assignment when
    /// the slice is empty.
    pub fn build(tables: &Tables, assignments: &[AssignmentIdx]) -> Self {
        let selected: Vec<AssignmentIdx> = if assignments.is_empty() {
            (0..tables.assignments().len()).map(AssignmentIdx).collect()
        } else {
            assignments.to_vec()
        };

        let mut report = ResultsReport::default();
        for group in tables.group_indices() {
            let name = &tables.group(group).name;
            let result = GroupResult {
                name: if name.is_empty() {
                    UNNAMED_GROUP_LABEL.to_string()
                } else {
                    name.clone()
                },
                emails: group_emails(tables, group)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                breakdown: status_breakdown(tables, group, &selected),
            };
            report
                .buckets
                .entry(approval_count(tables, group, &selected))
                .or_default()
                .push(result);
        }
        report
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupResult> {
        self.buckets.values().flatten()
    }
}

impl fmt::Display for ResultsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (approved, groups) in &self.buckets {
            writeln!(f, "{approved} Approves:")?;
            for group in groups {
                write!(f, "{}:\t{}", group.name, group.emails.join("; "))?;
                let tags = group.tags();
                if !tags.is_empty() {
                    write!(f, " {tags}")?;
                }
                writeln!(f)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

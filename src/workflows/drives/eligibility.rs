//! Static eligibility matching between student profiles and drive criteria.
//!
//! Both functions are pure: callers translate a `false` result into domain
//! errors, and the registry is responsible for diffing the materialized
//! `eligible_drives` view against the stored one before writing.

use std::collections::BTreeSet;

use super::domain::{Drive, DriveCriteria, DriveId, Student};

/// Whether a student's profile passes a drive's static criteria.
///
/// Branch matching is case-insensitive. Missing numeric fields on the
/// student count as 0, so an incomplete profile can pass the backlog and
/// semester comparisons; that is defined behavior, not an error.
pub fn is_eligible(student: &Student, criteria: &DriveCriteria) -> bool {
    let branch = student.branch.trim();
    let branch_match = criteria
        .eligible_branches
        .iter()
        .any(|eligible| eligible.trim().eq_ignore_ascii_case(branch));

    branch_match
        && student.cgpa.unwrap_or(0.0) >= criteria.min_cgpa
        && student.backlogs <= criteria.max_backlogs
        && student.semesters_completed >= criteria.min_semesters_completed
}

/// The full materialized view for one student: every drive the evaluator
/// currently returns true for.
pub fn eligible_drive_ids(student: &Student, drives: &[Drive]) -> BTreeSet<DriveId> {
    drives
        .iter()
        .filter(|drive| is_eligible(student, &drive.criteria))
        .map(|drive| drive.id.clone())
        .collect()
}

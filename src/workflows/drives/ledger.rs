//! Application ledger rules: what may be recorded against a drive and how
//! standing records change outside the phase pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Application, ApplicationStatus, Drive, DriveStatus, Student, StudentId};
use super::eligibility;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("cannot apply to a completed drive")]
    DriveCompleted,
    #[error("student is not eligible for this drive")]
    NotEligible,
    #[error("student has already applied to this drive")]
    AlreadyApplied,
    #[error("application not found")]
    ApplicationNotFound,
}

/// Validate the Apply preconditions against the current drive state.
///
/// The duplicate check here gives callers a clean error up front; the
/// repository repeats it inside its own critical section, which is the
/// check that actually guarantees uniqueness under concurrent applies.
pub fn apply_preconditions(drive: &Drive, student: &Student) -> Result<(), LedgerError> {
    if drive.status == DriveStatus::Completed {
        return Err(LedgerError::DriveCompleted);
    }
    if !eligibility::is_eligible(student, &drive.criteria) {
        return Err(LedgerError::NotEligible);
    }
    if drive.application(&student.id).is_some() {
        return Err(LedgerError::AlreadyApplied);
    }
    Ok(())
}

/// Coordinator-triggered manual override of one application's status.
///
/// This path is independent of the phase pipeline and can desynchronize
/// status from shortlist membership; pipeline-driven transitions are the
/// preferred route.
pub fn update_status(
    drive: &mut Drive,
    student: &StudentId,
    status: ApplicationStatus,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    let application = drive
        .application_mut(student)
        .ok_or(LedgerError::ApplicationNotFound)?;
    application.status = status;
    application.updated_at = now;
    drive.updated_at = now;
    Ok(())
}

/// Read-only projection of one application with student display fields.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub registration_number: String,
    pub branch: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationView {
    pub fn project(application: &Application, student: &Student) -> Self {
        Self {
            student_id: student.id.clone(),
            name: student.name.clone(),
            email: student.email.clone(),
            registration_number: student.registration_number.clone(),
            branch: student.branch.clone(),
            status: application.status,
            applied_at: application.applied_at,
            updated_at: application.updated_at,
        }
    }
}

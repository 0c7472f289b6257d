use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use super::domain::{
    Application, ApplicationStatus, Drive, DriveId, DriveStatus, NewDrive, Phase, PhaseName,
    Student, StudentId,
};
use super::eligibility;
use super::ledger::{self, ApplicationView, LedgerError};
use super::notify::{Notification, NotificationDispatcher, Severity};
use super::pipeline::{self, PhaseTransition, ReconciliationOutcome};
use super::repository::{DriveRepository, RepositoryError};
use super::roster::{
    self, DirectoryError, ImportOutcome, NewStudent, ProfileUpdate, RegistrationError,
    StudentDirectory,
};
use super::shortlist::ShortlistError;

/// Service composing the drive store, student directory, and notification
/// dispatcher. Every mutating drive operation runs under an in-process
/// lock keyed by drive id so concurrent read-modify-writes of one drive's
/// applications/phases cannot interleave.
pub struct PlacementDriveService<R, D, N> {
    drives: Arc<R>,
    directory: Arc<D>,
    notifier: Arc<N>,
    dashboard_link: String,
    locks: Mutex<HashMap<DriveId, Arc<Mutex<()>>>>,
}

static DRIVE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_drive_id() -> DriveId {
    let id = DRIVE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DriveId(format!("drive-{id:06}"))
}

/// Error raised by the placement drive service.
#[derive(Debug, thiserror::Error)]
pub enum DriveServiceError {
    #[error("placement drive not found")]
    DriveNotFound,
    #[error("student not found")]
    StudentNotFound,
    #[error("application not found")]
    ApplicationNotFound,
    #[error("cannot modify a completed drive")]
    DriveCompleted,
    #[error("student is not eligible for this placement drive")]
    NotEligible,
    #[error("student has already applied to this placement drive")]
    AlreadyApplied,
    #[error("shortlist file required for this operation")]
    MissingShortlist,
    #[error("invalid phase name: {0}")]
    InvalidPhaseName(String),
    #[error("invalid application status: {0}")]
    InvalidStatus(String),
    #[error("emails not registered as students: {}", .0.join(", "))]
    UnresolvedEmails(Vec<String>),
    #[error(transparent)]
    Shortlist(#[from] ShortlistError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<LedgerError> for DriveServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::DriveCompleted => Self::DriveCompleted,
            LedgerError::NotEligible => Self::NotEligible,
            LedgerError::AlreadyApplied => Self::AlreadyApplied,
            LedgerError::ApplicationNotFound => Self::ApplicationNotFound,
        }
    }
}

/// Drive plus the size of the freshly notified eligible population.
#[derive(Debug, Clone, Serialize)]
pub struct DriveCreated {
    pub drive: Drive,
    pub eligible_count: usize,
}

/// Current-phase summary attached to drive views.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub name: PhaseName,
    pub requirements: String,
    pub instructions: String,
    pub created_at: chrono::DateTime<Utc>,
    pub shortlist_size: usize,
}

impl PhaseSummary {
    fn from_phase(phase: &Phase) -> Self {
        Self {
            name: phase.name,
            requirements: phase.requirements.clone(),
            instructions: phase.instructions.clone(),
            created_at: phase.created_at,
            shortlist_size: phase.shortlisted.len(),
        }
    }
}

/// A student caller's standing in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseStanding {
    Shortlisted,
    Rejected,
}

/// Read model returned by drive lookups.
#[derive(Debug, Clone, Serialize)]
pub struct DriveView {
    pub drive: Drive,
    pub current_phase: Option<PhaseSummary>,
    pub student_phase_status: Option<PhaseStanding>,
}

/// Coordinator request to append an elimination phase.
#[derive(Debug, Clone)]
pub struct AddPhaseRequest {
    pub name: PhaseName,
    pub requirements: String,
    pub instructions: String,
    /// Parsed shortlist emails; optional only for the very first phase.
    pub shortlist_emails: Option<Vec<String>>,
}

/// Coordinator request to end a drive with the final shortlist.
#[derive(Debug, Clone)]
pub struct EndDriveRequest {
    pub requirements: String,
    pub instructions: String,
    pub shortlist_emails: Vec<String>,
}

impl<R, D, N> PlacementDriveService<R, D, N>
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(drives: Arc<R>, directory: Arc<D>, notifier: Arc<N>, dashboard_link: String) -> Self {
        Self {
            drives,
            directory,
            notifier,
            dashboard_link,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn drive_lock(&self, id: &DriveId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("drive lock registry poisoned");
        locks.entry(id.clone()).or_default().clone()
    }

    fn fetch_drive(&self, id: &DriveId) -> Result<Drive, DriveServiceError> {
        self.drives
            .fetch(id)?
            .ok_or(DriveServiceError::DriveNotFound)
    }

    fn fetch_student(&self, id: &StudentId) -> Result<Student, DriveServiceError> {
        self.directory
            .fetch(id)?
            .ok_or(DriveServiceError::StudentNotFound)
    }

    /// Create a drive, scan the eligible population, refresh each eligible
    /// student's materialized view, and announce the opportunity.
    pub fn create_drive(&self, request: NewDrive) -> Result<DriveCreated, DriveServiceError> {
        let now = Utc::now();
        let drive = Drive::new(next_drive_id(), request, now);
        let drive = self.drives.insert(drive)?;

        let mut eligible_count = 0;
        for student in self.directory.list()? {
            if !eligibility::is_eligible(&student, &drive.criteria) {
                continue;
            }
            eligible_count += 1;

            let mut eligible = student.eligible_drives.clone();
            if eligible.insert(drive.id.clone()) {
                self.directory
                    .replace_eligible_drives(&student.id, eligible)?;
            }

            self.notify(
                &student.id,
                format!(
                    "New placement drive: {} - {}",
                    drive.company_name, drive.role
                ),
                Severity::Info,
                &drive.id,
            );
        }

        Ok(DriveCreated {
            drive,
            eligible_count,
        })
    }

    /// All drives, newest first.
    pub fn list_drives(&self) -> Result<Vec<Drive>, DriveServiceError> {
        Ok(self.drives.list()?)
    }

    /// Drive view with the current phase summarized and, for student
    /// callers, their standing in it.
    pub fn get_drive(
        &self,
        id: &DriveId,
        caller: Option<&StudentId>,
    ) -> Result<DriveView, DriveServiceError> {
        let drive = self.fetch_drive(id)?;
        let current_phase = drive.current_phase().map(PhaseSummary::from_phase);

        let student_phase_status = match (caller, drive.current_phase()) {
            (Some(student), Some(phase)) => Some(if phase.shortlisted.contains(student) {
                PhaseStanding::Shortlisted
            } else {
                PhaseStanding::Rejected
            }),
            _ => None,
        };

        Ok(DriveView {
            drive,
            current_phase,
            student_phase_status,
        })
    }

    /// Record one application for (drive, student).
    pub fn apply(
        &self,
        drive_id: &DriveId,
        student_id: &StudentId,
    ) -> Result<Application, DriveServiceError> {
        let lock = self.drive_lock(drive_id);
        let _guard: MutexGuard<'_, ()> = lock.lock().expect("drive mutex poisoned");

        let drive = self.fetch_drive(drive_id)?;
        let student = self.fetch_student(student_id)?;
        ledger::apply_preconditions(&drive, &student)?;

        let application = Application::new(student.id.clone(), Utc::now());
        // The store repeats the duplicate check atomically; a conflict here
        // means another apply for the same pair won the race.
        self.drives
            .insert_application(drive_id, application.clone())
            .map_err(|err| match err {
                RepositoryError::Conflict => DriveServiceError::AlreadyApplied,
                other => DriveServiceError::from(other),
            })?;

        let mut eligible = student.eligible_drives.clone();
        if eligible.insert(drive_id.clone()) {
            self.directory
                .replace_eligible_drives(&student.id, eligible)?;
        }

        self.notify(
            student_id,
            format!(
                "Application successful for {} - {}",
                drive.company_name, drive.role
            ),
            Severity::Success,
            drive_id,
        );

        Ok(application)
    }

    /// Coordinator override of one application's status.
    pub fn update_status(
        &self,
        drive_id: &DriveId,
        student_id: &StudentId,
        status: ApplicationStatus,
    ) -> Result<Drive, DriveServiceError> {
        let lock = self.drive_lock(drive_id);
        let _guard = lock.lock().expect("drive mutex poisoned");

        let mut drive = self.fetch_drive(drive_id)?;
        ledger::update_status(&mut drive, student_id, status, Utc::now())?;
        self.drives.update(drive.clone())?;

        let severity = if status == ApplicationStatus::Selected {
            Severity::Success
        } else {
            Severity::Info
        };
        self.notify(
            student_id,
            format!(
                "Application status updated to \"{}\" for {} - {}",
                status.label(),
                drive.company_name,
                drive.role
            ),
            severity,
            drive_id,
        );

        Ok(drive)
    }

    /// Ledger projection with student display fields attached.
    pub fn applications(
        &self,
        drive_id: &DriveId,
    ) -> Result<Vec<ApplicationView>, DriveServiceError> {
        let drive = self.fetch_drive(drive_id)?;
        let mut views = Vec::with_capacity(drive.applications.len());
        for application in &drive.applications {
            match self.directory.fetch(&application.student)? {
                Some(student) => views.push(ApplicationView::project(application, &student)),
                None => warn!(student = %application.student.0, "applicant missing from directory"),
            }
        }
        Ok(views)
    }

    /// Append an elimination phase and reconcile the ledger incrementally.
    pub fn add_phase(
        &self,
        drive_id: &DriveId,
        request: AddPhaseRequest,
    ) -> Result<(Drive, ReconciliationOutcome), DriveServiceError> {
        let lock = self.drive_lock(drive_id);
        let _guard = lock.lock().expect("drive mutex poisoned");

        let mut drive = self.fetch_drive(drive_id)?;
        if drive.status == DriveStatus::Completed {
            return Err(DriveServiceError::DriveCompleted);
        }

        // First phase: absent shortlist means the whole applicant pool
        // auto-advances; a supplied one is intersected with the pool.
        // Every later phase requires a shortlist, resolved all-or-nothing.
        let shortlist = if drive.phases.is_empty() {
            match request.shortlist_emails {
                None => drive.applicant_pool(),
                Some(emails) => {
                    let resolved = self.resolve_shortlist(&emails)?;
                    let pool = drive.applicant_pool();
                    resolved.intersection(&pool).cloned().collect()
                }
            }
        } else {
            let emails = request
                .shortlist_emails
                .ok_or(DriveServiceError::MissingShortlist)?;
            self.resolve_shortlist(&emails)?
        };

        let outcome = pipeline::apply_transition(
            &mut drive,
            PhaseTransition::Advance {
                name: request.name,
                shortlist,
            },
            request.requirements,
            request.instructions,
            Utc::now(),
        );
        self.drives.update(drive.clone())?;

        self.fan_out_phase_results(&drive, request.name, &outcome);
        Ok((drive, outcome))
    }

    /// Terminal operation: reconcile the full applicant pool against the
    /// final shortlist and complete the drive.
    pub fn end_drive(
        &self,
        drive_id: &DriveId,
        request: EndDriveRequest,
    ) -> Result<(Drive, ReconciliationOutcome), DriveServiceError> {
        let lock = self.drive_lock(drive_id);
        let _guard = lock.lock().expect("drive mutex poisoned");

        let mut drive = self.fetch_drive(drive_id)?;
        if drive.status == DriveStatus::Completed {
            return Err(DriveServiceError::DriveCompleted);
        }

        let shortlist = self.resolve_shortlist(&request.shortlist_emails)?;
        let outcome = pipeline::apply_transition(
            &mut drive,
            PhaseTransition::Finalize { shortlist },
            request.requirements,
            request.instructions,
            Utc::now(),
        );
        self.drives.update(drive.clone())?;

        for student in &outcome.selected {
            self.notify(
                student,
                format!(
                    "Congratulations! Selected for {} ({})",
                    drive.company_name, drive.role
                ),
                Severity::Success,
                drive_id,
            );
        }
        for student in &outcome.rejected {
            self.notify(
                student,
                format!("Not selected for {} ({})", drive.company_name, drive.role),
                Severity::Error,
                drive_id,
            );
        }

        Ok((drive, outcome))
    }

    /// Apply a profile update and reconcile the student's materialized
    /// eligible-drives view, writing only when the computed set differs.
    pub fn update_student_profile(
        &self,
        student_id: &StudentId,
        update: ProfileUpdate,
    ) -> Result<Student, DriveServiceError> {
        let mut student = self.directory.update_profile(student_id, update)?;

        let drives = self.drives.list()?;
        let computed = eligibility::eligible_drive_ids(&student, &drives);
        if computed != student.eligible_drives {
            self.directory
                .replace_eligible_drives(student_id, computed.clone())?;
            student.eligible_drives = computed;
        }

        Ok(student)
    }

    /// Register one student through the directory.
    pub fn register_student(&self, student: NewStudent) -> Result<Student, RegistrationError> {
        roster::register_student(self.directory.as_ref(), student)
    }

    /// Bulk roster import; aggregates per-row success/failure rather than
    /// aborting the batch.
    pub fn import_roster(
        &self,
        reader: impl std::io::Read,
    ) -> Result<ImportOutcome, DriveServiceError> {
        roster::import_roster(reader, self.directory.as_ref())
            .map_err(|err| DriveServiceError::Shortlist(ShortlistError::Csv(err)))
    }

    /// Resolve shortlist emails to registered students; any miss aborts the
    /// whole operation with the offending emails enumerated.
    fn resolve_shortlist(
        &self,
        emails: &[String],
    ) -> Result<BTreeSet<StudentId>, DriveServiceError> {
        let mut resolved = BTreeSet::new();
        let mut unresolved = Vec::new();
        for email in emails {
            match self.directory.find_by_email(email)? {
                Some(student) => {
                    resolved.insert(student.id);
                }
                None => unresolved.push(email.clone()),
            }
        }
        if !unresolved.is_empty() {
            return Err(DriveServiceError::UnresolvedEmails(unresolved));
        }
        Ok(resolved)
    }

    fn fan_out_phase_results(
        &self,
        drive: &Drive,
        phase: PhaseName,
        outcome: &ReconciliationOutcome,
    ) {
        for student in &outcome.selected {
            self.notify(
                student,
                format!(
                    "Shortlisted for {} - {} ({})",
                    phase.label(),
                    drive.company_name,
                    drive.role
                ),
                Severity::Success,
                &drive.id,
            );
        }
        for student in &outcome.rejected {
            self.notify(
                student,
                format!(
                    "Not shortlisted for {} - {} ({})",
                    phase.label(),
                    drive.company_name,
                    drive.role
                ),
                Severity::Error,
                &drive.id,
            );
        }
    }

    /// Fire-and-forget: the state transition has already committed, so a
    /// dispatch failure is logged and swallowed.
    fn notify(&self, student: &StudentId, message: String, severity: Severity, drive: &DriveId) {
        let notice = Notification {
            student: student.clone(),
            message,
            severity,
            link: self.dashboard_link.clone(),
            related_drive: drive.clone(),
        };
        if let Err(err) = self.notifier.dispatch(notice) {
            warn!(student = %student.0, drive = %drive.0, error = %err, "notification dispatch failed");
        }
    }
}

//! The phase state machine: appending a pipeline stage and reconciling its
//! shortlist into application status changes.
//!
//! Reconciliation is phase-kind dependent, so each kind is a tagged variant
//! with its own handler. `Advance` narrows incrementally against the
//! previous phase's shortlist; `Finalize` reconciles the full applicant
//! pool. The two algorithms are deliberately separate passes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::domain::{ApplicationStatus, Drive, DriveStatus, Phase, PhaseName, StudentId};

/// How the next phase's shortlist is reconciled against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseTransition {
    /// An intermediate elimination round. Shortlisted applicants become
    /// `Selected`; applicants shortlisted in the immediately preceding
    /// phase but dropped here become `Rejected`; everyone else keeps their
    /// current status.
    Advance {
        name: PhaseName,
        shortlist: BTreeSet<StudentId>,
    },
    /// The terminal round. Every applicant in the drive is reconciled:
    /// `Selected` if present in the final shortlist, `Rejected` otherwise.
    Finalize { shortlist: BTreeSet<StudentId> },
}

impl PhaseTransition {
    pub fn shortlist(&self) -> &BTreeSet<StudentId> {
        match self {
            Self::Advance { shortlist, .. } | Self::Finalize { shortlist } => shortlist,
        }
    }

    fn phase_name(&self) -> PhaseName {
        match self {
            Self::Advance { name, .. } => *name,
            Self::Finalize { .. } => PhaseName::FinalSelection,
        }
    }
}

/// Status changes produced by one transition, for notification fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub selected: BTreeSet<StudentId>,
    pub rejected: BTreeSet<StudentId>,
}

/// Reconcile the ledger, append the phase, and advance the drive status.
///
/// Must run inside the caller's per-drive critical section; the drive is
/// mutated in place and committed by the caller as a whole.
pub fn apply_transition(
    drive: &mut Drive,
    transition: PhaseTransition,
    requirements: String,
    instructions: String,
    now: DateTime<Utc>,
) -> ReconciliationOutcome {
    let outcome = match &transition {
        PhaseTransition::Advance { shortlist, .. } => advance_ledger(drive, shortlist, now),
        PhaseTransition::Finalize { shortlist } => finalize_ledger(drive, shortlist, now),
    };

    let name = transition.phase_name();
    let shortlist = match transition {
        PhaseTransition::Advance { shortlist, .. } => shortlist,
        PhaseTransition::Finalize { shortlist } => shortlist,
    };

    drive.phases.push(Phase {
        name,
        shortlisted: shortlist,
        requirements,
        instructions,
        created_at: now,
    });
    drive.status = if name.is_final() {
        DriveStatus::Completed
    } else {
        DriveStatus::InProgress
    };
    drive.updated_at = now;

    outcome
}

/// Delta reconciliation against the immediately preceding phase.
fn advance_ledger(
    drive: &mut Drive,
    shortlist: &BTreeSet<StudentId>,
    now: DateTime<Utc>,
) -> ReconciliationOutcome {
    let previous: BTreeSet<StudentId> = drive
        .current_phase()
        .map(|phase| phase.shortlisted.clone())
        .unwrap_or_default();

    let mut outcome = ReconciliationOutcome::default();
    for application in &mut drive.applications {
        if shortlist.contains(&application.student) {
            application.status = ApplicationStatus::Selected;
            application.updated_at = now;
            outcome.selected.insert(application.student.clone());
        } else if previous.contains(&application.student) {
            application.status = ApplicationStatus::Rejected;
            application.updated_at = now;
            outcome.rejected.insert(application.student.clone());
        }
    }
    outcome
}

/// Full-pool reconciliation: the whole applications list, not just the
/// previous shortlist, is settled one way or the other.
fn finalize_ledger(
    drive: &mut Drive,
    shortlist: &BTreeSet<StudentId>,
    now: DateTime<Utc>,
) -> ReconciliationOutcome {
    let mut outcome = ReconciliationOutcome::default();
    for application in &mut drive.applications {
        if shortlist.contains(&application.student) {
            application.status = ApplicationStatus::Selected;
            outcome.selected.insert(application.student.clone());
        } else {
            application.status = ApplicationStatus::Rejected;
            outcome.rejected.insert(application.student.clone());
        }
        application.updated_at = now;
    }
    outcome
}

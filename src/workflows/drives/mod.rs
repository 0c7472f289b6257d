//! Placement drive lifecycle: eligibility matching, the application
//! ledger, and the phase pipeline that advances a drive through ordered
//! elimination rounds.

pub mod domain;
pub mod eligibility;
pub mod ledger;
pub mod notify;
pub mod pipeline;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod shortlist;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationStatus, Drive, DriveCriteria, DriveId, DriveStatus, NewDrive, Phase,
    PhaseName, Student, StudentId,
};
pub use ledger::ApplicationView;
pub use notify::{ChannelDispatcher, DispatchError, Notification, NotificationDispatcher, Severity};
pub use pipeline::{PhaseTransition, ReconciliationOutcome};
pub use repository::{DriveRepository, MemoryDriveStore, RepositoryError};
pub use roster::{
    DirectoryError, ImportOutcome, MemoryStudentDirectory, NewStudent, ProfileUpdate,
    RegistrationError, StudentDirectory,
};
pub use router::drive_router;
pub use service::{
    AddPhaseRequest, DriveCreated, DriveServiceError, DriveView, EndDriveRequest, PhaseStanding,
    PhaseSummary, PlacementDriveService,
};
pub use shortlist::ShortlistError;

use super::common::*;
use crate::workflows::drives::domain::{ApplicationStatus, DriveStatus, PhaseName};
use crate::workflows::drives::notify::Severity;
use crate::workflows::drives::repository::DriveRepository;
use crate::workflows::drives::roster::{MemoryStudentDirectory, ProfileUpdate, StudentDirectory};
use crate::workflows::drives::service::{
    AddPhaseRequest, DriveServiceError, EndDriveRequest, PlacementDriveService,
};
use crate::workflows::drives::repository::MemoryDriveStore;
use std::sync::Arc;

fn phase_request(name: PhaseName, emails: Option<&[&str]>) -> AddPhaseRequest {
    AddPhaseRequest {
        name,
        requirements: String::new(),
        instructions: String::new(),
        shortlist_emails: emails.map(|list| list.iter().map(|e| (*e).to_string()).collect()),
    }
}

fn end_request(emails: &[&str]) -> EndDriveRequest {
    EndDriveRequest {
        requirements: String::new(),
        instructions: String::new(),
        shortlist_emails: emails.iter().map(|e| (*e).to_string()).collect(),
    }
}

#[test]
fn create_drive_refreshes_views_and_announces_to_eligible_students() {
    let (service, _, directory, notifier) = build_service();
    let eligible = seed(&directory, student("a", "CSE", Some(8.0)));
    let ineligible = seed(&directory, student("b", "MECH", Some(9.5)));

    let created = service.create_drive(new_drive()).expect("drive created");
    assert_eq!(created.eligible_count, 1);
    assert_eq!(created.drive.status, DriveStatus::Open);

    let refreshed = directory
        .fetch(&eligible.id)
        .expect("fetch succeeds")
        .expect("student present");
    assert!(refreshed.eligible_drives.contains(&created.drive.id));

    let untouched = directory
        .fetch(&ineligible.id)
        .expect("fetch succeeds")
        .expect("student present");
    assert!(untouched.eligible_drives.is_empty());

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].student, eligible.id);
    assert_eq!(notices[0].severity, Severity::Info);
    assert!(notices[0].message.contains("Vertex Systems"));
}

#[test]
fn apply_records_one_application_per_student() {
    let (service, drives, directory, _) = build_service();
    let applicant = seed(&directory, student("a", "CSE", Some(8.0)));
    let created = service.create_drive(new_drive()).expect("drive created");

    let application = service
        .apply(&created.drive.id, &applicant.id)
        .expect("apply succeeds");
    assert_eq!(application.status, ApplicationStatus::Applied);

    match service.apply(&created.drive.id, &applicant.id) {
        Err(DriveServiceError::AlreadyApplied) => {}
        other => panic!("expected duplicate apply rejection, got {other:?}"),
    }

    let stored = drives
        .fetch(&created.drive.id)
        .expect("fetch succeeds")
        .expect("drive present");
    assert_eq!(stored.applications.len(), 1);
}

#[test]
fn apply_rejects_ineligible_students() {
    let (service, _, directory, _) = build_service();
    let outsider = seed(&directory, student("a", "MECH", Some(9.0)));
    let created = service.create_drive(new_drive()).expect("drive created");

    match service.apply(&created.drive.id, &outsider.id) {
        Err(DriveServiceError::NotEligible) => {}
        other => panic!("expected eligibility rejection, got {other:?}"),
    }
}

#[test]
fn first_phase_without_shortlist_advances_the_whole_pool() {
    let (service, _, directory, _) = build_service();
    let first = seed(&directory, student("a", "CSE", Some(8.0)));
    let second = seed(&directory, student("b", "ECE", Some(7.9)));
    let created = service.create_drive(new_drive()).expect("drive created");
    service.apply(&created.drive.id, &first.id).expect("apply");
    service.apply(&created.drive.id, &second.id).expect("apply");

    let (drive, outcome) = service
        .add_phase(
            &created.drive.id,
            phase_request(PhaseName::ResumeScreening, None),
        )
        .expect("phase added");

    assert_eq!(outcome.selected.len(), 2);
    assert!(outcome.rejected.is_empty());
    assert_eq!(drive.status, DriveStatus::InProgress);
    let phase = drive.current_phase().expect("phase present");
    assert_eq!(phase.shortlisted.len(), 2);
}

#[test]
fn later_phases_require_a_shortlist() {
    let (service, _, directory, _) = build_service();
    let applicant = seed(&directory, student("a", "CSE", Some(8.0)));
    let created = service.create_drive(new_drive()).expect("drive created");
    service
        .apply(&created.drive.id, &applicant.id)
        .expect("apply");
    service
        .add_phase(
            &created.drive.id,
            phase_request(PhaseName::ResumeScreening, None),
        )
        .expect("first phase");

    match service.add_phase(
        &created.drive.id,
        phase_request(PhaseName::WrittenTest, None),
    ) {
        Err(DriveServiceError::MissingShortlist) => {}
        other => panic!("expected missing shortlist error, got {other:?}"),
    }
}

#[test]
fn unresolved_shortlist_emails_abort_without_mutating_the_drive() {
    let (service, drives, directory, _) = build_service();
    let applicant = seed(&directory, student("a", "CSE", Some(8.0)));
    let created = service.create_drive(new_drive()).expect("drive created");
    service
        .apply(&created.drive.id, &applicant.id)
        .expect("apply");

    let request = phase_request(
        PhaseName::ResumeScreening,
        Some(&["a@campus.edu", "ghost@campus.edu"]),
    );
    match service.add_phase(&created.drive.id, request) {
        Err(DriveServiceError::UnresolvedEmails(emails)) => {
            assert_eq!(emails, vec!["ghost@campus.edu".to_string()]);
        }
        other => panic!("expected unresolved email error, got {other:?}"),
    }

    let stored = drives
        .fetch(&created.drive.id)
        .expect("fetch succeeds")
        .expect("drive present");
    assert!(stored.phases.is_empty());
    assert_eq!(stored.status, DriveStatus::Open);
    assert_eq!(stored.applications[0].status, ApplicationStatus::Applied);
}

#[test]
fn end_drive_settles_the_full_pool_and_notifies_everyone() {
    let (service, _, directory, notifier) = build_service();
    let winner = seed(&directory, student("a", "CSE", Some(8.0)));
    let runner_up = seed(&directory, student("b", "ECE", Some(7.8)));
    let third = seed(&directory, student("c", "CSE", Some(7.6)));
    let created = service.create_drive(new_drive()).expect("drive created");
    for applicant in [&winner, &runner_up, &third] {
        service
            .apply(&created.drive.id, &applicant.id)
            .expect("apply");
    }

    let (drive, outcome) = service
        .end_drive(&created.drive.id, end_request(&["a@campus.edu"]))
        .expect("drive ended");

    assert_eq!(drive.status, DriveStatus::Completed);
    assert_eq!(outcome.selected.len(), 1);
    assert_eq!(outcome.rejected.len(), 2);

    let notices = notifier.notices();
    let congrats: Vec<_> = notices
        .iter()
        .filter(|notice| notice.message.starts_with("Congratulations"))
        .collect();
    assert_eq!(congrats.len(), 1);
    assert_eq!(congrats[0].student, winner.id);
    assert_eq!(
        notices
            .iter()
            .filter(|notice| notice.severity == Severity::Error)
            .count(),
        2
    );

    match service.end_drive(&created.drive.id, end_request(&["a@campus.edu"])) {
        Err(DriveServiceError::DriveCompleted) => {}
        other => panic!("expected completed drive rejection, got {other:?}"),
    }
}

#[test]
fn completed_drives_reject_further_phases_and_applications() {
    let (service, _, directory, _) = build_service();
    let applicant = seed(&directory, student("a", "CSE", Some(8.0)));
    let late = seed(&directory, student("b", "CSE", Some(8.5)));
    let created = service.create_drive(new_drive()).expect("drive created");
    service
        .apply(&created.drive.id, &applicant.id)
        .expect("apply");

    let (drive, _) = service
        .add_phase(
            &created.drive.id,
            phase_request(PhaseName::FinalSelection, Some(&["a@campus.edu"])),
        )
        .expect("final phase");
    assert_eq!(drive.status, DriveStatus::Completed);

    match service.add_phase(
        &created.drive.id,
        phase_request(PhaseName::InterviewHr, Some(&["a@campus.edu"])),
    ) {
        Err(DriveServiceError::DriveCompleted) => {}
        other => panic!("expected completed drive rejection, got {other:?}"),
    }
    match service.apply(&created.drive.id, &late.id) {
        Err(DriveServiceError::DriveCompleted) => {}
        other => panic!("expected completed drive rejection, got {other:?}"),
    }
}

#[test]
fn profile_updates_reconcile_the_materialized_view() {
    let (service, _, directory, _) = build_service();
    let borderline = seed(&directory, student("a", "CSE", Some(7.4)));
    let created = service.create_drive(new_drive()).expect("drive created");
    assert_eq!(created.eligible_count, 0);

    let update = ProfileUpdate {
        cgpa: Some(7.5),
        ..ProfileUpdate::default()
    };
    let improved = service
        .update_student_profile(&borderline.id, update)
        .expect("profile updated");
    assert!(improved.eligible_drives.contains(&created.drive.id));

    let downgrade = ProfileUpdate {
        backlogs: Some(2),
        ..ProfileUpdate::default()
    };
    let demoted = service
        .update_student_profile(&borderline.id, downgrade)
        .expect("profile updated");
    assert!(demoted.eligible_drives.is_empty());
}

#[test]
fn manual_status_override_notifies_the_student() {
    let (service, _, directory, notifier) = build_service();
    let applicant = seed(&directory, student("a", "CSE", Some(8.0)));
    let created = service.create_drive(new_drive()).expect("drive created");
    service
        .apply(&created.drive.id, &applicant.id)
        .expect("apply");

    let drive = service
        .update_status(&created.drive.id, &applicant.id, ApplicationStatus::Interview)
        .expect("status updated");
    assert_eq!(
        drive.applications[0].status,
        ApplicationStatus::Interview
    );

    let notices = notifier.notices();
    let update_notice = notices.last().expect("notice emitted");
    assert!(update_notice.message.contains("Interview"));
    assert_eq!(update_notice.severity, Severity::Info);
}

#[test]
fn dispatch_failures_never_block_the_operation() {
    let drives = Arc::new(MemoryDriveStore::default());
    let directory = Arc::new(MemoryStudentDirectory::default());
    let service = PlacementDriveService::new(
        drives,
        directory.clone(),
        Arc::new(FailingDispatcher),
        "/student/placement".to_string(),
    );
    let applicant = seed(&directory, student("a", "CSE", Some(8.0)));

    let created = service.create_drive(new_drive()).expect("drive created");
    service
        .apply(&created.drive.id, &applicant.id)
        .expect("apply succeeds despite dead notification feed");
}

#[test]
fn concurrent_applies_admit_exactly_one_application() {
    let (service, drives, directory, _) = build_service();
    let applicant = seed(&directory, student("a", "CSE", Some(8.0)));
    let created = service.create_drive(new_drive()).expect("drive created");

    let mut handles = Vec::new();
    for _ in 0..4 {
        let service = service.clone();
        let drive_id = created.drive.id.clone();
        let student_id = applicant.id.clone();
        handles.push(std::thread::spawn(move || {
            service.apply(&drive_id, &student_id).is_ok()
        }));
    }

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread joins"))
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);

    let stored = drives
        .fetch(&created.drive.id)
        .expect("fetch succeeds")
        .expect("drive present");
    assert_eq!(stored.applications.len(), 1);
}

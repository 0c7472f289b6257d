use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::drives::domain::{DriveCriteria, NewDrive, Student, StudentId};
use crate::workflows::drives::notify::{DispatchError, Notification, NotificationDispatcher};
use crate::workflows::drives::repository::MemoryDriveStore;
use crate::workflows::drives::roster::{MemoryStudentDirectory, StudentDirectory};
use crate::workflows::drives::router::drive_router;
use crate::workflows::drives::service::PlacementDriveService;

pub(super) fn criteria() -> DriveCriteria {
    DriveCriteria {
        eligible_branches: vec!["CSE".to_string(), "ECE".to_string()],
        min_cgpa: 7.5,
        max_backlogs: 0,
        min_semesters_completed: 4,
    }
}

pub(super) fn new_drive() -> NewDrive {
    NewDrive {
        company_name: "Vertex Systems".to_string(),
        role: "Software Engineer".to_string(),
        description: "Graduate hiring for the platform team".to_string(),
        criteria: criteria(),
        drive_date: NaiveDate::from_ymd_opt(2026, 9, 15).expect("valid date"),
    }
}

pub(super) fn student(suffix: &str, branch: &str, cgpa: Option<f32>) -> Student {
    Student {
        id: StudentId(format!("stu-{suffix}")),
        name: format!("Student {suffix}"),
        email: format!("{suffix}@campus.edu"),
        registration_number: format!("REG-{suffix}"),
        branch: branch.to_string(),
        batch: 2026,
        cgpa,
        backlogs: 0,
        semesters_completed: 6,
        phone_number: None,
        eligible_drives: BTreeSet::new(),
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    notices: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub(super) fn notices(&self) -> Vec<Notification> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryNotifier {
    fn dispatch(&self, notice: Notification) -> Result<(), DispatchError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingDispatcher;

impl NotificationDispatcher for FailingDispatcher {
    fn dispatch(&self, _notice: Notification) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("feed offline".to_string()))
    }
}

pub(super) type TestService =
    PlacementDriveService<MemoryDriveStore, MemoryStudentDirectory, MemoryNotifier>;

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryDriveStore>,
    Arc<MemoryStudentDirectory>,
    Arc<MemoryNotifier>,
) {
    let drives = Arc::new(MemoryDriveStore::default());
    let directory = Arc::new(MemoryStudentDirectory::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(PlacementDriveService::new(
        drives.clone(),
        directory.clone(),
        notifier.clone(),
        "/student/placement".to_string(),
    ));
    (service, drives, directory, notifier)
}

pub(super) fn seed(directory: &MemoryStudentDirectory, student: Student) -> Student {
    directory.insert(student).expect("student inserted")
}

pub(super) fn shortlist_csv(emails: &[&str]) -> String {
    let mut csv = "Email\n".to_string();
    for email in emails {
        csv.push_str(email);
        csv.push('\n');
    }
    csv
}

pub(super) fn test_router(service: Arc<TestService>) -> axum::Router {
    drive_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

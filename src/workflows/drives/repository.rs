use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::{Application, Drive, DriveId};

/// Storage abstraction for drives so the service module can be exercised in
/// isolation. A drive aggregates its applications and phases; the store is
/// the authority for the one-application-per-(drive, student) constraint,
/// which `insert_application` enforces atomically rather than trusting the
/// caller's pre-check.
pub trait DriveRepository: Send + Sync {
    fn insert(&self, drive: Drive) -> Result<Drive, RepositoryError>;
    fn fetch(&self, id: &DriveId) -> Result<Option<Drive>, RepositoryError>;
    /// All drives, newest first.
    fn list(&self) -> Result<Vec<Drive>, RepositoryError>;
    fn update(&self, drive: Drive) -> Result<(), RepositoryError>;
    /// Append one application, rejecting a duplicate (drive, student) pair
    /// with `Conflict` in the same critical section as the membership check.
    fn insert_application(
        &self,
        id: &DriveId,
        application: Application,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// In-process drive store used by the binary and the test suite.
#[derive(Default)]
pub struct MemoryDriveStore {
    drives: Mutex<HashMap<DriveId, Drive>>,
}

impl DriveRepository for MemoryDriveStore {
    fn insert(&self, drive: Drive) -> Result<Drive, RepositoryError> {
        let mut guard = self.drives.lock().expect("drive store mutex poisoned");
        if guard.contains_key(&drive.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(drive.id.clone(), drive.clone());
        Ok(drive)
    }

    fn fetch(&self, id: &DriveId) -> Result<Option<Drive>, RepositoryError> {
        let guard = self.drives.lock().expect("drive store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Drive>, RepositoryError> {
        let guard = self.drives.lock().expect("drive store mutex poisoned");
        let mut drives: Vec<Drive> = guard.values().cloned().collect();
        drives.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drives)
    }

    fn update(&self, drive: Drive) -> Result<(), RepositoryError> {
        let mut guard = self.drives.lock().expect("drive store mutex poisoned");
        if !guard.contains_key(&drive.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(drive.id.clone(), drive);
        Ok(())
    }

    fn insert_application(
        &self,
        id: &DriveId,
        application: Application,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.drives.lock().expect("drive store mutex poisoned");
        let drive = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if drive
            .applications
            .iter()
            .any(|existing| existing.student == application.student)
        {
            return Err(RepositoryError::Conflict);
        }
        drive.applications.push(application);
        Ok(())
    }
}

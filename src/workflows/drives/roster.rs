//! Student directory boundary and roster intake.
//!
//! The directory owns student profiles; the drive core resolves shortlist
//! emails through it and rewrites the `eligible_drives` materialized view.
//! Roster intake supports single registration and bulk CSV import. Bulk
//! import aggregates per-row success/failure, unlike shortlist resolution
//! which is all-or-nothing; the asymmetry is intentional and must not be
//! unified.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::domain::{DriveId, Student, StudentId};

/// Lookup and mutation surface of the student directory.
pub trait StudentDirectory: Send + Sync {
    /// Register a student; `Conflict` on a duplicate email or registration
    /// number.
    fn insert(&self, student: Student) -> Result<Student, DirectoryError>;
    fn fetch(&self, id: &StudentId) -> Result<Option<Student>, DirectoryError>;
    /// Case-insensitive email lookup.
    fn find_by_email(&self, email: &str) -> Result<Option<Student>, DirectoryError>;
    fn list(&self) -> Result<Vec<Student>, DirectoryError>;
    /// Replace the materialized eligible-drives view wholesale.
    fn replace_eligible_drives(
        &self,
        id: &StudentId,
        drives: BTreeSet<DriveId>,
    ) -> Result<(), DirectoryError>;
    /// Apply a partial profile update, returning the new profile.
    fn update_profile(
        &self,
        id: &StudentId,
        update: ProfileUpdate,
    ) -> Result<Student, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("student with this email or registration number already exists")]
    Conflict,
    #[error("student not found")]
    NotFound,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Fields a coordinator may change after registration. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub branch: Option<String>,
    pub cgpa: Option<f32>,
    pub backlogs: Option<u8>,
    pub semesters_completed: Option<u8>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.branch.is_none()
            && self.cgpa.is_none()
            && self.backlogs.is_none()
            && self.semesters_completed.is_none()
    }
}

static STUDENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_student_id() -> StudentId {
    let id = STUDENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    StudentId(format!("stu-{id:06}"))
}

/// Inbound registration payload before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub registration_number: String,
    pub branch: String,
    pub batch: u16,
    #[serde(default)]
    pub cgpa: Option<f32>,
    #[serde(default)]
    pub backlogs: u8,
    #[serde(default)]
    pub semesters_completed: u8,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl NewStudent {
    fn into_student(self, id: StudentId) -> Student {
        Student {
            id,
            name: self.name,
            email: self.email.trim().to_lowercase(),
            registration_number: self.registration_number,
            branch: self.branch,
            batch: self.batch,
            cgpa: self.cgpa,
            backlogs: self.backlogs,
            semesters_completed: self.semesters_completed,
            phone_number: self.phone_number,
            eligible_drives: BTreeSet::new(),
        }
    }
}

/// Field-level checks shared by single registration and bulk import.
pub fn validate_student(student: &NewStudent) -> Vec<String> {
    let mut errors = Vec::new();

    if student.name.trim().is_empty() {
        errors.push("missing required field: name".to_string());
    }
    if student.email.trim().is_empty() {
        errors.push("missing required field: email".to_string());
    } else if !plausible_email(student.email.trim()) {
        errors.push("invalid email format".to_string());
    }
    if student.registration_number.trim().is_empty() {
        errors.push("missing required field: registration_number".to_string());
    }
    if student.branch.trim().is_empty() {
        errors.push("missing required field: branch".to_string());
    }
    if student.batch == 0 {
        errors.push("missing required field: batch".to_string());
    }
    if let Some(cgpa) = student.cgpa {
        if !(0.0..=10.0).contains(&cgpa) {
            errors.push("CGPA must be between 0 and 10".to_string());
        }
    }

    errors
}

fn plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

/// Register one student after validation.
pub fn register_student<D: StudentDirectory>(
    directory: &D,
    student: NewStudent,
) -> Result<Student, RegistrationError> {
    let errors = validate_student(&student);
    if !errors.is_empty() {
        return Err(RegistrationError::Invalid(errors));
    }
    let student = student.into_student(next_student_id());
    directory.insert(student).map_err(RegistrationError::from)
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid student record: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// One row of the roster upload; header names match the coordinator
/// template.
#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Email", default)]
    email: String,
    #[serde(rename = "RegistrationNumber", default)]
    registration_number: String,
    #[serde(rename = "Branch", default)]
    branch: String,
    #[serde(rename = "Batch", default)]
    batch: u16,
    #[serde(rename = "SemestersCompleted", default)]
    semesters_completed: u8,
    #[serde(rename = "NumberOfBacklogs", default)]
    backlogs: u8,
    #[serde(rename = "CGPA", default)]
    cgpa: Option<f32>,
    #[serde(rename = "PhoneNumber", default)]
    phone_number: Option<String>,
}

/// Per-row failure detail surfaced to the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRowError {
    pub row: usize,
    pub email: String,
    pub errors: Vec<String>,
}

/// Admitted-student summary mirrored back in the import response.
#[derive(Debug, Clone, Serialize)]
pub struct ImportedStudent {
    pub student_id: StudentId,
    pub email: String,
    pub registration_number: String,
}

/// Aggregated result of a bulk roster import: successes and failures side
/// by side, never aborting the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub admitted: Vec<ImportedStudent>,
    pub errors: Vec<ImportRowError>,
}

/// Import a roster CSV, validating and inserting row by row.
pub fn import_roster<R: Read, D: StudentDirectory>(
    reader: R,
    directory: &D,
) -> Result<ImportOutcome, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut outcome = ImportOutcome::default();
    for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
        let row_number = index + 2; // header occupies row 1
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                outcome.errors.push(ImportRowError {
                    row: row_number,
                    email: String::new(),
                    errors: vec![err.to_string()],
                });
                continue;
            }
        };

        let candidate = NewStudent {
            name: row.name,
            email: row.email,
            registration_number: row.registration_number,
            branch: row.branch,
            batch: row.batch,
            cgpa: row.cgpa,
            backlogs: row.backlogs,
            semesters_completed: row.semesters_completed,
            phone_number: row.phone_number,
        };

        match register_student(directory, candidate) {
            Ok(student) => outcome.admitted.push(ImportedStudent {
                student_id: student.id.clone(),
                email: student.email,
                registration_number: student.registration_number,
            }),
            Err(RegistrationError::Invalid(errors)) => outcome.errors.push(ImportRowError {
                row: row_number,
                email: String::new(),
                errors,
            }),
            Err(RegistrationError::Directory(err)) => outcome.errors.push(ImportRowError {
                row: row_number,
                email: String::new(),
                errors: vec![err.to_string()],
            }),
        }
    }

    Ok(outcome)
}

/// The blank roster template coordinators download before a bulk upload.
pub fn roster_template_csv() -> String {
    "Name,Email,RegistrationNumber,Branch,Batch,SemestersCompleted,NumberOfBacklogs,CGPA,PhoneNumber\n"
        .to_string()
}

/// In-process student directory used by the binary and the test suite.
#[derive(Default)]
pub struct MemoryStudentDirectory {
    students: Mutex<HashMap<StudentId, Student>>,
}

impl StudentDirectory for MemoryStudentDirectory {
    fn insert(&self, student: Student) -> Result<Student, DirectoryError> {
        let mut guard = self.students.lock().expect("directory mutex poisoned");
        let duplicate = guard.values().any(|existing| {
            existing.email.eq_ignore_ascii_case(&student.email)
                || existing.registration_number == student.registration_number
        });
        if duplicate {
            return Err(DirectoryError::Conflict);
        }
        guard.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    fn fetch(&self, id: &StudentId) -> Result<Option<Student>, DirectoryError> {
        let guard = self.students.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Student>, DirectoryError> {
        let guard = self.students.lock().expect("directory mutex poisoned");
        Ok(guard
            .values()
            .find(|student| student.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    fn list(&self) -> Result<Vec<Student>, DirectoryError> {
        let guard = self.students.lock().expect("directory mutex poisoned");
        let mut students: Vec<Student> = guard.values().cloned().collect();
        students.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(students)
    }

    fn replace_eligible_drives(
        &self,
        id: &StudentId,
        drives: BTreeSet<DriveId>,
    ) -> Result<(), DirectoryError> {
        let mut guard = self.students.lock().expect("directory mutex poisoned");
        let student = guard.get_mut(id).ok_or(DirectoryError::NotFound)?;
        student.eligible_drives = drives;
        Ok(())
    }

    fn update_profile(
        &self,
        id: &StudentId,
        update: ProfileUpdate,
    ) -> Result<Student, DirectoryError> {
        let mut guard = self.students.lock().expect("directory mutex poisoned");
        let student = guard.get_mut(id).ok_or(DirectoryError::NotFound)?;
        if let Some(branch) = update.branch {
            student.branch = branch;
        }
        if let Some(cgpa) = update.cgpa {
            student.cgpa = Some(cgpa);
        }
        if let Some(backlogs) = update.backlogs {
            student.backlogs = backlogs;
        }
        if let Some(semesters) = update.semesters_completed {
            student.semesters_completed = semesters;
        }
        Ok(student.clone())
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier wrapper for placement drives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriveId(pub String);

/// Identifier wrapper for students in the directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Student profile as held by the directory. The drive core reads every
/// field but only ever rewrites `eligible_drives`, the materialized view of
/// drives the student currently qualifies for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub registration_number: String,
    pub branch: String,
    pub batch: u16,
    pub cgpa: Option<f32>,
    pub backlogs: u8,
    pub semesters_completed: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub eligible_drives: BTreeSet<DriveId>,
}

/// Static criteria a student profile is matched against. Numeric criteria
/// absent from the create request default to 0, the most permissive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveCriteria {
    pub eligible_branches: Vec<String>,
    #[serde(default)]
    pub min_cgpa: f32,
    #[serde(default)]
    pub max_backlogs: u8,
    #[serde(default)]
    pub min_semesters_completed: u8,
}

/// Lifecycle state of a drive. Transitions are one-directional:
/// Open -> InProgress -> Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl DriveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

/// Standing of an application over the drive's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Interview,
    Selected,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Interview => "Interview",
            Self::Selected => "Selected",
            Self::Rejected => "Rejected",
        }
    }

    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Applied" => Some(Self::Applied),
            "Interview" => Some(Self::Interview),
            "Selected" => Some(Self::Selected),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The fixed catalogue of selection phases. Final Selection is terminal:
/// once appended the drive is Completed and accepts no further phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseName {
    #[serde(rename = "Resume Screening")]
    ResumeScreening,
    #[serde(rename = "Written Test")]
    WrittenTest,
    #[serde(rename = "Interview HR")]
    InterviewHr,
    #[serde(rename = "Interview Technical")]
    InterviewTechnical,
    #[serde(rename = "Aptitude Test")]
    AptitudeTest,
    #[serde(rename = "Coding Test")]
    CodingTest,
    #[serde(rename = "Final Selection")]
    FinalSelection,
}

impl PhaseName {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ResumeScreening => "Resume Screening",
            Self::WrittenTest => "Written Test",
            Self::InterviewHr => "Interview HR",
            Self::InterviewTechnical => "Interview Technical",
            Self::AptitudeTest => "Aptitude Test",
            Self::CodingTest => "Coding Test",
            Self::FinalSelection => "Final Selection",
        }
    }

    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Resume Screening" => Some(Self::ResumeScreening),
            "Written Test" => Some(Self::WrittenTest),
            "Interview HR" => Some(Self::InterviewHr),
            "Interview Technical" => Some(Self::InterviewTechnical),
            "Aptitude Test" => Some(Self::AptitudeTest),
            "Coding Test" => Some(Self::CodingTest),
            "Final Selection" => Some(Self::FinalSelection),
            _ => None,
        }
    }

    pub const fn is_final(self) -> bool {
        matches!(self, Self::FinalSelection)
    }
}

/// One student's standing record against one drive. Unique per
/// (drive, student); created on apply, mutated in place, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub student: StudentId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(student: StudentId, now: DateTime<Utc>) -> Self {
        Self {
            student,
            status: ApplicationStatus::Applied,
            applied_at: now,
            updated_at: now,
        }
    }
}

/// One ordered stage of the selection pipeline. The phase list on a drive
/// is append-only; the last element is the current phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: PhaseName,
    pub shortlisted: BTreeSet<StudentId>,
    pub requirements: String,
    pub instructions: String,
    pub created_at: DateTime<Utc>,
}

/// A placement opportunity with its criteria, applications, and pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub id: DriveId,
    pub company_name: String,
    pub role: String,
    pub description: String,
    pub criteria: DriveCriteria,
    pub drive_date: NaiveDate,
    pub status: DriveStatus,
    pub applications: Vec<Application>,
    pub phases: Vec<Phase>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Drive {
    pub fn new(id: DriveId, request: NewDrive, now: DateTime<Utc>) -> Self {
        Self {
            id,
            company_name: request.company_name,
            role: request.role,
            description: request.description,
            criteria: request.criteria,
            drive_date: request.drive_date,
            status: DriveStatus::Open,
            applications: Vec::new(),
            phases: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.phases.last()
    }

    pub fn application(&self, student: &StudentId) -> Option<&Application> {
        self.applications.iter().find(|app| &app.student == student)
    }

    pub(crate) fn application_mut(&mut self, student: &StudentId) -> Option<&mut Application> {
        self.applications
            .iter_mut()
            .find(|app| &app.student == student)
    }

    /// Everyone who has applied, regardless of current status.
    pub fn applicant_pool(&self) -> BTreeSet<StudentId> {
        self.applications
            .iter()
            .map(|app| app.student.clone())
            .collect()
    }
}

/// Coordinator-supplied fields for a new drive.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDrive {
    pub company_name: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    pub criteria: DriveCriteria,
    pub drive_date: NaiveDate,
}

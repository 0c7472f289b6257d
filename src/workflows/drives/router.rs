use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationStatus, DriveId, NewDrive, PhaseName, StudentId};
use super::notify::NotificationDispatcher;
use super::repository::DriveRepository;
use super::roster::{NewStudent, ProfileUpdate, RegistrationError, StudentDirectory};
use super::service::{
    AddPhaseRequest, DriveServiceError, EndDriveRequest, PlacementDriveService,
};
use super::shortlist;

type Service<R, D, N> = Arc<PlacementDriveService<R, D, N>>;

/// Router builder exposing the drive lifecycle and roster endpoints.
/// Role/session enforcement happens upstream of this router.
pub fn drive_router<R, D, N>(service: Service<R, D, N>) -> Router
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/drives",
            get(list_drives_handler::<R, D, N>).post(create_drive_handler::<R, D, N>),
        )
        .route(
            "/api/v1/drives/shortlist-template",
            get(shortlist_template_handler),
        )
        .route("/api/v1/drives/:id", get(get_drive_handler::<R, D, N>))
        .route(
            "/api/v1/drives/:id/applications",
            get(applications_handler::<R, D, N>),
        )
        .route("/api/v1/drives/:id/apply", post(apply_handler::<R, D, N>))
        .route(
            "/api/v1/drives/:id/phases",
            post(add_phase_handler::<R, D, N>),
        )
        .route("/api/v1/drives/:id/end", post(end_drive_handler::<R, D, N>))
        .route(
            "/api/v1/drives/:drive_id/status/:student_id",
            put(update_status_handler::<R, D, N>),
        )
        .route(
            "/api/v1/students",
            post(register_student_handler::<R, D, N>),
        )
        .route(
            "/api/v1/students/import",
            post(import_roster_handler::<R, D, N>),
        )
        .route(
            "/api/v1/students/:id/profile",
            put(update_profile_handler::<R, D, N>),
        )
        .with_state(service)
}

fn error_response(err: DriveServiceError) -> Response {
    use DriveServiceError::*;

    if let UnresolvedEmails(emails) = &err {
        let payload = json!({
            "error": err.to_string(),
            "unresolved_emails": emails,
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    let status = match &err {
        DriveNotFound | StudentNotFound | ApplicationNotFound => StatusCode::NOT_FOUND,
        NotEligible => StatusCode::FORBIDDEN,
        AlreadyApplied => StatusCode::CONFLICT,
        DriveCompleted | MissingShortlist | InvalidPhaseName(_) | InvalidStatus(_)
        | Shortlist(_) | UnresolvedEmails(_) => StatusCode::BAD_REQUEST,
        Repository(_) | Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn create_drive_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Json(request): Json<NewDrive>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.create_drive(request) {
        Ok(created) => {
            let payload = json!({
                "message": "Placement drive created successfully",
                "drive": created.drive,
                "eligible_count": created.eligible_count,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn list_drives_handler<R, D, N>(State(service): State<Service<R, D, N>>) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.list_drives() {
        Ok(drives) => (StatusCode::OK, Json(drives)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct DriveQuery {
    /// Student id injected by the auth layer for student callers.
    student: Option<String>,
}

async fn get_drive_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Path(id): Path<String>,
    Query(query): Query<DriveQuery>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let caller = query.student.map(StudentId);
    match service.get_drive(&DriveId(id), caller.as_ref()) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn applications_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Path(id): Path<String>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.applications(&DriveId(id)) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct ApplyBody {
    student_id: String,
}

async fn apply_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Path(id): Path<String>,
    Json(body): Json<ApplyBody>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.apply(&DriveId(id), &StudentId(body.student_id)) {
        Ok(application) => {
            let payload = json!({
                "message": "Successfully applied to placement drive",
                "application": application,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct AddPhaseBody {
    phase_name: String,
    #[serde(default)]
    requirements: String,
    #[serde(default)]
    instructions: String,
    /// Shortlist CSV content, passed inline; optional only for the first
    /// phase of a drive.
    #[serde(default)]
    shortlist_csv: Option<String>,
}

fn parse_shortlist_csv(raw: &str) -> Result<Vec<String>, DriveServiceError> {
    shortlist::parse_email_column(Cursor::new(raw.as_bytes())).map_err(DriveServiceError::from)
}

async fn add_phase_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Path(id): Path<String>,
    Json(body): Json<AddPhaseBody>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(name) = PhaseName::parse_label(&body.phase_name) else {
        return error_response(DriveServiceError::InvalidPhaseName(body.phase_name));
    };

    let shortlist_emails = match body.shortlist_csv.as_deref() {
        Some(raw) => match parse_shortlist_csv(raw) {
            Ok(emails) => Some(emails),
            Err(err) => return error_response(err),
        },
        None => None,
    };

    let request = AddPhaseRequest {
        name,
        requirements: body.requirements,
        instructions: body.instructions,
        shortlist_emails,
    };

    match service.add_phase(&DriveId(id), request) {
        Ok((drive, outcome)) => {
            let payload = json!({
                "message": format!("Phase {} added successfully", name.label()),
                "drive": drive,
                "shortlisted": outcome.selected.len(),
                "rejected": outcome.rejected.len(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct EndDriveBody {
    #[serde(default)]
    requirements: String,
    #[serde(default)]
    instructions: String,
    #[serde(default)]
    shortlist_csv: Option<String>,
}

async fn end_drive_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Path(id): Path<String>,
    Json(body): Json<EndDriveBody>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(raw) = body.shortlist_csv.as_deref() else {
        return error_response(DriveServiceError::MissingShortlist);
    };
    let shortlist_emails = match parse_shortlist_csv(raw) {
        Ok(emails) => emails,
        Err(err) => return error_response(err),
    };

    let request = EndDriveRequest {
        requirements: body.requirements,
        instructions: body.instructions,
        shortlist_emails,
    };

    match service.end_drive(&DriveId(id), request) {
        Ok((drive, outcome)) => {
            let payload = json!({
                "message": "Placement drive ended successfully",
                "drive": drive,
                "selected": outcome.selected.len(),
                "rejected": outcome.rejected.len(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateStatusBody {
    status: String,
}

async fn update_status_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Path((drive_id, student_id)): Path<(String, String)>,
    Json(body): Json<UpdateStatusBody>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let Some(status) = ApplicationStatus::parse_label(&body.status) else {
        return error_response(DriveServiceError::InvalidStatus(body.status));
    };

    match service.update_status(&DriveId(drive_id), &StudentId(student_id), status) {
        Ok(drive) => {
            let payload = json!({
                "message": "Application status updated successfully",
                "drive": drive,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn shortlist_template_handler() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=shortlist_template.csv",
            ),
        ],
        shortlist::template_csv(),
    )
        .into_response()
}

async fn register_student_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Json(body): Json<NewStudent>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.register_student(body) {
        Ok(student) => {
            let payload = json!({
                "message": "Student added successfully",
                "student": {
                    "id": student.id,
                    "email": student.email,
                    "registration_number": student.registration_number,
                },
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(RegistrationError::Invalid(errors)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
        }
        Err(RegistrationError::Directory(err)) => {
            let status = match err {
                super::roster::DirectoryError::Conflict => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImportRosterBody {
    roster_csv: String,
}

async fn import_roster_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Json(body): Json<ImportRosterBody>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.import_roster(Cursor::new(body.roster_csv.into_bytes())) {
        Ok(outcome) => {
            let payload = json!({
                "message": "Bulk student addition processed",
                "admitted": outcome.admitted,
                "errors": outcome.errors,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn update_profile_handler<R, D, N>(
    State(service): State<Service<R, D, N>>,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    R: DriveRepository + 'static,
    D: StudentDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.update_student_profile(&StudentId(id), update) {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(err) => error_response(err),
    }
}

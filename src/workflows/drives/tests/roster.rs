use crate::workflows::drives::roster::{
    import_roster, register_student, roster_template_csv, validate_student,
    MemoryStudentDirectory, NewStudent, RegistrationError, StudentDirectory,
};
use std::io::Cursor;

fn candidate(suffix: &str) -> NewStudent {
    NewStudent {
        name: format!("Student {suffix}"),
        email: format!("{suffix}@campus.edu"),
        registration_number: format!("REG-{suffix}"),
        branch: "CSE".to_string(),
        batch: 2026,
        cgpa: Some(8.1),
        backlogs: 0,
        semesters_completed: 6,
        phone_number: None,
    }
}

#[test]
fn validation_collects_every_missing_field() {
    let blank = NewStudent {
        name: String::new(),
        email: String::new(),
        registration_number: String::new(),
        branch: String::new(),
        batch: 0,
        cgpa: None,
        backlogs: 0,
        semesters_completed: 0,
        phone_number: None,
    };

    let errors = validate_student(&blank);
    assert_eq!(errors.len(), 5);
    assert!(errors.iter().all(|error| error.contains("missing required")));
}

#[test]
fn validation_rejects_implausible_email_and_cgpa() {
    let mut bad = candidate("a");
    bad.email = "not-an-email".to_string();
    bad.cgpa = Some(11.0);

    let errors = validate_student(&bad);
    assert!(errors.iter().any(|error| error.contains("email")));
    assert!(errors.iter().any(|error| error.contains("CGPA")));
}

#[test]
fn registration_lowercases_email_and_rejects_duplicates() {
    let directory = MemoryStudentDirectory::default();

    let mut first = candidate("a");
    first.email = "Mixed.Case@Campus.edu".to_string();
    let stored = register_student(&directory, first).expect("registered");
    assert_eq!(stored.email, "mixed.case@campus.edu");

    let mut duplicate = candidate("b");
    duplicate.email = "mixed.case@campus.edu".to_string();
    match register_student(&directory, duplicate) {
        Err(RegistrationError::Directory(_)) => {}
        other => panic!("expected duplicate rejection, got {other:?}"),
    }

    let found = directory
        .find_by_email("MIXED.CASE@campus.edu")
        .expect("lookup succeeds");
    assert!(found.is_some());
}

#[test]
fn import_aggregates_failures_without_aborting_the_batch() {
    let directory = MemoryStudentDirectory::default();
    let csv = "\
Name,Email,RegistrationNumber,Branch,Batch,SemestersCompleted,NumberOfBacklogs,CGPA,PhoneNumber
Asha Rao,asha@campus.edu,REG-101,CSE,2026,6,0,8.4,
,missing-name@campus.edu,REG-102,ECE,2026,6,0,7.9,
Vikram Shah,vikram@campus.edu,REG-103,ECE,2026,6,0,7.2,9876543210
";

    let outcome = import_roster(Cursor::new(csv.as_bytes()), &directory).expect("import runs");

    assert_eq!(outcome.admitted.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].row, 3);
    assert!(outcome.errors[0]
        .errors
        .iter()
        .any(|error| error.contains("name")));

    assert!(directory
        .find_by_email("vikram@campus.edu")
        .expect("lookup succeeds")
        .is_some());
}

#[test]
fn import_reports_duplicate_rows_against_existing_students() {
    let directory = MemoryStudentDirectory::default();
    register_student(&directory, candidate("a")).expect("registered");

    let csv = "\
Name,Email,RegistrationNumber,Branch,Batch,SemestersCompleted,NumberOfBacklogs,CGPA,PhoneNumber
Duplicate,a@campus.edu,REG-999,CSE,2026,6,0,8.0,
";
    let outcome = import_roster(Cursor::new(csv.as_bytes()), &directory).expect("import runs");

    assert!(outcome.admitted.is_empty());
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].row, 2);
}

#[test]
fn roster_template_lists_expected_headers() {
    let template = roster_template_csv();
    assert!(template.starts_with("Name,Email,RegistrationNumber"));
    assert!(template.ends_with("PhoneNumber\n"));
}

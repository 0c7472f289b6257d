//! CSV shortlist codec used by coordinators to upload phase shortlists.
//!
//! The accepted format is a single email column with a header of `Email`,
//! `email`, or `Student Email`. Emails are trimmed, lowercased, and
//! deduplicated preserving first occurrence. An empty primary shortlist is
//! rejected here; resolution of emails to registered students happens in
//! the service layer.

use std::io::Read;

/// Header names recognized for the email column.
const EMAIL_HEADERS: [&str; 3] = ["Email", "email", "Student Email"];

#[derive(Debug, thiserror::Error)]
pub enum ShortlistError {
    #[error("shortlist is missing an email column (expected a header named Email, email, or Student Email)")]
    MissingEmailColumn,
    #[error("shortlist contains no email rows")]
    Empty,
    #[error("unable to read shortlist: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse the email column out of a shortlist upload.
pub fn parse_email_column<R: Read>(reader: R) -> Result<Vec<String>, ShortlistError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|header| EMAIL_HEADERS.contains(&header.trim()))
        .ok_or(ShortlistError::MissingEmailColumn)?;

    let mut emails: Vec<String> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let Some(raw) = record.get(column) else {
            continue;
        };
        let email = raw.trim().to_lowercase();
        if email.is_empty() || emails.contains(&email) {
            continue;
        }
        emails.push(email);
    }

    if emails.is_empty() {
        return Err(ShortlistError::Empty);
    }

    Ok(emails)
}

/// The blank template coordinators download before filling a shortlist.
pub fn template_csv() -> String {
    "Email\n".to_string()
}

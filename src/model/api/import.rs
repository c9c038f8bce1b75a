//! Parsing of voter lists uploaded as CSV.

use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;

use crate::model::{
    api::voter::VoterSpec,
    common::{Phone, VotingError},
};

/// The header every voter list must start with, exactly.
pub const EXPECTED_HEADERS: [&str; 4] = ["email", "first_name", "last_name", "phone_number"];

/// One row of a voter list, before validation.
#[derive(Deserialize)]
struct Row {
    email: String,
    first_name: String,
    last_name: String,
    phone_number: String,
}

/// Parse and validate a whole voter list.
///
/// Nothing is returned unless every row is good: a wrong header, an
/// unreadable row, or an email appearing twice fails the entire list.
pub fn parse_voters(data: &str) -> Result<Vec<VoterSpec>, VotingError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| VotingError::MalformedInput(format!("unreadable header: {e}")))?
        .clone();
    if headers != StringRecord::from(EXPECTED_HEADERS.to_vec()) {
        return Err(VotingError::MalformedInput(format!(
            "expected header '{}', found '{}'",
            EXPECTED_HEADERS.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut emails = HashSet::new();
    let mut specs = Vec::new();
    for (i, record) in reader.deserialize::<Row>().enumerate() {
        // Line 1 is the header.
        let line = i + 2;
        let row = record.map_err(|e| VotingError::MalformedInput(format!("line {line}: {e}")))?;

        let phone_number = if row.phone_number.is_empty() {
            None
        } else {
            let phone = row.phone_number.parse::<Phone>().map_err(|e| {
                VotingError::MalformedInput(format!(
                    "line {line}: invalid phone number '{}': {e}",
                    row.phone_number
                ))
            })?;
            Some(phone)
        };
        let spec = VoterSpec {
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number,
        }
        .validated()
        .map_err(|e| VotingError::MalformedInput(format!("line {line}: {e}")))?;

        if !emails.insert(spec.email.clone()) {
            return Err(VotingError::DuplicateVoter(spec.email));
        }
        specs.push(spec);
    }
    Ok(specs)
}

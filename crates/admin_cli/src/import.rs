//! CSV rows of a bulk user import.
//!
//! Columns: `username,password,first_name,last_name,email,surname,family,campus,year,external`.
//! Empty cells are read as absent values.

use std::io::Read;

use engine::NewUser;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UserRow {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub surname: Option<String>,
    pub family: Option<String>,
    pub campus: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub external: Option<bool>,
}

impl From<UserRow> for NewUser {
    fn from(row: UserRow) -> Self {
        let mut user = NewUser::new(row.username, row.password, row.first_name, row.last_name)
            .external(row.external.unwrap_or(false));
        user.email = row.email;
        user.surname = row.surname;
        user.family = row.family;
        user.campus = row.campus;
        user.year = row.year;
        user
    }
}

/// Parses every row, keeping the line number for the report.
pub fn read_rows<R: Read>(reader: R) -> Vec<(usize, Result<UserRow, csv::Error>)> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    reader
        .deserialize::<UserRow>()
        .enumerate()
        // Line 1 is the header.
        .map(|(index, row)| (index + 2, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
username,password,first_name,last_name,email,surname,family,campus,year,external
alice,secret,Alice,Martin,alice@example.org,Lili,12-34,ME,2023,false
bob,secret,Bob,Dupont,,,,,,
carl,secret,Carl,Abcde,,,,,twenty,
";

    #[test]
    fn rows_become_new_users() {
        let mut rows = read_rows(CSV.as_bytes()).into_iter();

        let (line, alice) = rows.next().unwrap();
        assert_eq!(line, 2);
        let alice = NewUser::from(alice.unwrap());
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.family.as_deref(), Some("12-34"));
        assert_eq!(alice.year, Some(2023));
        assert!(!alice.is_external_member);

        let (_, bob) = rows.next().unwrap();
        let bob = NewUser::from(bob.unwrap());
        assert_eq!(bob.email, None);
        assert_eq!(bob.family, None);
        assert_eq!(bob.year, None);
    }

    #[test]
    fn malformed_rows_are_reported_with_their_line() {
        let rows = read_rows(CSV.as_bytes());
        let (line, carl) = &rows[2];
        assert_eq!(*line, 4);
        assert!(carl.is_err());
    }
}

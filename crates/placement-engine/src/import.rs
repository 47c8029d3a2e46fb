//! CSV parsing for the bulk student upload.
//!
//! Expected columns, after a header row: `email,name,regNo,dept,batchYear,password`.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentImportRow {
    pub email: String,
    pub full_name: String,
    pub register_number: String,
    pub department: String,
    pub batch_year: i32,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// `line` is the 1-based line in the file, counting the header.
    #[error("line {line}: {message}")]
    Row { line: u64, message: String },

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("file contains no student rows")]
    Empty,
}

const COLUMNS: usize = 6;

pub fn parse_student_rows<R: Read>(reader: R) -> Result<Vec<StudentImportRow>, ImportError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        rows.push(parse_row(&record).map_err(|message| ImportError::Row { line, message })?);
    }

    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}

fn parse_row(record: &StringRecord) -> Result<StudentImportRow, String> {
    if record.len() < COLUMNS {
        return Err(format!("expected {COLUMNS} columns, found {}", record.len()));
    }

    let field = |idx: usize, name: &str| -> Result<String, String> {
        match record.get(idx) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(format!("{name} is empty")),
        }
    };

    let email = field(0, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(format!("'{email}' is not an email address"));
    }
    let batch_raw = field(4, "batch year")?;
    let batch_year = batch_raw
        .parse::<i32>()
        .ok()
        .filter(|year| (1900..=2999).contains(year))
        .ok_or_else(|| format!("'{batch_raw}' is not a batch year"))?;

    Ok(StudentImportRow {
        email,
        full_name: field(1, "name")?,
        register_number: field(2, "register number")?,
        department: field(3, "department")?,
        batch_year,
        password: field(5, "password")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_after_header() {
        let data = "\
email,name,regNo,dept,batchYear,password
 Asha@KEC.test , Asha R ,22MCA001,MCA,2026,secret1

ravi@kec.test,Ravi K,22CSE014,CSE,2025,secret2
";
        let rows = parse_student_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].email, "asha@kec.test");
        assert_eq!(rows[0].full_name, "Asha R");
        assert_eq!(rows[1].batch_year, 2025);
    }

    #[test]
    fn reports_failing_line() {
        let data = "\
email,name,regNo,dept,batchYear,password
asha@kec.test,Asha,22MCA001,MCA,2026,pw
ravi@kec.test,Ravi,22CSE014,CSE,twenty,pw
";
        let err = parse_student_rows(data.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "line 3: 'twenty' is not a batch year");
    }

    #[test]
    fn short_rows_and_empty_files_are_rejected() {
        let err = parse_student_rows("h\nasha@kec.test,Asha\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Row { line: 2, .. }));

        let err = parse_student_rows("email,name,regNo,dept,batchYear,password\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Empty));
    }
}

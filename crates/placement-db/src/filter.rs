//! Composable WHERE clauses with positional parameters.
//!
//! Clause templates are static SQL written in this crate; caller-supplied
//! values only ever travel as bound parameters.

use rusqlite::ToSql;

#[derive(Default)]
pub struct Predicates {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause. Every `{}` in `template` becomes the same `?N` placeholder.
    pub fn push<T: ToSql + 'static>(&mut self, template: &'static str, value: T) {
        let placeholder = format!("?{}", self.params.len() + 1);
        self.clauses.push(template.replace("{}", &placeholder));
        self.params.push(Box::new(value));
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// `" WHERE a AND b"`, or an empty string when there is nothing to filter on.
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// `" AND a AND b"`, for appending to a query that already has a WHERE.
    pub fn and_clause(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| format!(" AND {clause}"))
            .collect()
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// Admin drive listing filters. Each field is independent; blank strings are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveFilter {
    pub category: Option<String>,
    /// Matches drives whose upper CTC bound is at least this much.
    pub min_salary: Option<i64>,
    pub drive_type: Option<String>,
}

impl DriveFilter {
    pub fn to_predicates(&self) -> Predicates {
        let mut predicates = Predicates::new();
        if let Some(category) = non_blank(&self.category) {
            predicates.push("company_category = {}", category);
        }
        if let Some(min_salary) = self.min_salary {
            predicates.push("ctc_max >= {}", min_salary);
        }
        if let Some(drive_type) = non_blank(&self.drive_type) {
            predicates.push("drive_type = {}", drive_type);
        }
        predicates
    }
}

/// Student listing / bulk-delete filters over `student_profiles sp`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFilter {
    pub department: Option<String>,
    pub batch_year: Option<i32>,
    /// Case-insensitive substring of the name or register number.
    pub search: Option<String>,
}

impl StudentFilter {
    pub fn to_predicates(&self) -> Predicates {
        let mut predicates = Predicates::new();
        if let Some(department) = non_blank(&self.department) {
            predicates.push("sp.department = {}", department);
        }
        if let Some(batch_year) = self.batch_year.filter(|year| *year > 0) {
            predicates.push("sp.batch_year = {}", batch_year);
        }
        if let Some(search) = non_blank(&self.search) {
            predicates.push(
                "(sp.full_name LIKE {} ESCAPE '\\' OR sp.register_number LIKE {} ESCAPE '\\')",
                format!("%{}%", escape_like(&search)),
            );
        }
        predicates
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

//! Identifier normalisation
//!
//! Raw sources arrive with mixed case, embedded spaces, punctuation and
//! digit-leading names. Columns are mapped to lower snake_case identifiers;
//! raw table names follow the raw-store file naming rule.

/// Words that cannot be used bare as a column identifier
const RESERVED: &[&str] = &[
    "all", "and", "as", "by", "case", "date", "else", "end", "from", "group", "in", "is", "join",
    "limit", "not", "null", "on", "or", "order", "select", "table", "then", "time", "timestamp",
    "union", "user", "when", "where",
];

/// Prefix for identifiers that start with a digit
pub const DIGIT_PREFIX: &str = "t_";

/// Prefix for identifiers that collide with a reserved word
pub const RESERVED_PREFIX: &str = "col_";

/// Maps a raw column name to its canonical snake_case identifier
///
/// ```
/// use hrms_semantic::core::staging::naming::canonical_column_name;
///
/// assert_eq!(canonical_column_name("EmpID"), "emp_id");
/// assert_eq!(canonical_column_name("Employee Number"), "employee_number");
/// assert_eq!(canonical_column_name("1099_Flag"), "t_1099_flag");
/// assert_eq!(canonical_column_name("Check #"), "check_num");
/// ```
pub fn canonical_column_name(raw: &str) -> String {
    let raw = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '$' => continue,
            '#' => push_word(&mut out, "num"),
            '%' => push_word(&mut out, "pct"),
            '&' => push_word(&mut out, "and"),
            c if c.is_alphanumeric() => {
                if c.is_uppercase() && i > 0 {
                    let prev = chars[i - 1];
                    let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                    let boundary = prev.is_lowercase()
                        || prev.is_ascii_digit()
                        || (prev.is_uppercase() && next_lower);
                    if boundary && !out.ends_with('_') {
                        out.push('_');
                    }
                }
                out.extend(c.to_lowercase());
            }
            _ => {
                if !out.is_empty() && !out.ends_with('_') {
                    out.push('_');
                }
            }
        }
    }

    let mut name = out.trim_matches('_').to_string();
    if name.is_empty() {
        name = "column".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name = format!("{DIGIT_PREFIX}{name}");
    } else if RESERVED.contains(&name.as_str()) {
        name = format!("{RESERVED_PREFIX}{name}");
    }
    name
}

fn push_word(out: &mut String, word: &str) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
    out.push_str(word);
    out.push('_');
}

/// Canonicalises a list of raw names, suffixing collisions with `_2`, `_3`, ...
pub fn canonical_column_names<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        let base = canonical_column_name(name.as_ref());
        let mut candidate = base.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        seen.push(candidate);
    }
    seen
}

/// Raw-store name for a source table
///
/// Quotes are stripped, spaces and dashes become `_`, `$` and stray quotes
/// are removed, the result is lower-cased and a leading digit gets `t_`.
///
/// ```
/// use hrms_semantic::core::staging::naming::sanitize_table_name;
///
/// assert_eq!(sanitize_table_name("'Employee Master$'"), "employee_master");
/// assert_eq!(sanitize_table_name("2024-Q1 Hours"), "t_2024_q1_hours");
/// ```
pub fn sanitize_table_name(raw: &str) -> String {
    let stripped = raw.trim_matches(|c| c == '\'' || c == '"');
    let sanitized = stripped
        .replace(' ', "_")
        .replace('$', "")
        .replace('-', "_")
        .replace('\'', "")
        .to_lowercase();
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        format!("{DIGIT_PREFIX}{sanitized}")
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("EmpID", "emp_id")]
    #[test_case("EnteredDate", "entered_date")]
    #[test_case("First Name", "first_name")]
    #[test_case("Gross Pay $", "gross_pay")]
    #[test_case("Hours%", "hours_pct")]
    #[test_case("HTTPStatus", "http_status")]
    #[test_case("Attendance2024H1", "attendance2024_h1")]
    #[test_case("  Reports-To  ", "reports_to")]
    #[test_case("401k Match", "t_401k_match")]
    #[test_case("Date", "col_date")]
    #[test_case("User", "col_user")]
    #[test_case("***", "column")]
    #[test_case("already_snake", "already_snake")]
    fn test_canonical_column_name(raw: &str, expected: &str) {
        assert_eq!(canonical_column_name(raw), expected);
    }

    #[test]
    fn test_collisions_are_suffixed() {
        let names = canonical_column_names(&["Emp ID", "EmpID", "emp_id", "Name"]);
        assert_eq!(names, vec!["emp_id", "emp_id_2", "emp_id_3", "name"]);
    }

    #[test]
    fn test_canonical_names_are_stable() {
        let once = canonical_column_name("Employment Status");
        assert_eq!(canonical_column_name(&once), once);
    }

    #[test_case("Activity_Log", "activity_log")]
    #[test_case("CRMC_PayrollFile", "crmc_payrollfile")]
    #[test_case("\"Sheet1$\"", "sheet1")]
    #[test_case("2024 Hours", "t_2024_hours")]
    fn test_sanitize_table_name(raw: &str, expected: &str) {
        assert_eq!(sanitize_table_name(raw), expected);
    }
}

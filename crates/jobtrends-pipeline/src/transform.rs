//! Normalization of raw job records into canonical form
//!
//! Pure functions only: no I/O, no shared state. Every record that does not
//! make it into canonical form is accounted for as a [`TransformSkip`], so
//! the orchestrator can report exactly what was dropped and why.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fetch::RawRecord;

/// One raw upstream record in the shape the search API emits
///
/// Every field is optional; the upstream payload is heterogeneous and the
/// salary/skills fields in particular come in several shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobRecord {
    pub job_id: Option<String>,
    pub job_title: Option<String>,
    pub employer_name: Option<String>,
    pub job_location: Option<String>,
    pub job_min_salary: Option<f64>,
    pub job_max_salary: Option<f64>,
    pub job_posted_at_datetime_utc: Option<String>,
    #[serde(default)]
    pub job_required_skills: Value,
}

/// A job posting after transform, ready for load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalJobRecord {
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary_min: f64,
    pub salary_max: f64,
    pub avg_salary: f64,
    pub date_posted: NaiveDate,
    pub skills: BTreeSet<String>,
}

/// The shape the source qualifications field arrived in
///
/// Resolved by [`SkillsField::classify`] in one place rather than ad hoc
/// shape inspection spread across the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillsField {
    /// A JSON array of skill strings
    List(Vec<String>),
    /// A single delimited string, e.g. "Python - SQL - Airflow"
    Text(String),
    /// Absent, null, or any other shape
    Absent,
}

impl SkillsField {
    /// Classify the raw qualifications value into its shape
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::Array(items) => SkillsField::List(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect(),
            ),
            Value::String(s) => SkillsField::Text(s.clone()),
            _ => SkillsField::Absent,
        }
    }

    /// Normalize into a deduplicated set of lowercase skill names
    pub fn normalize(&self) -> BTreeSet<String> {
        match self {
            SkillsField::List(items) => items.iter().filter_map(|s| clean_skill(s)).collect(),
            SkillsField::Text(s) => s.split('-').filter_map(clean_skill).collect(),
            SkillsField::Absent => BTreeSet::new(),
        }
    }
}

fn clean_skill(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// A single record dropped during transform; the batch continues
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSkip {
    /// Index of the record within its raw page
    pub index: usize,
    pub reason: String,
}

/// Result of cleaning one raw page
#[derive(Debug, Default)]
pub struct TransformOutcome {
    pub records: Vec<CanonicalJobRecord>,
    pub skips: Vec<TransformSkip>,
}

impl TransformOutcome {
    pub fn skipped(&self) -> usize {
        self.skips.len()
    }
}

/// Normalize a page of raw records into canonical records
///
/// Records are skipped (never silently dropped) when they lack an identity,
/// a parseable posting date, or both salary bounds.
pub fn clean(raw: &[RawRecord]) -> TransformOutcome {
    let mut outcome = TransformOutcome::default();

    for (index, value) in raw.iter().enumerate() {
        match clean_record(value) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => outcome.skips.push(TransformSkip { index, reason }),
        }
    }

    outcome
}

fn clean_record(value: &RawRecord) -> std::result::Result<CanonicalJobRecord, String> {
    let raw: RawJobRecord = serde_json::from_value(value.clone())
        .map_err(|e| format!("malformed record: {}", e))?;

    let job_id = match raw.job_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err("missing job_id".to_string()),
    };

    // Salary fallback policy: drop when both bounds are absent, mirror the
    // present bound when only one is filled.
    let (salary_min, salary_max) = match (raw.job_min_salary, raw.job_max_salary) {
        (None, None) => return Err("both salary bounds absent".to_string()),
        (Some(min), None) => (min, min),
        (None, Some(max)) => (max, max),
        (Some(min), Some(max)) => (min, max),
    };
    let avg_salary = (salary_min + salary_max) / 2.0;

    let date_posted = raw
        .job_posted_at_datetime_utc
        .as_deref()
        .and_then(parse_posted_date)
        .ok_or_else(|| "missing or unparseable posting timestamp".to_string())?;

    let skills = SkillsField::classify(&raw.job_required_skills).normalize();

    Ok(CanonicalJobRecord {
        job_id,
        title: raw.job_title,
        company: raw.employer_name,
        location: raw.job_location,
        salary_min,
        salary_max,
        avg_salary,
        date_posted,
        skills,
    })
}

/// Parse the upstream posting timestamp into a UTC calendar date
///
/// Accepts RFC 3339 timestamps (the usual upstream shape) and falls back to
/// a bare ISO date.
fn parse_posted_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        value
    }

    fn base_record() -> serde_json::Value {
        json!({
            "job_id": "abc123",
            "job_title": "Data Engineer",
            "employer_name": "Acme",
            "job_location": "Minneapolis, MN",
            "job_min_salary": 90000.0,
            "job_max_salary": 110000.0,
            "job_posted_at_datetime_utc": "2024-01-02T08:30:00.000Z",
            "job_required_skills": ["Python", "SQL"]
        })
    }

    #[test]
    fn test_clean_happy_path() {
        let outcome = clean(&[raw(base_record())]);
        assert_eq!(outcome.skipped(), 0);

        let rec = &outcome.records[0];
        assert_eq!(rec.job_id, "abc123");
        assert_eq!(rec.company.as_deref(), Some("Acme"));
        assert_eq!(rec.avg_salary, 100000.0);
        assert_eq!(rec.date_posted, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(
            rec.skills,
            BTreeSet::from(["python".to_string(), "sql".to_string()])
        );
    }

    #[test]
    fn test_both_salary_bounds_absent_is_dropped() {
        let mut record = base_record();
        record["job_min_salary"] = Value::Null;
        record["job_max_salary"] = Value::Null;

        let outcome = clean(&[raw(record)]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skips.len(), 1);
        assert_eq!(outcome.skips[0].reason, "both salary bounds absent");
    }

    #[test]
    fn test_single_bound_fills_the_other() {
        let mut record = base_record();
        record["job_min_salary"] = json!(50000.0);
        record["job_max_salary"] = Value::Null;

        let outcome = clean(&[raw(record)]);
        let rec = &outcome.records[0];
        assert_eq!(rec.salary_min, 50000.0);
        assert_eq!(rec.salary_max, 50000.0);
        assert_eq!(rec.avg_salary, 50000.0);
    }

    #[test]
    fn test_skills_from_list_are_trimmed_lowercased_deduped() {
        let field = SkillsField::classify(&json!(["Python ", "python", "SQL"]));
        assert_eq!(
            field.normalize(),
            BTreeSet::from(["python".to_string(), "sql".to_string()])
        );
    }

    #[test]
    fn test_skills_from_delimited_string() {
        let field = SkillsField::classify(&json!("Python - SQL - Python"));
        assert_eq!(field, SkillsField::Text("Python - SQL - Python".to_string()));
        assert_eq!(
            field.normalize(),
            BTreeSet::from(["python".to_string(), "sql".to_string()])
        );
    }

    #[test]
    fn test_skills_from_null_or_other_shapes_are_empty() {
        assert_eq!(SkillsField::classify(&Value::Null).normalize(), BTreeSet::new());
        assert_eq!(SkillsField::classify(&json!(42)).normalize(), BTreeSet::new());
        assert_eq!(
            SkillsField::classify(&json!({"nested": true})).normalize(),
            BTreeSet::new()
        );
    }

    #[test]
    fn test_missing_job_id_is_skipped() {
        let mut record = base_record();
        record["job_id"] = Value::Null;

        let outcome = clean(&[raw(record)]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skips[0].reason, "missing job_id");
    }

    #[test]
    fn test_unparseable_date_is_skipped() {
        let mut record = base_record();
        record["job_posted_at_datetime_utc"] = json!("last tuesday");

        let outcome = clean(&[raw(record)]);
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.skips[0].reason,
            "missing or unparseable posting timestamp"
        );
    }

    #[test]
    fn test_bare_date_accepted() {
        let mut record = base_record();
        record["job_posted_at_datetime_utc"] = json!("2024-03-15");

        let outcome = clean(&[raw(record)]);
        assert_eq!(
            outcome.records[0].date_posted,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_skips_are_isolated_within_a_page() {
        let mut bad = base_record();
        bad["job_min_salary"] = Value::Null;
        bad["job_max_salary"] = Value::Null;

        let outcome = clean(&[raw(base_record()), raw(bad), raw(base_record())]);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skips.len(), 1);
        assert_eq!(outcome.skips[0].index, 1);
    }
}

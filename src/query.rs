use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

/// Sentinel category value that matches every record.
pub const ALL: &str = "All";

/// How a record type exposes itself to the filter layer.
pub trait Queryable {
    /// Category fields offered as filters.
    const CATEGORIES: &'static [&'static str] = &[];

    fn id(&self) -> i64;

    /// Text fields the free-text search looks at.
    fn search_fields(&self) -> Vec<Cow<'_, str>>;

    /// Value of a named category field (e.g. "status"), if the type has one.
    fn category(&self, _field: &str) -> Option<&str> {
        None
    }

    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub search: String,
    pub categories: BTreeMap<String, String>,
    pub date: Option<NaiveDate>,
}

impl Criteria {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn category(mut self, field: &str, value: impl Into<String>) -> Self {
        self.categories.insert(field.to_string(), value.into());
        self
    }

    pub fn on(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    /// Selected value for a category field, or the "All" sentinel.
    pub fn selected(&self, field: &str) -> &str {
        self.categories.get(field).map(String::as_str).unwrap_or(ALL)
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.categories.values().all(|v| is_any(v))
            && self.date.is_none()
    }
}

fn is_any(selected: &str) -> bool {
    selected.is_empty() || selected == ALL
}

pub fn matches_text<R: Queryable + ?Sized>(record: &R, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub fn matches_category(value: Option<&str>, selected: &str) -> bool {
    is_any(selected) || value == Some(selected)
}

pub fn matches<R: Queryable + ?Sized>(record: &R, criteria: &Criteria) -> bool {
    matches_text(record, &criteria.search)
        && criteria
            .categories
            .iter()
            .all(|(field, selected)| matches_category(record.category(field), selected))
        && criteria.date.is_none_or(|date| record.date() == Some(date))
}

/// Records matching every active predicate, in collection order.
pub fn filter<'a, R, I>(records: I, criteria: &Criteria) -> Vec<&'a R>
where
    R: Queryable + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter(|record| matches(*record, criteria))
        .collect()
}

/// Choices for a category dropdown: "All", then each observed value once,
/// in first-seen order.
pub fn distinct_values<'a, R, I>(records: I, field: &str) -> Vec<String>
where
    R: Queryable + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut seen = HashSet::new();
    let mut values = vec![ALL.to_string()];
    for record in records {
        if let Some(value) = record.category(field) {
            if seen.insert(value) {
                values.push(value.to_string());
            }
        }
    }
    values
}

/// Next entry after `current` in a list of choices, wrapping around.
pub fn cycle(choices: &[String], current: &str) -> String {
    if choices.is_empty() {
        return ALL.to_string();
    }
    let next = choices
        .iter()
        .position(|c| c == current)
        .map(|i| (i + 1) % choices.len())
        .unwrap_or(0);
    choices[next].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceRecord, AttendanceStatus, LeaveRequest, LeaveStatus};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn attendance(id: i64, employee_id: i64, d: u32, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id,
            employee_id,
            employee_name: None,
            date: day(d),
            status,
        }
    }

    fn leave(id: i64, employee_id: i64, leave_type: &str, status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id,
            employee_name: None,
            leave_type: leave_type.to_string(),
            start_date: day(1),
            end_date: day(2),
            status,
        }
    }

    fn sample() -> Vec<AttendanceRecord> {
        vec![
            attendance(1, 12, 1, AttendanceStatus::Present),
            attendance(2, 7, 1, AttendanceStatus::Late),
            attendance(3, 12, 2, AttendanceStatus::Absent),
            attendance(4, 31, 2, AttendanceStatus::Present),
        ]
    }

    #[test]
    fn test_empty_criteria_returns_everything() {
        let records = sample();
        let criteria = Criteria::default()
            .search("   ")
            .category("status", ALL)
            .on(None);
        assert!(criteria.is_empty());
        assert_eq!(filter(&records, &criteria).len(), records.len());
    }

    #[test]
    fn test_empty_string_category_is_the_all_sentinel() {
        let records = sample();
        let criteria = Criteria::default().category("status", "");
        assert_eq!(filter(&records, &criteria).len(), 4);
    }

    #[test]
    fn test_search_is_trimmed_substring_on_id_text() {
        let records = sample();
        let hits = filter(&records, &Criteria::default().search(" 1 "));
        let ids: Vec<i64> = hits.iter().map(|r| r.id).collect();
        // employee 12 twice and employee 31
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let records = vec![
            leave(1, 5, "Sick", LeaveStatus::Pending),
            leave(2, 6, "Vacation", LeaveStatus::Approved),
        ];
        let hits = filter(&records, &Criteria::default().search("sIcK"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let records = sample();
        let criteria = Criteria::default()
            .search("12")
            .category("status", "Present");
        let hits = filter(&records, &criteria);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        let criteria = Criteria::default()
            .category("status", "Present")
            .on(Some(day(2)));
        let hits = filter(&records, &criteria);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 4);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let records = sample();
        assert!(filter(&records, &Criteria::default().search("zzz")).is_empty());
        assert!(filter(&records, &Criteria::default().on(Some(day(30)))).is_empty());
    }

    #[test]
    fn test_unknown_category_field_never_matches_a_concrete_value() {
        let records = sample();
        assert!(filter(&records, &Criteria::default().category("month", "May")).is_empty());
    }

    #[test]
    fn test_filter_is_subset_by_reference_and_idempotent() {
        let records = sample();
        let criteria = Criteria::default().category("status", "Present");
        let once = filter(&records, &criteria);
        for hit in &once {
            assert!(records.iter().any(|r| std::ptr::eq(r, *hit)));
        }
        let twice = filter(once.iter().copied(), &criteria);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert!(std::ptr::eq(*a, *b));
        }
    }

    #[test]
    fn test_filter_leaves_source_untouched() {
        let records = sample();
        let before = records.clone();
        let _ = filter(&records, &Criteria::default().search("7"));
        assert_eq!(records, before);
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let records = vec![
            leave(1, 5, "Sick", LeaveStatus::Pending),
            leave(2, 6, "Casual", LeaveStatus::Approved),
            leave(3, 7, "Sick", LeaveStatus::Rejected),
            leave(4, 8, "Earned", LeaveStatus::Pending),
        ];
        assert_eq!(
            distinct_values(&records, "type"),
            ["All", "Sick", "Casual", "Earned"].map(String::from).to_vec()
        );
        let empty: Vec<LeaveRequest> = Vec::new();
        assert_eq!(distinct_values(&empty, "type"), vec![ALL.to_string()]);
    }

    #[test]
    fn test_cycle_wraps_and_recovers_from_stale_value() {
        let choices: Vec<String> = ["All", "Present", "Late"].map(String::from).to_vec();
        assert_eq!(cycle(&choices, "All"), "Present");
        assert_eq!(cycle(&choices, "Late"), "All");
        assert_eq!(cycle(&choices, "Gone"), "All");
        assert_eq!(cycle(&[], "x"), ALL);
    }
}

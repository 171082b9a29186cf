use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::schema::Field;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

/// Fields pulled out of the user's text. Only keys that were actually
/// inferred are present; downstream normalization branches on presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord {
    values: BTreeMap<Field, FieldValue>,
}

impl ExtractedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.values.get(&field) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self, field: Field) -> Option<i64> {
        match self.values.get(&field) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl NormalizedDate {
    /// Returns `None` unless the triple names a real calendar day.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from)
    }

    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<NaiveDate> for NormalizedDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTime {
    pub hour: u32,
    pub minute: u32,
}

impl NormalizedTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour <= 23 && minute <= 59).then_some(Self { hour, minute })
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }
}

impl From<NaiveTime> for NormalizedTime {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
        }
    }
}

impl fmt::Display for NormalizedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A field that was extracted but could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedField {
    pub field: Field,
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Complete,
    Partial,
}

/// Pipeline output handed to the review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    pub business_name: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NormalizedDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_start_time: Option<NormalizedTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_end_time: Option<NormalizedTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub happy_hour_deal: Option<String>,
    pub resolved: BTreeSet<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<UnresolvedField>,
}

impl ConsolidatedRecord {
    /// Copies every field that needs no normalization. Returns `None` when
    /// the base record lacks a business name or event type.
    pub fn from_extracted(extracted: &ExtractedRecord) -> Option<Self> {
        let business_name = extracted.text(Field::BusinessName)?.to_string();
        let event_type = extracted.text(Field::EventType)?.to_string();

        let mut record = Self {
            business_name,
            event_type,
            event_price: extracted.integer(Field::EventPrice),
            event_date: None,
            event_start_time: None,
            event_end_time: None,
            band_name: extracted.text(Field::BandName).map(str::to_string),
            happy_hour_deal: extracted.text(Field::HappyHourDeal).map(str::to_string),
            resolved: BTreeSet::new(),
            unresolved: Vec::new(),
        };

        record.resolved.insert(Field::BusinessName);
        record.resolved.insert(Field::EventType);
        for field in [Field::EventPrice, Field::BandName, Field::HappyHourDeal] {
            if extracted.contains(field) {
                record.resolved.insert(field);
            }
        }

        Some(record)
    }

    pub fn set_date(&mut self, date: NormalizedDate) {
        self.event_date = Some(date);
        self.resolved.insert(Field::EventDate);
    }

    pub fn set_time(&mut self, field: Field, time: NormalizedTime) {
        match field {
            Field::EventStartTime => self.event_start_time = Some(time),
            Field::EventEndTime => self.event_end_time = Some(time),
            _ => return,
        }
        self.resolved.insert(field);
    }

    pub fn mark_unresolved(&mut self, field: Field, raw: &str, reason: String) {
        self.resolved.remove(&field);
        self.unresolved.push(UnresolvedField {
            field,
            raw: raw.to_string(),
            reason,
        });
    }

    pub fn is_resolved(&self, field: Field) -> bool {
        self.resolved.contains(&field)
    }

    pub fn status(&self) -> ExtractionStatus {
        if self.unresolved.is_empty() {
            ExtractionStatus::Complete
        } else {
            ExtractionStatus::Partial
        }
    }
}

/// A record after human review, ready to be appended to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceSubmission {
    pub business_name: String,
    pub event_type: String,
    #[serde(default)]
    pub event_price: Option<i64>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm")]
    pub event_start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm")]
    pub event_end_time: Option<NaiveTime>,
    #[serde(default)]
    pub band_name: Option<String>,
    #[serde(default)]
    pub happy_hour_deal: Option<String>,
}

impl ExperienceSubmission {
    pub fn validate(&self) -> Result<(), String> {
        if self.business_name.trim().is_empty() {
            return Err("business_name must not be empty".to_string());
        }
        if self.event_type.trim().is_empty() {
            return Err("event_type must not be empty".to_string());
        }
        if matches!(self.event_price, Some(p) if p < 0) {
            return Err("event_price must not be negative".to_string());
        }
        Ok(())
    }
}

impl From<&ConsolidatedRecord> for ExperienceSubmission {
    fn from(record: &ConsolidatedRecord) -> Self {
        Self {
            business_name: record.business_name.clone(),
            event_type: record.event_type.clone(),
            event_price: record.event_price,
            event_date: record.event_date.and_then(|d| d.to_naive_date()),
            event_start_time: record.event_start_time.and_then(|t| t.to_naive_time()),
            event_end_time: record.event_end_time.and_then(|t| t.to_naive_time()),
            band_name: record.band_name.clone(),
            happy_hour_deal: record.happy_hour_deal.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredExperience {
    pub id: String,
    #[serde(flatten)]
    pub experience: ExperienceSubmission,
    pub created_at: NaiveDateTime,
}

/// `HH:MM` (seconds tolerated on input) for optional clock times.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<NaiveTime> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time `{s}`, expected HH:MM"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ExtractedRecord {
        let mut record = ExtractedRecord::new();
        record.insert(Field::BusinessName, FieldValue::Text("Pop's Blue Moon".into()));
        record.insert(Field::EventType, FieldValue::Text("open mic".into()));
        record
    }

    #[test]
    fn test_normalized_date_rejects_invalid_days() {
        assert!(NormalizedDate::new(2024, 2, 29).is_some());
        assert!(NormalizedDate::new(2023, 2, 29).is_none());
        assert!(NormalizedDate::new(2023, 13, 1).is_none());
        assert!(NormalizedDate::new(2023, 4, 31).is_none());
    }

    #[test]
    fn test_normalized_time_bounds() {
        assert!(NormalizedTime::new(23, 59).is_some());
        assert!(NormalizedTime::new(24, 0).is_none());
        assert!(NormalizedTime::new(7, 60).is_none());
        assert_eq!(NormalizedTime::new(9, 5).unwrap().to_string(), "09:05");
    }

    #[test]
    fn test_consolidated_from_extracted() {
        let mut extracted = base();
        extracted.insert(Field::EventPrice, FieldValue::Integer(10));
        let record = ConsolidatedRecord::from_extracted(&extracted).unwrap();
        assert_eq!(record.event_price, Some(10));
        assert!(record.is_resolved(Field::EventPrice));
        assert!(!record.is_resolved(Field::EventDate));
        assert_eq!(record.status(), ExtractionStatus::Complete);
    }

    #[test]
    fn test_consolidated_requires_base_fields() {
        let mut extracted = ExtractedRecord::new();
        extracted.insert(Field::EventType, FieldValue::Text("trivia".into()));
        assert!(ConsolidatedRecord::from_extracted(&extracted).is_none());
    }

    #[test]
    fn test_unresolved_marks_partial_and_omits_key() {
        let mut record = ConsolidatedRecord::from_extracted(&base()).unwrap();
        record.set_time(Field::EventStartTime, NormalizedTime::new(20, 0).unwrap());
        record.mark_unresolved(Field::EventEndTime, "late-ish", "unrecognized".into());
        assert_eq!(record.status(), ExtractionStatus::Partial);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event_start_time"]["hour"], 20);
        assert!(json.get("event_end_time").is_none());
        assert_eq!(json["unresolved"][0]["field"], "event_end_time");
    }

    #[test]
    fn test_submission_from_record_and_validate() {
        let mut record = ConsolidatedRecord::from_extracted(&base()).unwrap();
        record.set_date(NormalizedDate::new(2023, 8, 4).unwrap());
        let submission = ExperienceSubmission::from(&record);
        assert_eq!(submission.event_date, NaiveDate::from_ymd_opt(2023, 8, 4));
        assert!(submission.validate().is_ok());

        let negative = ExperienceSubmission {
            event_price: Some(-5),
            ..submission
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_submission_time_format() {
        let json = r#"{"business_name":"Wheelhouse","event_type":"happy hour","event_start_time":"11:00","event_end_time":"15:00:00"}"#;
        let submission: ExperienceSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.event_start_time, NaiveTime::from_hms_opt(11, 0, 0));
        assert_eq!(submission.event_end_time, NaiveTime::from_hms_opt(15, 0, 0));
        let back = serde_json::to_value(&submission).unwrap();
        assert_eq!(back["event_end_time"], "15:00");
    }
}

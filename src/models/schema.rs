use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The closed set of keys an extraction may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    BusinessName,
    EventType,
    EventPrice,
    EventDate,
    EventStartTime,
    EventEndTime,
    BandName,
    HappyHourDeal,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::BusinessName,
        Field::EventType,
        Field::EventPrice,
        Field::EventDate,
        Field::EventStartTime,
        Field::EventEndTime,
        Field::BandName,
        Field::HappyHourDeal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::BusinessName => "business_name",
            Field::EventType => "event_type",
            Field::EventPrice => "event_price",
            Field::EventDate => "event_date",
            Field::EventStartTime => "event_start_time",
            Field::EventEndTime => "event_end_time",
            Field::BandName => "band_name",
            Field::HappyHourDeal => "happy_hour_deal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.as_str() == s)
    }

    pub fn kind(&self) -> FieldType {
        match self {
            Field::EventPrice => FieldType::Integer,
            _ => FieldType::String,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub kind: FieldType,
    pub required: bool,
}

impl FieldSpec {
    fn optional(field: Field) -> Self {
        Self {
            field,
            kind: field.kind(),
            required: false,
        }
    }

    fn required(field: Field) -> Self {
        Self {
            required: true,
            ..Self::optional(field)
        }
    }
}

/// Field descriptor used both to build the extraction prompt and to check
/// what the provider sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSchema {
    fields: Vec<FieldSpec>,
}

impl Default for ExtractionSchema {
    fn default() -> Self {
        let fields = Field::ALL
            .into_iter()
            .map(|f| match f {
                Field::BusinessName | Field::EventType => FieldSpec::required(f),
                _ => FieldSpec::optional(f),
            })
            .collect();
        Self { fields }
    }
}

impl ExtractionSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Marks an additional field as required.
    pub fn require(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|s| s.field == field) {
            Some(spec) => spec.required = true,
            None => self.fields.push(FieldSpec::required(field)),
        }
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn spec(&self, field: Field) -> Option<&FieldSpec> {
        self.fields.iter().find(|s| s.field == field)
    }

    pub fn is_required(&self, field: Field) -> bool {
        self.spec(field).map(|s| s.required).unwrap_or(false)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().filter(|s| s.required).map(|s| s.field)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, spec) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|s| s.field == spec.field) {
                return Err(format!("field {} declared twice", spec.field));
            }
            if spec.kind != spec.field.kind() {
                return Err(format!(
                    "field {} must be of type {}",
                    spec.field,
                    spec.field.kind().as_str()
                ));
            }
        }
        for field in [Field::BusinessName, Field::EventType] {
            if !self.is_required(field) {
                return Err(format!("field {field} must be declared and required"));
            }
        }
        Ok(())
    }

    /// JSON-schema-shaped description embedded in the extraction prompt.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|s| (s.field.as_str().to_string(), json!({ "type": s.kind.as_str() })))
            .collect();
        let required: Vec<&str> = self.required_fields().map(|f| f.as_str()).collect();

        json!({
            "properties": properties,
            "required": required,
        })
    }
}

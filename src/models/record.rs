use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names requested from the model, in export order.
pub mod fields {
    pub const INSERT_DATE: &str = "InsertDate";
    pub const SERIAL_NO: &str = "SerialNo";
    pub const NAME: &str = "Name";
    pub const CITY: &str = "City";
    pub const DOB: &str = "DOB";
    pub const AGE: &str = "Age";
    pub const GENDER: &str = "Gender";
    pub const LAST_QUALIFICATION: &str = "LastQualification";
    pub const LAST_INSTITUTE: &str = "LastInstitute";
    pub const LAST_DEGREE_YEAR: &str = "LastDegreeYear";
    pub const MOBILE_NUMBERS: &str = "MobileNumbers";
    pub const EMAILS: &str = "Emails";
    pub const LAST_COMPANY: &str = "LastCompany";
    pub const LAST_COMPANY_POSITION: &str = "LastCompanyPosition";
    pub const LAST_STATUS: &str = "LastStatus";
    pub const ERROR: &str = "Error";

    pub const CANDIDATE_FIELDS: [&str; 15] = [
        INSERT_DATE,
        SERIAL_NO,
        NAME,
        CITY,
        DOB,
        AGE,
        GENDER,
        LAST_QUALIFICATION,
        LAST_INSTITUTE,
        LAST_DEGREE_YEAR,
        MOBILE_NUMBERS,
        EMAILS,
        LAST_COMPANY,
        LAST_COMPANY_POSITION,
        LAST_STATUS,
    ];
}

/// Decoded model output. Keys and values are kept exactly as the model sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateRecord(Map<String, Value>);

impl CandidateRecord {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// A string field that is present and not blank.
    pub fn non_blank_str(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.non_blank_str(fields::NAME)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Stand-in row for a document whose reply could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub insert_date: NaiveDate,
    pub serial_no: u32,
    pub error: String,
}

impl ErrorRecord {
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            fields::INSERT_DATE.into(),
            Value::String(self.insert_date.format("%Y-%m-%d").to_string()),
        );
        map.insert(fields::SERIAL_NO.into(), Value::from(self.serial_no));
        map.insert(fields::ERROR.into(), Value::String(self.error.clone()));
        map
    }
}

/// One row of a batch, in serial order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchRecord {
    Candidate {
        serial_no: u32,
        record: CandidateRecord,
    },
    Error(ErrorRecord),
}

impl BatchRecord {
    pub fn serial_no(&self) -> u32 {
        match self {
            Self::Candidate { serial_no, .. } => *serial_no,
            Self::Error(e) => e.serial_no,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Key/value view used by the exporter.
    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            Self::Candidate { record, .. } => record.as_map().clone(),
            Self::Error(e) => e.to_map(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> CandidateRecord {
        match value {
            Value::Object(map) => CandidateRecord::from_map(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn name_requires_non_blank_string() {
        assert_eq!(record(json!({"Name": "Jane"})).name(), Some("Jane"));
        assert_eq!(record(json!({"Name": "   "})).name(), None);
        assert_eq!(record(json!({"Name": null})).name(), None);
        assert_eq!(record(json!({"Name": ["Jane"]})).name(), None);
        assert_eq!(record(json!({"City": "Lahore"})).name(), None);
    }

    #[test]
    fn error_record_map_has_three_fields() {
        let err = ErrorRecord {
            insert_date: NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            serial_no: 7,
            error: "Parse failed: no object".into(),
        };
        let map = err.to_map();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["InsertDate", "SerialNo", "Error"]);
        assert_eq!(map["InsertDate"], json!("2025-03-09"));
        assert_eq!(map["SerialNo"], json!(7));
    }

    #[test]
    fn candidate_keeps_key_order() {
        let rec = record(json!({"Zeta": 1, "Alpha": 2, "Mid": 3}));
        let keys: Vec<&str> = rec.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn batch_record_serial_and_kind() {
        let ok = BatchRecord::Candidate {
            serial_no: 1,
            record: CandidateRecord::default(),
        };
        let err = BatchRecord::Error(ErrorRecord {
            insert_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            serial_no: 2,
            error: "x".into(),
        });
        assert_eq!(ok.serial_no(), 1);
        assert!(!ok.is_error());
        assert_eq!(err.serial_no(), 2);
        assert!(err.is_error());
    }

    #[test]
    fn candidate_fields_are_unique() {
        let mut names = fields::CANDIDATE_FIELDS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), fields::CANDIDATE_FIELDS.len());
    }
}

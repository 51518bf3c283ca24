//! Race-data document schema.
//!
//! A race-data document is parsed straight into typed structs: anything that
//! deserializes into a [`RaceDataDocument`] and passes the cross-record checks
//! is a valid document, and nothing else is. There is no partially validated
//! intermediate form.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The input did not match the race-data schema.
///
/// This is the only validation failure kind. The detail string is meant for
/// logs; callers on the HTTP surface only ever see a generic message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid race data: {detail}")]
pub struct ValidationError {
    detail: String,
}

impl ValidationError {
    /// Create a validation error with the given detail.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// What was wrong with the input.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A complete, validated race-data upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceDataDocument {
    /// The driver profile.
    pub profile_info: ProfileInfo,
    /// Individual races, in upload order.
    pub races_data: Vec<RaceRecord>,
}

/// Driver profile block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    /// Driver display name.
    #[serde(rename = "Driver Name")]
    pub driver_name: String,
    /// Home location of the driver.
    #[serde(rename = "Location")]
    pub location: String,
    /// Pre-formatted aggregate statistics.
    #[serde(rename = "Statistics")]
    pub statistics: Statistics,
    /// Total number of races the driver has entered.
    #[serde(rename = "Total Races", deserialize_with = "deserialize_count")]
    pub total_races: u32,
}

/// Aggregate driver statistics, kept as the display strings they arrive as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Total distance driven, e.g. `"1,204 km"`.
    #[serde(rename = "Total Distance")]
    pub total_distance: String,
    /// Total drive time, e.g. `"31h"`.
    #[serde(rename = "Total Drive Hours")]
    pub total_drive_hours: String,
    /// Most frequently driven track.
    #[serde(rename = "Preferred Track")]
    pub preferred_track: String,
}

/// One race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceRecord {
    /// Identifier, unique within a document.
    pub race_id: String,
    /// Finishing position. Text, so that values like `"DNF"` survive.
    pub position: String,
    /// Race date as supplied.
    pub date: String,
    /// Race start time as supplied.
    pub time: String,
    /// Track name.
    pub track: String,
    /// Kart identifier.
    pub kart: String,
    /// Lap times in lap order.
    pub lap_times: Vec<LapTime>,
    /// Best lap time as supplied.
    pub best_time: String,
}

/// A `(lap label, lap time)` pair, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapTime(pub String, pub String);

impl LapTime {
    /// Create a lap time pair.
    #[must_use]
    pub fn new(label: impl Into<String>, time: impl Into<String>) -> Self {
        Self(label.into(), time.into())
    }

    /// The lap label, e.g. `"Lap 1"`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0
    }

    /// The recorded time text, e.g. `"00:45.123"`.
    #[must_use]
    pub fn time(&self) -> &str {
        &self.1
    }
}

impl RaceDataDocument {
    /// Find a race by its identifier.
    #[must_use]
    pub fn race(&self, race_id: &str) -> Option<&RaceRecord> {
        self.races_data.iter().find(|race| race.race_id == race_id)
    }

    /// Compute the BLAKE3 digest of the document contents.
    ///
    /// Every field is length-prefixed so that moving text between adjacent
    /// fields changes the digest.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let mut feed = |text: &str| {
            hasher.update(&(text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        };

        let profile = &self.profile_info;
        feed(&profile.driver_name);
        feed(&profile.location);
        feed(&profile.statistics.total_distance);
        feed(&profile.statistics.total_drive_hours);
        feed(&profile.statistics.preferred_track);
        feed(&profile.total_races.to_string());

        for race in &self.races_data {
            feed(&race.race_id);
            feed(&race.position);
            feed(&race.date);
            feed(&race.time);
            feed(&race.track);
            feed(&race.kart);
            feed(&race.lap_times.len().to_string());
            for lap in &race.lap_times {
                feed(lap.label());
                feed(lap.time());
            }
            feed(&race.best_time);
        }

        hasher.finalize().to_hex().to_string()
    }

    fn check_unique_race_ids(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.races_data.len());
        for race in &self.races_data {
            if !seen.insert(race.race_id.as_str()) {
                return Err(ValidationError::new(format!(
                    "duplicate race_id '{}'",
                    race.race_id
                )));
            }
        }
        Ok(())
    }
}

/// Validate an untyped JSON value into a [`RaceDataDocument`].
///
/// Unknown keys are dropped. `Total Races` may be given as a number or as a
/// string holding an integer; no other coercion happens.
///
/// # Errors
///
/// Returns a [`ValidationError`] if any required field is missing, has the
/// wrong type, or if two races share a `race_id`.
pub fn validate(value: &Value) -> Result<RaceDataDocument, ValidationError> {
    let document = RaceDataDocument::deserialize(value)?;
    document.check_unique_race_ids()?;
    Ok(document)
}

/// Validate raw JSON bytes into a [`RaceDataDocument`].
///
/// Malformed JSON is reported as a [`ValidationError`] like any other shape
/// mismatch.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the bytes are not JSON or the JSON does
/// not match the schema.
pub fn validate_slice(bytes: &[u8]) -> Result<RaceDataDocument, ValidationError> {
    let value: Value = serde_json::from_slice(bytes)?;
    validate(&value)
}

/// Read a race-data file and validate its contents.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file can't be read and
/// [`crate::Error::Validation`] if its contents are not a valid document.
pub fn load_document(path: impl AsRef<Path>) -> crate::Result<RaceDataDocument> {
    let bytes = std::fs::read(path.as_ref())?;
    Ok(validate_slice(&bytes)?)
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(CountVisitor)
}

struct CountVisitor;

impl Visitor<'_> for CountVisitor {
    type Value = u32;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a string containing one")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
        u32::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
        u32::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::float_cmp
    )]
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u32, E> {
        // JSON has one number type, so `5.0` is the same count as `5`.
        if v.is_finite() && v.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&v) {
            Ok(v as u32)
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
        v.trim()
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_value() -> Value {
        json!({
            "profile_info": {
                "Driver Name": "J. Doe",
                "Location": "Leeds",
                "Statistics": {
                    "Total Distance": "1,204 km",
                    "Total Drive Hours": "31h",
                    "Preferred Track": "TeamSport Leeds"
                },
                "Total Races": 42
            },
            "races_data": [
                {
                    "race_id": "race1",
                    "position": "1",
                    "date": "2024-03-10",
                    "time": "14:05",
                    "track": "TeamSport Leeds",
                    "kart": "7",
                    "lap_times": [["Lap 1", "00:45.123"], ["Lap 2", "00:44.998"]],
                    "best_time": "00:44.998"
                }
            ]
        })
    }

    fn remove_at(value: &mut Value, path: &[&str]) {
        let (last, parents) = path.split_last().unwrap();
        let mut cursor = value;
        for key in parents {
            cursor = match key.parse::<usize>() {
                Ok(index) => &mut cursor[index],
                Err(_) => &mut cursor[*key],
            };
        }
        cursor.as_object_mut().unwrap().remove(*last).unwrap();
    }

    fn set_at(value: &mut Value, pointer: &str, new: Value) {
        *value.pointer_mut(pointer).unwrap() = new;
    }

    #[test]
    fn test_validate_sample() {
        let doc = validate(&sample_value()).unwrap();

        assert_eq!(doc.profile_info.driver_name, "J. Doe");
        assert_eq!(doc.profile_info.total_races, 42);
        assert_eq!(doc.profile_info.statistics.preferred_track, "TeamSport Leeds");
        assert_eq!(doc.races_data.len(), 1);

        let race = &doc.races_data[0];
        assert_eq!(race.race_id, "race1");
        assert_eq!(
            race.lap_times,
            vec![
                LapTime::new("Lap 1", "00:45.123"),
                LapTime::new("Lap 2", "00:44.998"),
            ]
        );
        assert_eq!(race.best_time, "00:44.998");
    }

    #[test]
    fn test_validate_is_not_lossy() {
        let doc = validate(&sample_value()).unwrap();
        let reencoded = serde_json::to_value(&doc).unwrap();

        assert_eq!(reencoded, sample_value());
        assert_eq!(validate(&reencoded).unwrap(), doc);
    }

    #[test]
    fn test_missing_any_required_field_fails() {
        let paths: &[&[&str]] = &[
            &["profile_info"],
            &["races_data"],
            &["profile_info", "Driver Name"],
            &["profile_info", "Location"],
            &["profile_info", "Statistics"],
            &["profile_info", "Statistics", "Total Distance"],
            &["profile_info", "Statistics", "Total Drive Hours"],
            &["profile_info", "Statistics", "Preferred Track"],
            &["profile_info", "Total Races"],
            &["races_data", "0", "race_id"],
            &["races_data", "0", "position"],
            &["races_data", "0", "date"],
            &["races_data", "0", "time"],
            &["races_data", "0", "track"],
            &["races_data", "0", "kart"],
            &["races_data", "0", "lap_times"],
            &["races_data", "0", "best_time"],
        ];

        for path in paths {
            let mut value = sample_value();
            remove_at(&mut value, path);
            assert!(validate(&value).is_err(), "accepted document without {path:?}");
        }
    }

    #[test]
    fn test_wrong_primitive_type_fails() {
        let cases = [
            ("/profile_info/Driver Name", json!(7)),
            ("/profile_info/Statistics", json!("lots")),
            ("/races_data", json!({})),
            ("/races_data/0/position", json!(1)),
            ("/races_data/0/kart", Value::Null),
            ("/races_data/0/lap_times", json!("Lap 1")),
        ];

        for (pointer, replacement) in cases {
            let mut value = sample_value();
            set_at(&mut value, pointer, replacement);
            assert!(validate(&value).is_err(), "accepted bad value at {pointer}");
        }
    }

    #[test]
    fn test_non_object_input_fails() {
        assert!(validate(&json!(null)).is_err());
        assert!(validate(&json!([])).is_err());
        assert!(validate(&json!("race data")).is_err());
    }

    #[test]
    fn test_total_races_numeric_string_is_parsed() {
        let mut value = sample_value();
        set_at(&mut value, "/profile_info/Total Races", json!(" 17 "));

        let doc = validate(&value).unwrap();
        assert_eq!(doc.profile_info.total_races, 17);
    }

    #[test]
    fn test_total_races_non_integer_string_fails() {
        for bad in ["abc", "", "1.5", "-3", "12 races"] {
            let mut value = sample_value();
            set_at(&mut value, "/profile_info/Total Races", json!(bad));
            assert!(validate(&value).is_err(), "accepted Total Races {bad:?}");
        }
    }

    #[test]
    fn test_total_races_number_forms() {
        let mut value = sample_value();
        set_at(&mut value, "/profile_info/Total Races", json!(5.0));
        assert_eq!(validate(&value).unwrap().profile_info.total_races, 5);

        for bad in [json!(5.5), json!(-1), json!(true), json!(u64::MAX)] {
            let mut value = sample_value();
            set_at(&mut value, "/profile_info/Total Races", bad.clone());
            assert!(validate(&value).is_err(), "accepted Total Races {bad}");
        }
    }

    #[test]
    fn test_lap_time_must_be_string_pair() {
        let cases = [
            json!([["Lap 1"]]),
            json!([["Lap 1", "00:45.123", "extra"]]),
            json!([["Lap 1", 45.123]]),
            json!([[1, "00:45.123"]]),
            json!([{"lap": "Lap 1", "time": "00:45.123"}]),
        ];

        for lap_times in cases {
            let mut value = sample_value();
            set_at(&mut value, "/races_data/0/lap_times", lap_times.clone());
            assert!(validate(&value).is_err(), "accepted lap_times {lap_times}");
        }
    }

    #[test]
    fn test_position_accepts_non_numeric_text() {
        let mut value = sample_value();
        set_at(&mut value, "/races_data/0/position", json!("DNF"));

        let doc = validate(&value).unwrap();
        assert_eq!(doc.races_data[0].position, "DNF");
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let mut value = sample_value();
        value["uploaded_by"] = json!("someone");
        value["races_data"][0]["weather"] = json!("wet");

        let doc = validate(&value).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), sample_value());
    }

    #[test]
    fn test_empty_races_data_is_valid() {
        let mut value = sample_value();
        set_at(&mut value, "/races_data", json!([]));

        let doc = validate(&value).unwrap();
        assert!(doc.races_data.is_empty());
    }

    #[test]
    fn test_duplicate_race_id_fails() {
        let mut value = sample_value();
        let race = value["races_data"][0].clone();
        value["races_data"].as_array_mut().unwrap().push(race);

        let err = validate(&value).unwrap_err();
        assert!(err.detail().contains("race1"));
    }

    #[test]
    fn test_one_bad_race_rejects_whole_document() {
        let mut value = sample_value();
        let mut second = value["races_data"][0].clone();
        second["race_id"] = json!("race2");
        second.as_object_mut().unwrap().remove("best_time");
        value["races_data"].as_array_mut().unwrap().push(second);

        assert!(validate(&value).is_err());
    }

    #[test]
    fn test_validate_slice() {
        let bytes = serde_json::to_vec(&sample_value()).unwrap();
        let doc = validate_slice(&bytes).unwrap();
        assert_eq!(doc, validate(&sample_value()).unwrap());
    }

    #[test]
    fn test_validate_slice_malformed_json() {
        assert!(validate_slice(b"{\"profile_info\": ").is_err());
        assert!(validate_slice(b"").is_err());
        assert!(validate_slice(b"not json").is_err());
    }

    #[test]
    fn test_load_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("races.json");
        std::fs::write(&path, serde_json::to_vec(&sample_value()).unwrap()).unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc, validate(&sample_value()).unwrap());
    }

    #[test]
    fn test_load_document_invalid_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("races.json");
        std::fs::write(&path, b"{\"profile_info\": {}}").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_load_document_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_document(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
        assert!(!err.is_validation_error());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("missing field `kart`");
        assert_eq!(err.detail(), "missing field `kart`");
        assert_eq!(err.to_string(), "invalid race data: missing field `kart`");
    }

    #[test]
    fn test_race_lookup() {
        let doc = validate(&sample_value()).unwrap();
        assert!(doc.race("race1").is_some());
        assert!(doc.race("race9").is_none());
    }

    #[test]
    fn test_digest_is_stable() {
        let a = validate(&sample_value()).unwrap();
        let b = validate(&sample_value()).unwrap();

        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = validate(&sample_value()).unwrap();
        let mut b = a.clone();
        b.races_data[0].lap_times[1] = LapTime::new("Lap 2", "00:44.999");

        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_separates_fields() {
        let a = validate(&sample_value()).unwrap();
        let mut b = a.clone();
        b.profile_info.driver_name = "J. Do".to_string();
        b.profile_info.location = "eLeeds".to_string();

        assert_ne!(a.digest(), b.digest());
    }
}

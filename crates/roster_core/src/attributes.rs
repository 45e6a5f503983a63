//! Player attribute records and the short ↔ readable attribute vocabulary.
//!
//! Roster data carries two parallel vocabularies for the same attribute: a
//! compact code used by the save file and weight sheets (`SPD`) and the
//! label shown to users and used inside formulas (`Speed`). Both directions
//! of [`AttributeNameMap`] are materialized once at construction.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Record key holding the player's position code.
pub const POSITION_KEY: &str = "PositionName";
/// Record key holding the archetype name.
pub const ARCHETYPE_KEY: &str = "Archetype";
/// Record key holding the archetype id as stored in the roster file.
pub const ARCHETYPE_ID_KEY: &str = "PLTY";
/// Record key holding the overall rating.
pub const OVERALL_KEY: &str = "Overall";

/// A single scalar value of a player record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Missing,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Lenient numeric coercion: numbers stay, numeric text parses, anything
    /// else becomes NaN. Booleans count as 0/1.
    pub fn to_number(&self) -> f64 {
        match self {
            AttrValue::Integer(i) => *i as f64,
            AttrValue::Number(n) => *n,
            AttrValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            AttrValue::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            AttrValue::Missing => f64::NAN,
        }
    }

    /// Integer rating used by the weighted scorers.
    ///
    /// Fractional numbers truncate toward zero. Non-finite numbers, text
    /// that is not an integer literal and missing values read as 0.
    pub fn as_rating(&self) -> i64 {
        match self {
            AttrValue::Integer(i) => *i,
            AttrValue::Number(n) if n.is_finite() => n.trunc() as i64,
            AttrValue::Number(_) => 0,
            AttrValue::Bool(b) => *b as i64,
            AttrValue::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
            AttrValue::Missing => 0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, AttrValue::Missing)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Missing => write!(f, "-"),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Integer(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// One player's attribute record, keyed by readable name (plus raw codes for
/// unmapped fields such as `PLTY`). Fields keep their insertion order, which
/// is also the JSON key order on both read and write.
#[derive(Debug, Clone, Default)]
pub struct PlayerRecord {
    fields: Vec<(String, AttrValue)>,
    index: HashMap<String, usize>,
}

impl PlayerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.index.get(key).map(|&i| &self.fields[i].1)
    }

    /// Overwrites in place; a new key goes last.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&i) => self.fields[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.fields.len());
                self.fields.push((key, value));
            }
        }
    }

    /// Builder-style [`PlayerRecord::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.fields.iter().map(|(key, value)| (key, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Integer rating stored under `key`, 0 when absent or non-numeric.
    pub fn rating(&self, key: &str) -> i64 {
        self.get(key).map(AttrValue::as_rating).unwrap_or(0)
    }

    /// Non-empty text stored under `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_text).filter(|s| !s.is_empty())
    }

    pub fn position(&self) -> Option<&str> {
        self.text(POSITION_KEY)
    }

    pub fn archetype(&self) -> Option<&str> {
        self.text(ARCHETYPE_KEY)
    }
}

/// Same fields and values, in any order.
impl PartialEq for PlayerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for PlayerRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

impl Serialize for PlayerRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = PlayerRecord;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of attribute names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut record = PlayerRecord::new();
        while let Some((key, value)) = access.next_entry::<String, AttrValue>()? {
            record.set(key, value);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for PlayerRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Bijection between short attribute codes and readable names.
#[derive(Debug, Clone, Default)]
pub struct AttributeNameMap {
    short_to_readable: HashMap<String, String>,
    readable_to_short: HashMap<String, String>,
}

impl AttributeNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(short, readable)` pairs. Later pairs replace earlier ones
    /// that reuse either side, so the map stays one-to-one.
    pub fn from_pairs<I, S, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, R)>,
        S: Into<String>,
        R: Into<String>,
    {
        let mut map = Self::new();
        for (short, readable) in pairs {
            map.insert(short, readable);
        }
        map
    }

    pub fn insert(&mut self, short: impl Into<String>, readable: impl Into<String>) {
        let short = short.into();
        let readable = readable.into();

        if let Some(old_readable) = self.short_to_readable.remove(&short) {
            self.readable_to_short.remove(&old_readable);
        }
        if let Some(old_short) = self.readable_to_short.remove(&readable) {
            self.short_to_readable.remove(&old_short);
        }

        self.short_to_readable.insert(short.clone(), readable.clone());
        self.readable_to_short.insert(readable, short);
    }

    pub fn to_readable(&self, short: &str) -> Option<&str> {
        self.short_to_readable.get(short).map(String::as_str)
    }

    pub fn to_short(&self, readable: &str) -> Option<&str> {
        self.readable_to_short.get(readable).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.short_to_readable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short_to_readable.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_truncates_and_defaults() {
        assert_eq!(AttrValue::Integer(90).as_rating(), 90);
        assert_eq!(AttrValue::Number(85.9).as_rating(), 85);
        assert_eq!(AttrValue::Number(f64::NAN).as_rating(), 0);
        assert_eq!(AttrValue::Text(" 77 ".into()).as_rating(), 77);
        assert_eq!(AttrValue::Text("77.5".into()).as_rating(), 0);
        assert_eq!(AttrValue::Text("fast".into()).as_rating(), 0);
        assert_eq!(AttrValue::Bool(true).as_rating(), 1);
        assert_eq!(AttrValue::Missing.as_rating(), 0);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(AttrValue::Text("82".into()).to_number(), 82.0);
        assert!(AttrValue::Text("QB_Scrambler".into()).to_number().is_nan());
        assert!(AttrValue::Missing.to_number().is_nan());
    }

    #[test]
    fn test_record_json_shape() {
        let record: PlayerRecord = serde_json::from_str(
            r#"{"PositionName": "QB", "Speed": 90, "Awareness": 71.5, "Injury": null}"#,
        )
        .unwrap();

        assert_eq!(record.position(), Some("QB"));
        assert_eq!(record.get("Speed"), Some(&AttrValue::Integer(90)));
        assert_eq!(record.get("Awareness"), Some(&AttrValue::Number(71.5)));
        assert_eq!(record.get("Injury"), Some(&AttrValue::Missing));
        assert_eq!(record.rating("Missing Key"), 0);
    }

    #[test]
    fn test_record_keeps_field_order() {
        let json = r#"{"Last Name":"Passer","PositionName":"QB","Speed":90,"Archetype":"QB_Scrambler","PLTY":3}"#;
        let mut record: PlayerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&record).unwrap(), json);

        record.set("Speed", 91);
        record.set("Overall", 80);
        let keys: Vec<&str> = record.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["Last Name", "PositionName", "Speed", "Archetype", "PLTY", "Overall"]);
        assert_eq!(record.get("Speed"), Some(&AttrValue::Integer(91)));

        let reordered = PlayerRecord::new()
            .with("PLTY", 3)
            .with("Archetype", "QB_Scrambler")
            .with("Speed", 91)
            .with("PositionName", "QB")
            .with("Last Name", "Passer")
            .with("Overall", 80);
        assert_eq!(record, reordered);
    }

    #[test]
    fn test_name_map_stays_bijective() {
        let mut map = AttributeNameMap::from_pairs([("SPD", "Speed"), ("AGI", "Agility")]);
        assert_eq!(map.to_readable("SPD"), Some("Speed"));
        assert_eq!(map.to_short("Agility"), Some("AGI"));

        map.insert("SPE", "Speed");
        assert_eq!(map.to_short("Speed"), Some("SPE"));
        assert_eq!(map.to_readable("SPD"), None);
        assert_eq!(map.len(), 2);
    }
}

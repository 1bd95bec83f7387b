//! Wire shapes of the resolution engine's JSON output.
//!
//! Field names follow the engine verbatim. Fields this crate does not know
//! about are kept in `extra`. Responses are written from [`EngineRecord`],
//! which keeps the engine's own JSON so omitted keys stay omitted.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// A schema-checked engine record that serializes as the exact JSON the
/// engine produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRecord {
    parsed: GeocodeResult,
    raw: Value,
}

impl EngineRecord {
    /// # Errors
    ///
    /// Returns the deserialization error when `raw` does not match
    /// [`GeocodeResult`].
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let parsed = GeocodeResult::deserialize(&raw)?;
        Ok(Self { parsed, raw })
    }

    #[must_use]
    pub fn record(&self) -> &GeocodeResult {
        &self.parsed
    }
}

impl Serialize for EngineRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// One engine record: the query it answers and its best candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub query: QueryEcho,
    pub result: AddressCandidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEcho {
    pub input: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single resolved address. Every administrative component is optional
/// because a match can stop at any level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub output: String,
    #[serde(default)]
    pub others: Vec<String>,
    /// Kept as a JSON number so integers and floats echo back unchanged.
    pub score: Number,
    pub match_level: String,
    pub coordinate_level: String,
    pub lat: Option<Number>,
    pub lon: Option<Number>,

    pub lg_code: Option<String>,
    pub machiaza_id: Option<String>,
    pub rsdt_addr_flg: Option<i64>,
    pub blk_id: Option<String>,
    pub rsdt_id: Option<String>,
    pub rsdt2_id: Option<String>,
    pub prc_id: Option<String>,

    pub pref: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub ward: Option<String>,
    pub oaza_cho: Option<String>,
    pub chome: Option<String>,
    pub koaza: Option<String>,
    pub blk_num: Option<String>,
    pub rsdt_num: Option<String>,
    pub rsdt_num2: Option<String>,
    pub prc_num1: Option<String>,
    pub prc_num2: Option<String>,
    pub prc_num3: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AddressCandidate {
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score.as_f64().unwrap_or_default()
    }

    /// Both coordinates, when the engine resolved a point.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.lat.as_ref()?.as_f64()?;
        let lon = self.lon.as_ref()?.as_f64()?;
        Some((lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kioicho() -> Value {
        json!({
            "query": { "input": "東京都千代田区紀尾井町1-3" },
            "result": {
                "output": "東京都千代田区紀尾井町1-3",
                "others": [],
                "score": 1,
                "match_level": "residential_detail",
                "coordinate_level": "residential_detail",
                "lat": 35.679107,
                "lon": 139.7367,
                "lg_code": "131016",
                "machiaza_id": "0056000",
                "rsdt_addr_flg": 1,
                "blk_id": "001",
                "rsdt_id": "003",
                "rsdt2_id": null,
                "prc_id": null,
                "pref": "東京都",
                "county": null,
                "city": "千代田区",
                "ward": null,
                "oaza_cho": "紀尾井町",
                "chome": null,
                "koaza": null,
                "blk_num": "1",
                "rsdt_num": "3",
                "rsdt_num2": null,
                "prc_num1": null,
                "prc_num2": null,
                "prc_num3": null
            }
        })
    }

    #[test]
    fn full_record_reserializes_verbatim() {
        let raw = kioicho();
        let parsed: GeocodeResult = serde_json::from_value(raw.clone()).expect("record");
        assert_eq!(parsed.result.pref.as_deref(), Some("東京都"));
        assert_eq!(parsed.result.rsdt_addr_flg, Some(1));
        assert!((parsed.result.score() - 1.0).abs() < f64::EPSILON);
        assert_eq!(serde_json::to_value(&parsed).expect("serialize"), raw);
    }

    #[test]
    fn unknown_fields_pass_through() {
        let mut raw = kioicho();
        raw["result"]["machiaza_name_kana"] = json!("キオイチョウ");
        raw["query"]["debug"] = json!(true);
        let parsed: GeocodeResult = serde_json::from_value(raw.clone()).expect("record");
        assert_eq!(
            parsed.result.extra.get("machiaza_name_kana"),
            Some(&json!("キオイチョウ"))
        );
        assert_eq!(serde_json::to_value(&parsed).expect("serialize"), raw);
    }

    #[test]
    fn coordinates_require_both_axes() {
        let mut raw = kioicho();
        let parsed: GeocodeResult = serde_json::from_value(raw.clone()).expect("record");
        assert!(parsed.result.coordinates().is_some());

        raw["result"]["lon"] = Value::Null;
        let parsed: GeocodeResult = serde_json::from_value(raw).expect("record");
        assert!(parsed.result.coordinates().is_none());
    }

    #[test]
    fn missing_required_field_fails() {
        let mut raw = kioicho();
        raw["result"]
            .as_object_mut()
            .expect("object")
            .remove("match_level");
        assert!(serde_json::from_value::<GeocodeResult>(raw).is_err());
    }

    #[test]
    fn engine_record_keeps_omitted_keys_omitted() {
        let mut raw = kioicho();
        let result = raw["result"].as_object_mut().expect("object");
        result.remove("county");
        result.remove("prc_num3");
        let record = EngineRecord::from_value(raw.clone()).expect("record");

        assert_eq!(record.record().result.county, None);
        let written = serde_json::to_value(&record).expect("serialize");
        assert!(written["result"].get("county").is_none());
        assert_eq!(written["result"]["ward"], Value::Null);
        assert_eq!(written, raw);
    }

    #[test]
    fn engine_record_rejects_schema_mismatch() {
        let mut raw = kioicho();
        raw["result"]["score"] = json!("high");
        assert!(EngineRecord::from_value(raw).is_err());
    }

    #[test]
    fn absent_others_defaults_to_empty() {
        let mut raw = kioicho();
        raw["result"].as_object_mut().expect("object").remove("others");
        let parsed: GeocodeResult = serde_json::from_value(raw).expect("record");
        assert!(parsed.result.others.is_empty());
    }
}

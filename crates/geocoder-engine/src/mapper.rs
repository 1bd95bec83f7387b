//! Shapes the engine's stdout into at most one [`EngineRecord`].
//!
//! The engine is the only ranking authority: the record at index 0 of its
//! output array is returned verbatim and the rest are dropped.

use geocoder_core::EngineRecord;
use serde_json::Value;

use crate::error::EngineError;

/// Parse engine stdout and return its top-ranked record.
///
/// Every record in the array must match the schema, not just the first; a
/// partially conforming array means the engine and gateway disagree on the
/// contract.
///
/// # Errors
///
/// Returns [`EngineError::Malformed`] when stdout is not JSON, is not an
/// array, or contains a record that does not match
/// [`geocoder_core::GeocodeResult`].
pub fn select_top_result(stdout: &str) -> Result<Option<EngineRecord>, EngineError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty output"));
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    let Value::Array(records) = value else {
        return Err(malformed(format!(
            "expected a JSON array, found {}",
            json_type_name(&value)
        )));
    };

    let mut parsed = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            EngineRecord::from_value(record)
                .map_err(|e| malformed(format!("record {index}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if parsed.len() > 1 {
        tracing::debug!(
            candidates = parsed.len(),
            "engine returned several records; keeping the first"
        );
    }

    Ok(if parsed.is_empty() {
        None
    } else {
        Some(parsed.swap_remove(0))
    })
}

fn malformed(reason: impl Into<String>) -> EngineError {
    EngineError::Malformed {
        reason: reason.into(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(input: &str, output: &str, score: f64) -> Value {
        json!({
            "query": { "input": input },
            "result": {
                "output": output,
                "others": [],
                "score": score,
                "match_level": "machiaza_detail",
                "coordinate_level": "machiaza_detail",
                "lat": 35.6,
                "lon": 139.7,
                "lg_code": "131016",
                "machiaza_id": null,
                "rsdt_addr_flg": 0,
                "blk_id": null,
                "rsdt_id": null,
                "rsdt2_id": null,
                "prc_id": null,
                "pref": "東京都",
                "county": null,
                "city": "千代田区",
                "ward": null,
                "oaza_cho": "紀尾井町",
                "chome": null,
                "koaza": null,
                "blk_num": null,
                "rsdt_num": null,
                "rsdt_num2": null,
                "prc_num1": null,
                "prc_num2": null,
                "prc_num3": null
            }
        })
    }

    fn assert_malformed(result: Result<Option<EngineRecord>, EngineError>, needle: &str) {
        match result {
            Err(EngineError::Malformed { reason }) => {
                assert!(reason.contains(needle), "reason {reason:?} lacks {needle:?}");
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn empty_array_is_no_match() {
        assert_eq!(select_top_result("[]\n").expect("valid"), None);
    }

    #[test]
    fn first_record_wins_even_with_lower_score() {
        let out = json!([
            record("紀尾井町", "東京都千代田区紀尾井町", 0.5),
            record("紀尾井町", "東京都千代田区紀尾井町一丁目", 0.9),
        ])
        .to_string();
        let top = select_top_result(&out).expect("valid").expect("one record");
        assert_eq!(top.record().result.output, "東京都千代田区紀尾井町");
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert_malformed(select_top_result("not json"), "invalid JSON");
    }

    #[test]
    fn object_instead_of_array_is_malformed() {
        let out = record("a", "b", 1.0).to_string();
        assert_malformed(select_top_result(&out), "found object");
    }

    #[test]
    fn empty_output_is_malformed() {
        assert_malformed(select_top_result("  \n"), "empty output");
    }

    #[test]
    fn non_conforming_later_record_is_malformed() {
        let out = json!([record("a", "b", 1.0), {"query": {}}]).to_string();
        assert_malformed(select_top_result(&out), "record 1");
    }

    #[test]
    fn trailing_garbage_is_malformed() {
        assert_malformed(select_top_result("[] trailing"), "invalid JSON");
    }
}

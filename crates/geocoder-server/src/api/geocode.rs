use axum::{body::Bytes, extract::State, Extension};
use geocoder_core::{AddressCandidate, GeocodeQuery};

use super::{AppState, ResponseEnvelope};
use crate::middleware::RequestId;

/// `POST /geocode`: validate, run the engine once, return its top record.
///
/// Validation failures return before the engine is touched.
pub(super) async fn geocode(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> ResponseEnvelope {
    let query = match GeocodeQuery::from_body(&body) {
        Ok(query) => query,
        Err(err) => {
            tracing::info!(request_id = %req_id.0, error = %err, "rejected geocode request");
            return ResponseEnvelope::invalid_request(&err);
        }
    };

    let address_chars = query.as_str().chars().count();
    match geocoder_engine::geocode(state.resolver.as_ref(), &query).await {
        Ok(result) => {
            let candidate = result.as_ref().map(|r| &r.record().result);
            tracing::info!(
                request_id = %req_id.0,
                address_chars,
                matched = candidate.is_some(),
                score = ?candidate.map(AddressCandidate::score),
                located = candidate.and_then(AddressCandidate::coordinates).is_some(),
                "geocode request served"
            );
            ResponseEnvelope::success(result)
        }
        Err(err) => {
            tracing::error!(
                request_id = %req_id.0,
                kind = %err.kind(),
                error = %err,
                "geocode request failed"
            );
            ResponseEnvelope::engine_failure(&err)
        }
    }
}

pub mod error;
pub mod invoker;
pub mod mapper;

use geocoder_core::{EngineRecord, GeocodeQuery};

pub use error::{EngineError, FailureKind};
pub use invoker::{AbrgInvoker, EngineSettings, Resolve};
pub use mapper::select_top_result;

/// Run one query through the engine and keep only its top-ranked record.
///
/// # Errors
///
/// Returns [`EngineError`] when the engine times out, fails, or emits
/// output that does not match the record schema.
pub async fn geocode(
    resolver: &dyn Resolve,
    query: &GeocodeQuery,
) -> Result<Option<EngineRecord>, EngineError> {
    let stdout = resolver.resolve(query).await?;
    select_top_result(&stdout)
}

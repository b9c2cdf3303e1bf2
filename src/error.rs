use thiserror::Error;

/// Error kinds for the refresh pipeline.
///
/// The orchestrator treats source-side failures (`SourceUnavailable`,
/// `SourceFormat`, `IdentifierExtraction`) as per-item problems: log the
/// offending id and keep sweeping. Store failures abort the current job
/// invocation and surface to whatever triggered it.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source returned HTTP {status} for {url}")]
    SourceUnavailable { status: u16, url: String },

    #[error("source request failed for {url}: {source}")]
    SourceRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("source response for {endpoint}: {context}")]
    SourceFormat { endpoint: String, context: String },

    #[error("no id for keyword '{keyword}' in reference '{reference}'")]
    IdentifierExtraction { keyword: String, reference: String },

    #[error("no calendar weeks available")]
    NoScheduleData,

    #[error("uniqueness conflict on {entity} key {key}")]
    StoreConflict { entity: &'static str, key: String },

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl IngestError {
    /// Whether a fetch-and-reconcile loop may skip this item and continue.
    pub fn is_item_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::SourceUnavailable { .. }
                | IngestError::SourceRequest { .. }
                | IngestError::SourceFormat { .. }
                | IngestError::IdentifierExtraction { .. }
        )
    }
}

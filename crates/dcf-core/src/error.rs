use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcfError {
    #[error("Invalid assumption: {field} — {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error("Empty forecast: forecast_years must be at least 1 (got {years})")]
    EmptyForecast { years: i32 },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Upstream data unavailable: {0}")]
    UpstreamDataUnavailable(String),

    #[error("Numeric overflow: {context} is outside the decimal range")]
    Overflow { context: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DcfError {
    /// True for errors raised because the assumptions sit outside the
    /// valid valuation domain, or drive the result past what a decimal holds.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            DcfError::InvalidAssumption { .. }
                | DcfError::EmptyForecast { .. }
                | DcfError::Overflow { .. }
        )
    }
}

impl From<serde_json::Error> for DcfError {
    fn from(e: serde_json::Error) -> Self {
        DcfError::SerializationError(e.to_string())
    }
}

use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn valuate_dcf(input_json: String) -> NapiResult<String> {
    let input: dcf_core::valuation::dcf::DcfInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf_core::valuation::dcf::calculate_dcf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn free_cash_flow(snapshot_json: String) -> NapiResult<String> {
    let snapshot: dcf_core::valuation::fcf::FinancialSnapshot =
        serde_json::from_str(&snapshot_json).map_err(to_napi_error)?;
    let output =
        dcf_core::valuation::fcf::derive_free_cash_flow(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sensitivity
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_analysis(input_json: String) -> NapiResult<String> {
    let input: dcf_core::scenarios::sensitivity::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        dcf_core::scenarios::sensitivity::run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

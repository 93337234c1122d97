use dcf_core::time_value;
use dcf_core::types::Currency;
use dcf_core::valuation::{dcf, fcf};
use dcf_core::DcfError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

fn assert_rel_close(actual: Decimal, expected: Decimal) {
    let tol = dec!(0.000000001);
    let diff = (actual - expected).abs();
    let scale = expected.abs().max(Decimal::ONE);
    assert!(
        diff <= tol * scale,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

// ===========================================================================
// Valuation engine
// ===========================================================================

#[test]
fn test_reference_scenario() {
    // 100 FCF, 5% growth, 10% discount, 10 years, 2% terminal growth
    let v = dcf::valuate(dec!(100), dec!(5), dec!(10), 10, dec!(2)).unwrap();

    assert_eq!(v.cash_flows[0], dec!(105));
    assert!((v.present_values[0] - dec!(95.4545)).abs() < dec!(0.0001));

    let first_five: Decimal = v.present_values.iter().take(5).copied().sum();
    assert!(v.total_pv > Decimal::ZERO);
    assert!(v.total_pv > first_five);
}

#[test]
fn test_series_lengths_match_horizon() {
    for years in [1, 2, 5, 10, 20] {
        let v = dcf::valuate(dec!(250), dec!(3), dec!(9), years, dec!(2.5)).unwrap();
        assert_eq!(v.cash_flows.len(), years as usize);
        assert_eq!(v.present_values.len(), years as usize);
    }
}

#[test]
fn test_positive_growth_strictly_increasing() {
    let v = dcf::valuate(dec!(100), dec!(0.5), dec!(8), 15, dec!(1)).unwrap();
    for w in v.cash_flows.windows(2) {
        assert!(w[1] > w[0], "{} should exceed {}", w[1], w[0]);
    }
}

#[test]
fn test_present_values_are_discounted_cash_flows() {
    let v = dcf::valuate(dec!(100), dec!(7), dec!(11.5), 12, dec!(3)).unwrap();
    let one_plus_d = dec!(1.115);
    for (i, (cf, pv)) in v.cash_flows.iter().zip(&v.present_values).enumerate() {
        let expected = *cf / one_plus_d.powu(i as u64 + 1);
        assert_rel_close(*pv, expected);
    }
}

#[test]
fn test_matches_time_value_helpers() {
    let v = dcf::valuate(dec!(100), dec!(5), dec!(10), 10, dec!(2)).unwrap();
    let npv = time_value::npv(dec!(0.10), &v.cash_flows).unwrap();
    assert_rel_close(npv, v.total_pv - v.terminal_value_pv);
}

#[test]
fn test_zero_growth_zero_discount() {
    // Negative terminal growth keeps the terminal value defined
    let v = dcf::valuate(dec!(100), dec!(0), dec!(0), 5, dec!(-1)).unwrap();
    assert_eq!(v.present_values, v.cash_flows);
    assert!(v.cash_flows.iter().all(|cf| *cf == dec!(100)));

    // With zero terminal growth the terminal value divides by zero
    let err = dcf::valuate(dec!(100), dec!(0), dec!(0), 5, dec!(0)).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { .. }));
}

#[test]
fn test_equal_discount_and_terminal_rates_rejected() {
    let err = dcf::valuate(dec!(100), dec!(5), dec!(2), 10, dec!(2)).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { .. }));
}

#[test]
fn test_terminal_growth_above_discount_rejected() {
    let err = dcf::valuate(dec!(100), dec!(5), dec!(6), 10, dec!(8)).unwrap_err();
    assert!(matches!(err, DcfError::InvalidAssumption { .. }));
}

#[test]
fn test_non_positive_horizon_rejected() {
    for years in [0, -1, -20] {
        let err = dcf::valuate(dec!(100), dec!(5), dec!(10), years, dec!(2)).unwrap_err();
        assert!(matches!(err, DcfError::EmptyForecast { .. }));
    }
}

#[test]
fn test_valuation_is_deterministic() {
    let a = dcf::DcfAssumptions {
        initial_cash_flow: dec!(1234.56),
        growth_rate: dec!(6.3),
        discount_rate: dec!(9.1),
        forecast_years: 17,
        terminal_growth_rate: dec!(2.4),
    };
    let first = a.valuate().unwrap();
    let second = a.valuate().unwrap();
    assert_eq!(first, second);
    for (x, y) in first.cash_flows.iter().zip(&second.cash_flows) {
        assert_eq!(x.serialize(), y.serialize());
    }
    assert_eq!(first.total_pv.serialize(), second.total_pv.serialize());
}

#[test]
fn test_higher_discount_lowers_value() {
    let low = dcf::valuate(dec!(100), dec!(5), dec!(8), 10, dec!(2)).unwrap();
    let high = dcf::valuate(dec!(100), dec!(5), dec!(12), 10, dec!(2)).unwrap();
    assert!(low.total_pv > high.total_pv);
}

// ===========================================================================
// Decimal range
// ===========================================================================

fn assert_overflow(result: Result<dcf::DcfValuation, DcfError>) {
    match result {
        Err(DcfError::Overflow { .. }) => {}
        Err(other) => panic!("expected an overflow error, got {other}"),
        Ok(v) => panic!("expected an overflow error, got total_pv {}", v.total_pv),
    }
}

#[test]
fn test_long_horizon_with_high_growth_overflows() {
    assert_overflow(dcf::valuate(dec!(100), dec!(50), dec!(10), 160, dec!(2)));
}

#[test]
fn test_huge_initial_cash_flow_overflows() {
    let icf = Decimal::from_scientific("1e28").unwrap();
    assert_overflow(dcf::valuate(icf, dec!(5), dec!(10), 10, dec!(2)));
}

#[test]
fn test_near_zero_terminal_spread_overflows() {
    assert_overflow(dcf::valuate(
        dec!(100000000000),
        dec!(5),
        dec!(2.0000000000000000001),
        10,
        dec!(2),
    ));
}

#[test]
fn test_huge_horizon_fails_without_reserving_it() {
    // Overflow is reported long before two billion years are projected
    assert_overflow(dcf::valuate(dec!(100), dec!(5), dec!(10), 2_000_000_000, dec!(2)));
}

#[test]
fn test_calculate_dcf_overflow_propagates() {
    let mut input = sample_dcf_input();
    input.assumptions.growth_rate = dec!(50);
    input.assumptions.forecast_years = 160;
    assert!(matches!(
        dcf::calculate_dcf(&input).unwrap_err(),
        DcfError::Overflow { .. }
    ));
}

// ===========================================================================
// Full DCF envelope
// ===========================================================================

fn sample_dcf_input() -> dcf::DcfInput {
    dcf::DcfInput {
        assumptions: dcf::DcfAssumptions::default(),
        shares_outstanding: Some(dec!(1000)),
        currency: Currency::USD,
    }
}

#[test]
fn test_calculate_dcf_matches_engine() {
    let result = dcf::calculate_dcf(&sample_dcf_input()).unwrap();
    let engine = dcf::DcfAssumptions::default().valuate().unwrap();
    let out = &result.result;

    assert_eq!(out.cash_flows, engine.cash_flows);
    assert_eq!(out.present_values, engine.present_values);
    assert_eq!(out.terminal_value, engine.terminal_value);
    assert_eq!(out.terminal_value_pv, engine.terminal_value_pv);
    assert_eq!(out.total_pv, engine.total_pv);
}

#[test]
fn test_calculate_dcf_terminal_share_bounds() {
    let result = dcf::calculate_dcf(&sample_dcf_input()).unwrap();
    let pct = result.result.terminal_value_pct;
    assert!(pct > Decimal::ZERO && pct < Decimal::ONE);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_calculate_dcf_without_shares() {
    let mut input = sample_dcf_input();
    input.shares_outstanding = None;
    let result = dcf::calculate_dcf(&input).unwrap();
    assert!(result.result.fair_value_per_share.is_none());
}

#[test]
fn test_calculate_dcf_invalid_assumption_propagates() {
    let mut input = sample_dcf_input();
    input.assumptions.terminal_growth_rate = dec!(10);
    assert!(dcf::calculate_dcf(&input).is_err());
}

#[test]
fn test_dcf_input_from_json() {
    let json = r#"{
        "initial_cash_flow": 100,
        "growth_rate": "5",
        "discount_rate": 10.0,
        "forecast_years": 10,
        "terminal_growth_rate": 2,
        "shares_outstanding": 1000
    }"#;
    let input: dcf::DcfInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.assumptions, dcf::DcfAssumptions::default());
    assert_eq!(input.currency, Currency::USD);
    assert_eq!(input.shares_outstanding, Some(dec!(1000)));
}

// ===========================================================================
// Free cash flow from provider figures
// ===========================================================================

#[test]
fn test_snapshot_feeds_valuation() {
    let snapshot = fcf::FinancialSnapshot {
        ticker: Some("MSFT".into()),
        operating_cash_flow: Some(dec!(118_548_000_000)),
        capital_expenditures: Some(dec!(44_477_000_000)),
        shares_outstanding: Some(dec!(7_433_000_000)),
    }
    .in_millions();

    let input = dcf::DcfInput {
        assumptions: dcf::DcfAssumptions {
            initial_cash_flow: snapshot.free_cash_flow().unwrap(),
            ..dcf::DcfAssumptions::default()
        },
        shares_outstanding: Some(snapshot.shares_outstanding().unwrap()),
        currency: Currency::USD,
    };
    assert_eq!(input.assumptions.initial_cash_flow, dec!(74_071));

    let result = dcf::calculate_dcf(&input).unwrap();
    let per_share = result.result.fair_value_per_share.unwrap();
    assert_eq!(per_share, result.result.total_pv / dec!(7_433));
}

#[test]
fn test_snapshot_missing_data() {
    let snapshot = fcf::FinancialSnapshot::default();
    assert!(matches!(
        snapshot.free_cash_flow().unwrap_err(),
        DcfError::UpstreamDataUnavailable(_)
    ));
    assert!(matches!(
        snapshot.shares_outstanding().unwrap_err(),
        DcfError::UpstreamDataUnavailable(_)
    ));
}

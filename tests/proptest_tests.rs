//! Property-based tests for rate resolution, regime taxes and incentives.
//!
//! Run with: `cargo test --test proptest_tests`

use chrono::{Duration, NaiveDate};
use importa::error::SimulationError;
use importa::exchange::{ExchangeRateResolver, InMemoryQuoteProvider};
use importa::incentives::{
    self, Applicability, FiscalIncentive, IncentiveContext, IncentiveScope, ReductionFactors,
};
use importa::regimes::RegimeRegistry;
use importa::tax::{round_money, TaxEngine, TransportMode};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Money amounts up to 100 million with cents
fn money() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn multiplier() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|m| Decimal::new(m, 4))
}

fn any_mode() -> impl Strategy<Value = TransportMode> {
    prop_oneof![
        Just(TransportMode::Maritime),
        Just(TransportMode::Air),
        Just(TransportMode::Road),
        Just(TransportMode::Rail),
    ]
}

fn non_maritime() -> impl Strategy<Value = TransportMode> {
    prop_oneof![
        Just(TransportMode::Air),
        Just(TransportMode::Road),
        Just(TransportMode::Rail),
    ]
}

fn any_regime() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("COMUM"),
        Just("ADMISSAO_TEMPORARIA"),
        Just("DRAWBACK"),
        Just("REIMPORTACAO"),
    ]
}

proptest! {
    /// A weekend request resolves to the Friday before it
    #[test]
    fn weekend_resolves_to_previous_friday(
        week in 0i64..520,
        weekend_day in 1i64..=2,
        rate_cents in 100i64..2_000_000,
    ) {
        // 2016-01-01 was a Friday
        let friday = date(2016, 1, 1) + Duration::weeks(week);
        let requested = friday + Duration::days(weekend_day);
        let rate = Decimal::new(rate_cents, 4);

        let provider = InMemoryQuoteProvider::new()
            .with_rate("USD", friday, rate)
            .with_rate("USD", friday - Duration::days(1), rate + Decimal::ONE);
        let mut resolver = ExchangeRateResolver::new(provider).with_today(date(2030, 1, 1));

        let quote = block_on(resolver.resolve("USD", requested)).unwrap();
        prop_assert_eq!(quote.resolved_date, friday);
        prop_assert_eq!(quote.rate, rate);
        prop_assert_eq!(quote.requested_date, requested);
    }

    /// Any date after today is rejected, whatever the provider knows
    #[test]
    fn future_dates_always_fail(
        days_ahead in 1i64..5000,
        currency in prop_oneof![Just("USD"), Just("EUR"), Just("BRL"), Just("brl")],
    ) {
        let today = date(2026, 10, 16);
        let requested = today + Duration::days(days_ahead);
        let provider = InMemoryQuoteProvider::new().with_rate(currency, requested, dec!(5));
        let mut resolver = ExchangeRateResolver::new(provider).with_today(today);

        let err = block_on(resolver.resolve(currency, requested)).unwrap_err();
        prop_assert_eq!(err, SimulationError::FutureDate { requested, today });
    }

    /// Suspension regimes never charge anything
    #[test]
    fn suspended_regimes_are_all_zero(
        cif in money(),
        freight in money(),
        mode in any_mode(),
        code in prop_oneof![Just("ADMISSAO_TEMPORARIA"), Just("DRAWBACK")],
    ) {
        let registry = RegimeRegistry::default();
        let breakdown = TaxEngine::new(&registry).compute(cif, code, freight, mode).unwrap();

        prop_assert!(breakdown.is_zero());
        prop_assert_eq!(breakdown.total, Decimal::ZERO);
    }

    /// Reimport halves II and IPI exactly on whole-real bases
    #[test]
    fn reimport_halves_ii_and_ipi(reais in 0i64..100_000_000, mode in any_mode()) {
        let cif = Decimal::from(reais);
        let registry = RegimeRegistry::default();
        let engine = TaxEngine::new(&registry);

        let standard = engine.compute(cif, "COMUM", Decimal::ZERO, mode).unwrap();
        let reimport = engine.compute(cif, "REIMPORTACAO", Decimal::ZERO, mode).unwrap();

        prop_assert_eq!(reimport.ii, standard.ii * dec!(0.5));
        prop_assert_eq!(reimport.ipi, standard.ipi * dec!(0.5));
        prop_assert_eq!(reimport.icms, standard.icms);
        prop_assert_eq!(reimport.pis, standard.pis);
    }

    /// With cents in the base, reimport lines are the rounded half of the
    /// standard lines and every other line is unchanged
    #[test]
    fn reimport_halves_rounded_standard_lines(cif in money(), freight in money(), mode in any_mode()) {
        let registry = RegimeRegistry::default();
        let engine = TaxEngine::new(&registry);

        let standard = engine.compute(cif, "COMUM", freight, mode).unwrap();
        let reimport = engine.compute(cif, "REIMPORTACAO", freight, mode).unwrap();

        prop_assert_eq!(reimport.ii, round_money(standard.ii * dec!(0.5)));
        prop_assert_eq!(reimport.ipi, round_money(standard.ipi * dec!(0.5)));
        prop_assert_eq!(reimport.pis, standard.pis);
        prop_assert_eq!(reimport.cofins, standard.cofins);
        prop_assert_eq!(reimport.icms, standard.icms);
        prop_assert_eq!(reimport.fcp, standard.fcp);
        prop_assert_eq!(reimport.afrmm, standard.afrmm);
    }

    /// AFRMM only exists for maritime freight
    #[test]
    fn afrmm_is_zero_off_the_sea(
        cif in money(),
        freight in money(),
        mode in non_maritime(),
        code in any_regime(),
    ) {
        let registry = RegimeRegistry::default();
        let breakdown = TaxEngine::new(&registry).compute(cif, code, freight, mode).unwrap();
        prop_assert_eq!(breakdown.afrmm, Decimal::ZERO);
    }

    /// Same inputs, same breakdown
    #[test]
    fn compute_is_deterministic(
        cif in money(),
        freight in money(),
        mode in any_mode(),
        code in any_regime(),
    ) {
        let registry = RegimeRegistry::default();
        let engine = TaxEngine::new(&registry);

        let first = engine.compute(cif, code, freight, mode).unwrap();
        let second = engine.compute(cif, code, freight, mode).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Applying any valid incentive never raises the tax total
    #[test]
    fn incentives_never_increase_total(
        cif in money(),
        freight in money(),
        mode in any_mode(),
        factors in prop::collection::vec(prop::option::of(multiplier()), 7),
    ) {
        let registry = RegimeRegistry::default();
        let original = TaxEngine::new(&registry).compute(cif, "COMUM", freight, mode).unwrap();

        let incentive = FiscalIncentive {
            id: "prop".to_string(),
            name: "Generated".to_string(),
            scope: IncentiveScope::Regional,
            applicability: Applicability::default(),
            reductions: ReductionFactors {
                ii: factors[0],
                ipi: factors[1],
                pis: factors[2],
                cofins: factors[3],
                icms: factors[4],
                fcp: factors[5],
                afrmm: factors[6],
            },
        };

        let outcome = incentives::apply(&original, &incentive, &IncentiveContext::default()).unwrap();
        prop_assert!(outcome.breakdown().total <= original.total);
        prop_assert!(outcome.savings() >= Decimal::ZERO);
        prop_assert_eq!(outcome.breakdown().total + outcome.savings(), original.total);
    }
}

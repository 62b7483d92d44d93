//! Property tests for period resolution and spreadsheet-id parsing.

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;
use proptest::test_runner::Config;
use report_model::{FutureDatePolicy, Period, PeriodSelector, parse_spreadsheet_id};

fn relative_selector() -> impl Strategy<Value = PeriodSelector> {
    prop::sample::select(
        PeriodSelector::ALL
            .into_iter()
            .filter(|selector| *selector != PeriodSelector::Custom)
            .collect::<Vec<_>>(),
    )
}

fn any_today() -> impl Strategy<Value = NaiveDate> {
    // 1920-ish through 2190-ish.
    (700_000_i32..800_000_i32)
        .prop_map(|days| NaiveDate::from_num_days_from_ce_opt(days).expect("in range"))
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn relative_periods_resolve_to_ordered_ranges(
        selector in relative_selector(),
        today in any_today(),
    ) {
        let range = Period::from_selector(selector, None)
            .resolve(today, FutureDatePolicy::Reject)
            .expect("relative period resolves");
        prop_assert!(range.date_from <= range.date_to);
        prop_assert!(range.date_to <= today);
    }

    #[test]
    fn last_month_covers_a_whole_month(today in any_today()) {
        let range = Period::LastMonth
            .resolve(today, FutureDatePolicy::Reject)
            .expect("last month resolves");
        prop_assert_eq!(range.date_from.day(), 1);
        prop_assert!(range.date_to.succ_opt().expect("next day").day() == 1);
        prop_assert!(range.date_to < today);
    }

    #[test]
    fn spreadsheet_id_parse_is_idempotent(input in "\\PC{0,80}") {
        let once = parse_spreadsheet_id(&input);
        prop_assert_eq!(parse_spreadsheet_id(&once), once);
    }

    #[test]
    fn spreadsheet_url_yields_exact_id(
        id in "[a-zA-Z0-9_-]{1,44}",
        tail in prop::sample::select(vec!["", "/edit", "/edit#gid=0", "/view?usp=sharing"]),
    ) {
        let url = format!("https://docs.google.com/spreadsheets/d/{id}{tail}");
        prop_assert_eq!(parse_spreadsheet_id(&url), id.clone());
        prop_assert_eq!(parse_spreadsheet_id(&id), id);
    }
}

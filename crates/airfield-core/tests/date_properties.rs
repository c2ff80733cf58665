use airfield_core::date::{days_between, format_iso, is_valid_date, parse_date};
use airfield_core::recurrence::{Frequency, next_due_date};
use proptest::prelude::*;
use time::{Date, Duration};

fn date_strategy() -> impl Strategy<Value = Date> {
    // 1990-01-01 through roughly 2090.
    (0i64..36_500).prop_map(|offset| time::macros::date!(1990 - 01 - 01) + Duration::days(offset))
}

fn frequency_strategy() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::Monthly),
        Just(Frequency::Quarterly),
        Just(Frequency::Yearly),
    ]
}

proptest! {
    #[test]
    fn days_between_preserves_ordering(a in date_strategy(), b in date_strategy(), today in date_strategy()) {
        prop_assume!(a != b);
        let (earlier, later) = if a < b { (a, b) } else { (b, a) };
        prop_assert!(days_between(earlier, today) < days_between(later, today));
    }

    #[test]
    fn canonical_rendering_parses_back(date in date_strategy()) {
        let rendered = format_iso(date);
        prop_assert!(is_valid_date(&rendered));
        prop_assert_eq!(parse_date(&rendered), Ok(date));
    }

    #[test]
    fn next_due_date_always_moves_forward(date in date_strategy(), frequency in frequency_strategy()) {
        prop_assert!(next_due_date(date, frequency) > date);
    }

    #[test]
    fn garbage_never_validates(raw in "[0-9]{1,3}-[0-9]{2}-[0-9]{2}|[a-z ]{0,12}") {
        prop_assert!(!is_valid_date(&raw));
    }
}

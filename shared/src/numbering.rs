//! Document number schemes
//!
//! Outgoings are numbered `<PREFIX>-<DDMMYY>-<SEQ>` where `SEQ` restarts at
//! 1 every calendar day and is zero-padded to three digits. Requests use a
//! single increasing integer. These functions only compute the next value;
//! callers must hold the allocation lock for the prefix while they insert.

use chrono::NaiveDate;

use crate::error::{DomainError, DomainResult};

/// Prefix used for outgoing documents unless configured otherwise
pub const DEFAULT_OUTGOING_PREFIX: &str = "OUT";

/// `OUT` + 2026-10-16 -> `OUT-161026`
pub fn daily_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}", prefix, date.format("%d%m%y"))
}

/// Trailing integer of a number such as `OUT-310126-005`
pub fn trailing_sequence(number: &str) -> Option<u64> {
    number.rsplit('-').next()?.trim().parse().ok()
}

/// Highest sequence already used under `daily_prefix`, plus one
pub fn next_daily_sequence<'a, I>(existing: I, daily_prefix: &str) -> DomainResult<u64>
where
    I: IntoIterator<Item = &'a str>,
{
    let scoped = format!("{daily_prefix}-");
    let last = existing
        .into_iter()
        .filter(|number| number.starts_with(&scoped))
        .filter_map(trailing_sequence)
        .max();
    successor(last, daily_prefix)
}

pub fn format_daily_number(daily_prefix: &str, sequence: u64) -> String {
    format!("{daily_prefix}-{sequence:03}")
}

/// Next global request number; non-numeric numbers are ignored
pub fn next_request_number<'a, I>(existing: I) -> DomainResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let last = existing
        .into_iter()
        .filter_map(|number| number.trim().parse::<u64>().ok())
        .max();
    successor(last, "request").map(|next| next.to_string())
}

fn successor(last: Option<u64>, scope: &str) -> DomainResult<u64> {
    match last {
        None => Ok(1),
        Some(last) => last
            .checked_add(1)
            .ok_or_else(|| DomainError::NumberingExhausted {
                scope: scope.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn next_daily_number<'a, I>(prefix: &str, date: NaiveDate, existing: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let scoped = daily_prefix(prefix, date);
        let sequence = next_daily_sequence(existing, &scoped).unwrap();
        format_daily_number(&scoped, sequence)
    }

    #[test]
    fn prefix_uses_day_month_two_digit_year() {
        assert_eq!(daily_prefix("OUT", day(2026, 1, 31)), "OUT-310126");
    }

    #[test]
    fn first_number_of_the_day_starts_at_one() {
        let existing = ["OUT-300126-007"];
        assert_eq!(
            next_daily_number("OUT", day(2026, 1, 31), existing),
            "OUT-310126-001"
        );
    }

    #[test]
    fn continues_after_highest_sequence_of_the_day() {
        let existing = ["OUT-310126-002", "OUT-310126-005", "OUT-310126-003"];
        assert_eq!(
            next_daily_number("OUT", day(2026, 1, 31), existing),
            "OUT-310126-006"
        );
    }

    #[test]
    fn sequence_grows_past_three_digits() {
        let existing = ["OUT-310126-999"];
        assert_eq!(
            next_daily_number("OUT", day(2026, 1, 31), existing),
            "OUT-310126-1000"
        );
    }

    #[test]
    fn other_prefixes_are_ignored() {
        let existing = ["GI-310126-010", "OUT-310126-001"];
        assert_eq!(
            next_daily_number("OUT", day(2026, 1, 31), existing),
            "OUT-310126-002"
        );
    }

    #[test]
    fn huge_caller_sequences_do_not_repeat() {
        let existing = ["OUT-161026-4294967295"];
        assert_eq!(
            next_daily_number("OUT", day(2026, 10, 16), existing),
            "OUT-161026-4294967296"
        );
    }

    #[test]
    fn exhausted_sequence_is_an_error() {
        let existing = ["OUT-161026-18446744073709551615"];
        let err = next_daily_sequence(existing, "OUT-161026").unwrap_err();
        assert_eq!(
            err,
            DomainError::NumberingExhausted {
                scope: "OUT-161026".to_string()
            }
        );
        assert!(next_request_number(["18446744073709551615"]).is_err());
    }

    #[test]
    fn trailing_sequence_parsing() {
        assert_eq!(trailing_sequence("OUT-310126-005"), Some(5));
        assert_eq!(trailing_sequence("OUT-310126-x"), None);
        assert_eq!(trailing_sequence("42"), Some(42));
    }

    #[test]
    fn request_numbers_increase_globally() {
        assert_eq!(next_request_number(std::iter::empty()).unwrap(), "1");
        assert_eq!(next_request_number(["3", "11", "7", "legacy"]).unwrap(), "12");
    }

    proptest! {
        #[test]
        fn next_number_is_fresh_and_parseable(sequences in prop::collection::vec(1u64..5000, 0..30)) {
            let date = day(2026, 10, 16);
            let prefix = daily_prefix("OUT", date);
            let existing: Vec<String> = sequences
                .iter()
                .map(|s| format_daily_number(&prefix, *s))
                .collect();

            let next = next_daily_number("OUT", date, existing.iter().map(String::as_str));

            prop_assert!(!existing.contains(&next));
            let seq = trailing_sequence(&next).unwrap();
            prop_assert!(sequences.iter().all(|s| seq > *s));
        }
    }
}

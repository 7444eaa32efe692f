//! Date arithmetic for alarm occurrences.
//!
//! Two entry points: [`next_occurrence`] is the steady-state step that
//! derives one occurrence from the previous one, and [`seed_next_trigger`]
//! is the forward-looking computation run when an alarm is created or
//! edited. Everything here works on naive local wall-clock time at minute
//! resolution; produced instants always have zero seconds and zero
//! sub-second component.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDateTime, Timelike};

use crate::alarm::IntervalType;

/// the recurrence rule triple, borrowed out of an alarm
#[derive(Debug, Clone, Copy)]
pub struct Rule<'a> {
    pub interval_type: IntervalType,
    /// days between occurrences for `Interval`; week stride for `Weekly`.
    /// callers populating a rule clamp this to at least 1, it is not
    /// re-validated here
    pub interval_value: u32,
    /// weekday indices 0..=6, 0 = Sunday; only consulted for `Weekly`
    pub repeat_days: &'a BTreeSet<u8>,
}

/// zeroes the seconds and sub-second component
#[must_use]
pub fn truncate_to_minute(instant: NaiveDateTime) -> NaiveDateTime {
    instant
        .with_second(0)
        .and_then(|instant| instant.with_nanosecond(0))
        .unwrap_or(instant)
}

fn weekday_index(instant: NaiveDateTime) -> u8 {
    // chrono counts the same way the rule does: 0 = Sunday
    instant.weekday().num_days_from_sunday() as u8
}

/// the Sunday 00:00 opening the calendar week containing `instant`
fn week_anchor(instant: NaiveDateTime) -> Option<NaiveDateTime> {
    instant
        .date()
        .checked_sub_days(Days::new(u64::from(weekday_index(instant))))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// whether `check` falls in a week congruent to `anchor`'s week modulo
/// `stride` (week boundary = Sunday 00:00)
fn week_congruent(anchor: NaiveDateTime, check: NaiveDateTime, stride: u32) -> bool {
    if stride <= 1 {
        return true;
    }
    match (week_anchor(anchor), week_anchor(check)) {
        (Some(from), Some(to)) => {
            let weeks = (to - from).num_days() / 7;
            weeks.rem_euclid(i64::from(stride)) == 0
        }
        _ => false,
    }
}

/// The steady-state recurrence step: the occurrence following `reference`,
/// or `None` when the rule has no successor.
///
/// `Once` never has a successor. `Interval` steps `interval_value` whole
/// days. `Weekly` scans forward one day at a time, up to a week, for the
/// first member weekday; an empty `repeat_days` degrades to daily firing.
/// Multi-week skipping is a creation/edit-time concern and is deliberately
/// not applied here. Date overflow also yields `None`; callers treat that
/// as the alarm having no further occurrence.
#[must_use]
pub fn next_occurrence(reference: NaiveDateTime, rule: Rule<'_>) -> Option<NaiveDateTime> {
    let next = match rule.interval_type {
        IntervalType::Once => return None,
        IntervalType::Interval => {
            reference.checked_add_days(Days::new(u64::from(rule.interval_value)))?
        }
        IntervalType::Weekly => {
            if rule.repeat_days.is_empty() {
                reference.checked_add_days(Days::new(1))?
            } else {
                let mut found = None;
                for offset in 1..=7 {
                    let check = reference.checked_add_days(Days::new(offset))?;
                    if rule.repeat_days.contains(&weekday_index(check)) {
                        found = Some(check);
                        break;
                    }
                }
                // unreachable with a non-empty day set, handled anyway
                match found {
                    Some(check) => check,
                    None => reference.checked_add_days(Days::new(1))?,
                }
            }
        }
    };
    Some(truncate_to_minute(next))
}

/// The seed algorithm: the first trigger instant for a freshly created or
/// edited alarm, given the user's `candidate` start instant and `now`.
///
/// `Once` accepts the candidate verbatim, past or not; the caller leaves
/// such an alarm dormant when the result is not strictly in the future.
/// `Interval` (and `Weekly` without any chosen weekday) catches up by
/// repeated steady-state steps until strictly after `now`. `Weekly` with
/// chosen weekdays keeps a valid future candidate as-is, and otherwise
/// scans forward at the candidate's time-of-day for the first member
/// weekday at-or-after `now` whose week is congruent to the candidate's
/// week modulo `interval_value`; weeks are Sunday-anchored while the scan
/// starts mid-week at the candidate, so it runs `7 * (interval_value + 1)`
/// days to cover the whole of the next congruent week. A fruitless scan
/// falls back to the day after the candidate.
#[must_use]
pub fn seed_next_trigger(candidate: NaiveDateTime, now: NaiveDateTime, rule: Rule<'_>) -> NaiveDateTime {
    let candidate = truncate_to_minute(candidate);
    match rule.interval_type {
        IntervalType::Once => candidate,
        IntervalType::Weekly if !rule.repeat_days.is_empty() => {
            if rule.repeat_days.contains(&weekday_index(candidate)) && candidate > now {
                return candidate;
            }
            for offset in 0..=7 * (u64::from(rule.interval_value.max(1)) + 1) {
                let Some(check) = candidate.checked_add_days(Days::new(offset)) else {
                    break;
                };
                if rule.repeat_days.contains(&weekday_index(check))
                    && check >= now
                    && week_congruent(candidate, check, rule.interval_value)
                {
                    return check;
                }
            }
            candidate
                .checked_add_days(Days::new(1))
                .unwrap_or(candidate)
        }
        IntervalType::Interval | IntervalType::Weekly => {
            let mut next = candidate;
            while next <= now {
                match next_occurrence(next, rule) {
                    // guard against a non-advancing step
                    Some(stepped) if stepped > next => next = stepped,
                    _ => break,
                }
            }
            next
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn days(days: &[u8]) -> BTreeSet<u8> {
        days.iter().copied().collect()
    }

    fn rule(
        interval_type: IntervalType,
        interval_value: u32,
        repeat_days: &BTreeSet<u8>,
    ) -> Rule<'_> {
        Rule {
            interval_type,
            interval_value,
            repeat_days,
        }
    }

    #[test]
    fn once_has_no_successor() {
        let none = BTreeSet::new();
        assert_eq!(
            next_occurrence(at(2025, 1, 1, 8, 0), rule(IntervalType::Once, 1, &none)),
            None
        );
    }

    #[test]
    fn interval_steps_whole_days() {
        let none = BTreeSet::new();
        assert_eq!(
            next_occurrence(at(2025, 1, 1, 8, 30), rule(IntervalType::Interval, 3, &none)),
            Some(at(2025, 1, 4, 8, 30))
        );
    }

    #[test]
    fn produced_instants_have_zero_seconds() {
        let none = BTreeSet::new();
        let reference = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_milli_opt(8, 30, 45, 500)
            .unwrap();
        let next = next_occurrence(reference, rule(IntervalType::Interval, 1, &none)).unwrap();
        assert_eq!(next.second(), 0);
        assert_eq!(next.nanosecond(), 0);
        assert_eq!(truncate_to_minute(reference), at(2025, 1, 1, 8, 30));
    }

    #[test]
    fn next_occurrence_is_strictly_later() {
        let weekdays = days(&[1, 3, 5]);
        let reference = at(2025, 1, 6, 8, 0);
        for (interval_type, repeat_days) in [
            (IntervalType::Interval, &BTreeSet::new()),
            (IntervalType::Weekly, &weekdays),
            (IntervalType::Weekly, &BTreeSet::new()),
        ] {
            let next = next_occurrence(reference, rule(interval_type, 1, repeat_days)).unwrap();
            assert!(next > reference);
        }
    }

    #[test]
    fn weekly_lands_on_a_member_weekday() {
        let weekdays = days(&[2, 4]);
        let mut reference = at(2025, 1, 1, 6, 0);
        for _ in 0..10 {
            reference = next_occurrence(reference, rule(IntervalType::Weekly, 1, &weekdays))
                .unwrap();
            assert!(weekdays.contains(&(reference.weekday().num_days_from_sunday() as u8)));
        }
    }

    #[test]
    fn weekly_without_days_degrades_to_daily() {
        // no chosen weekdays degrades to a daily step
        let none = BTreeSet::new();
        assert_eq!(
            next_occurrence(at(2025, 1, 1, 8, 0), rule(IntervalType::Weekly, 1, &none)),
            Some(at(2025, 1, 2, 8, 0))
        );
    }

    #[test]
    fn seed_catches_interval_up_to_the_future() {
        // a daily alarm started in the past advances one day at a
        // time until it clears "now"
        let none = BTreeSet::new();
        let seeded = seed_next_trigger(
            at(2025, 1, 1, 8, 0),
            at(2025, 1, 3, 9, 0),
            rule(IntervalType::Interval, 1, &none),
        );
        assert_eq!(seeded, at(2025, 1, 4, 8, 0));
    }

    #[test]
    fn seed_keeps_future_interval_candidate_verbatim() {
        let none = BTreeSet::new();
        let seeded = seed_next_trigger(
            at(2025, 1, 5, 8, 0),
            at(2025, 1, 3, 9, 0),
            rule(IntervalType::Interval, 3, &none),
        );
        assert_eq!(seeded, at(2025, 1, 5, 8, 0));
    }

    #[test]
    fn seed_finds_next_chosen_weekday_in_same_week() {
        // a Mon/Wed/Fri alarm committed on a Tuesday at 10:00
        // with an 08:00 candidate lands on Wednesday 08:00
        let weekdays = days(&[1, 3, 5]);
        // 2025-01-07 is a Tuesday
        let seeded = seed_next_trigger(
            at(2025, 1, 7, 8, 0),
            at(2025, 1, 7, 10, 0),
            rule(IntervalType::Weekly, 1, &weekdays),
        );
        assert_eq!(seeded, at(2025, 1, 8, 8, 0));
        assert_eq!(seeded.weekday().num_days_from_sunday(), 3);
    }

    #[test]
    fn seed_skips_non_congruent_weeks() {
        // an every-other-Monday alarm whose Monday already passed
        // lands two weeks out, not one. 2025-01-06 is a Monday.
        let weekdays = days(&[1]);
        let seeded = seed_next_trigger(
            at(2025, 1, 6, 7, 0),
            at(2025, 1, 6, 8, 0),
            rule(IntervalType::Weekly, 2, &weekdays),
        );
        assert_eq!(seeded, at(2025, 1, 20, 7, 0));
    }

    #[test]
    fn seed_reaches_late_days_of_the_next_congruent_week() {
        // weeks are Sunday-anchored, so a Sunday candidate with a Saturday
        // member day puts the occurrence at the far end of the congruent
        // week; the scan must run all the way out to it. 2025-01-05 is a
        // Sunday; the every-other-week Saturday after now is 2025-01-25.
        let weekdays = days(&[6]);
        let seeded = seed_next_trigger(
            at(2025, 1, 5, 7, 0),
            at(2025, 1, 13, 8, 0),
            rule(IntervalType::Weekly, 2, &weekdays),
        );
        assert_eq!(seeded, at(2025, 1, 25, 7, 0));
        assert_eq!(seeded.weekday().num_days_from_sunday(), 6);
    }

    #[test]
    fn seed_keeps_valid_future_weekly_candidate() {
        let weekdays = days(&[1]);
        let seeded = seed_next_trigger(
            at(2025, 1, 6, 7, 0),
            at(2025, 1, 3, 8, 0),
            rule(IntervalType::Weekly, 2, &weekdays),
        );
        assert_eq!(seeded, at(2025, 1, 6, 7, 0));
    }

    #[test]
    fn seed_weekly_without_days_catches_up_daily() {
        let none = BTreeSet::new();
        let seeded = seed_next_trigger(
            at(2025, 1, 1, 8, 0),
            at(2025, 1, 2, 9, 0),
            rule(IntervalType::Weekly, 1, &none),
        );
        assert_eq!(seeded, at(2025, 1, 3, 8, 0));
    }

    #[test]
    fn seed_accepts_past_once_candidate() {
        let none = BTreeSet::new();
        let seeded = seed_next_trigger(
            at(2024, 6, 1, 8, 0),
            at(2025, 1, 1, 9, 0),
            rule(IntervalType::Once, 1, &none),
        );
        assert_eq!(seeded, at(2024, 6, 1, 8, 0));
    }

    #[test]
    fn seed_falls_back_past_the_scan_bound() {
        // a weekly alarm whose start lies further back than the scan reaches
        // falls back to the day after the candidate and ends up dormant
        let weekdays = days(&[1]);
        let seeded = seed_next_trigger(
            at(2024, 1, 1, 7, 0),
            at(2025, 6, 1, 8, 0),
            rule(IntervalType::Weekly, 1, &weekdays),
        );
        assert_eq!(seeded, at(2024, 1, 2, 7, 0));
        assert!(seeded < at(2025, 6, 1, 8, 0));
    }
}

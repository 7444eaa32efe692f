use std::{collections::BTreeSet, ops::AddAssign};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{always_true, Sound},
    recurrence::{self, Rule},
};

/// How successive occurrences of an alarm are derived.
#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    /// fires once at its start instant and is then deleted
    Once,
    /// fires every `interval_value` days
    #[default]
    Interval,
    /// fires on the weekdays in `repeat_days`, every `interval_value`-th week
    Weekly,
}

const fn default_interval_value() -> u32 {
    1
}

/// represents an alarm
/// `next_trigger_at` is the only field the scheduler consults when deciding
/// whether the alarm is due; everything else feeds the recurrence engine or
/// the display.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Alarm {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    /// the user-supplied candidate instant, minute-truncated; anchors the
    /// week-skip congruence for weekly alarms and pre-fills the edit form
    #[serde(with = "toml_datetime_compat")]
    pub start_date: NaiveDateTime,
    #[serde(default)]
    pub interval_type: IntervalType,
    #[serde(default = "default_interval_value")]
    pub interval_value: u32,
    #[serde(default)]
    pub repeat_days: BTreeSet<u8>,
    #[serde(default = "Sound::get_default_name")]
    pub sound: String,
    pub volume: f32,
    #[serde(default = "always_true")]
    pub is_active: bool,
    #[serde(with = "toml_datetime_compat")]
    pub next_trigger_at: NaiveDateTime,
    /// bookkeeping only, never consulted for scheduling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_at: Option<NaiveDateTime>,
}

impl Alarm {
    #[must_use]
    pub fn rule(&self) -> Rule<'_> {
        Rule {
            interval_type: self.interval_type,
            interval_value: self.interval_value,
            repeat_days: &self.repeat_days,
        }
    }
}

impl AddAssign for Alarm {
    /// used so that when we edit an alarm we don't lose its id
    /// or its trigger history
    fn add_assign(&mut self, rhs: Self) {
        self.title = rhs.title;
        self.start_date = rhs.start_date;
        self.interval_type = rhs.interval_type;
        self.interval_value = rhs.interval_value;
        self.repeat_days = rhs.repeat_days;
        self.sound = rhs.sound;
        self.volume = rhs.volume;
        self.is_active = rhs.is_active;
        self.next_trigger_at = rhs.next_trigger_at;
    }
}

/// the create/edit submission: everything the form collects, before the seed
/// algorithm has run
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmDraft {
    pub title: String,
    pub start_date: NaiveDateTime,
    pub interval_type: IntervalType,
    pub interval_value: u32,
    pub repeat_days: BTreeSet<u8>,
    pub sound: String,
    pub volume: f32,
}

impl AlarmDraft {
    /// runs the seed algorithm against `now` and produces a fresh alarm.
    /// `interval_value` is clamped to at least 1 and `volume` to 0..=100
    /// here, at the form boundary; the recurrence engine does not
    /// re-validate. the alarm comes out dormant unless its seeded trigger is
    /// strictly in the future.
    #[must_use]
    pub fn build(self, now: NaiveDateTime) -> Alarm {
        let interval_value = self.interval_value.max(1);
        let rule = Rule {
            interval_type: self.interval_type,
            interval_value,
            repeat_days: &self.repeat_days,
        };
        let start_date = recurrence::truncate_to_minute(self.start_date);
        let next_trigger_at = recurrence::seed_next_trigger(start_date, now, rule);
        Alarm {
            id: Uuid::new_v4(),
            title: if self.title.is_empty() {
                "my alarm".to_string()
            } else {
                self.title
            },
            start_date,
            interval_type: self.interval_type,
            interval_value,
            repeat_days: self.repeat_days,
            sound: self.sound,
            volume: self.volume.clamp(0.0, 100.0),
            is_active: next_trigger_at > now,
            next_trigger_at,
            last_triggered_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn draft(start: NaiveDateTime) -> AlarmDraft {
        AlarmDraft {
            title: String::new(),
            start_date: start,
            interval_type: IntervalType::Interval,
            interval_value: 1,
            repeat_days: BTreeSet::new(),
            sound: Sound::get_default_name(),
            volume: 50.0,
        }
    }

    #[test]
    fn build_clamps_interval_value_and_volume() {
        let now = at(2025, 1, 1, 7, 0);
        let alarm = AlarmDraft {
            interval_value: 0,
            volume: 250.0,
            ..draft(at(2025, 1, 2, 8, 0))
        }
        .build(now);
        assert_eq!(alarm.interval_value, 1);
        assert!((alarm.volume - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn build_defaults_empty_title() {
        let now = at(2025, 1, 1, 7, 0);
        let alarm = draft(at(2025, 1, 2, 8, 0)).build(now);
        assert_eq!(alarm.title, "my alarm");
    }

    #[test]
    fn future_start_is_active_past_once_is_dormant() {
        let now = at(2025, 1, 1, 7, 0);
        let future = draft(at(2025, 1, 2, 8, 0)).build(now);
        assert!(future.is_active);

        let past = AlarmDraft {
            interval_type: IntervalType::Once,
            ..draft(at(2024, 12, 31, 8, 0))
        }
        .build(now);
        // one-shot candidates are accepted verbatim, even in the past,
        // but such an alarm is created dormant
        assert_eq!(past.next_trigger_at, at(2024, 12, 31, 8, 0));
        assert!(!past.is_active);
    }

    #[test]
    fn edit_keeps_id_and_history() {
        let now = at(2025, 1, 1, 7, 0);
        let mut alarm = draft(at(2025, 1, 2, 8, 0)).build(now);
        alarm.last_triggered_at = Some(now);
        let id = alarm.id;

        alarm += AlarmDraft {
            title: "changed".to_string(),
            ..draft(at(2025, 1, 3, 9, 0))
        }
        .build(now);

        assert_eq!(alarm.id, id);
        assert_eq!(alarm.last_triggered_at, Some(now));
        assert_eq!(alarm.title, "changed");
        assert_eq!(alarm.next_trigger_at, at(2025, 1, 3, 9, 0));
    }
}

//! The trigger scheduler: owns the alarm collection and the at-most-one
//! active alert, and exposes one serialized entry point per action (tick,
//! create, edit, remove, dismiss). The host drives [`Scheduler::tick`] on a
//! 1-second cadence and passes `now` into every call, so tests can feed
//! whatever instants they like.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    alarm::{Alarm, AlarmDraft},
    communication::{Message, MessageType},
    config::Config,
};

pub struct Scheduler {
    config: Config,
    /// the one alarm allowed to ring at a time; a fired alarm lives here,
    /// outside the schedulable collection, until dismissed
    active_alert: Option<Alarm>,
    sender: Sender<Message>,
}

impl Scheduler {
    #[must_use]
    pub const fn new(config: Config, sender: Sender<Message>) -> Self {
        Self {
            config,
            active_alert: None,
            sender,
        }
    }

    /// One polling step. Does nothing while an alert is ringing; otherwise
    /// fires the first due active alarm in stored order (stored order is
    /// the deterministic tie policy when several alarms are due at once).
    ///
    /// Firing removes the alarm from the collection for every interval
    /// type, repeating ones included. A repeating alarm does not requeue
    /// itself; putting it back is a user action through the edit path.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<&Alarm> {
        if self.active_alert.is_some() {
            return None;
        }
        let due = self
            .config
            .alarms
            .iter()
            .position(|alarm| alarm.is_active && alarm.next_trigger_at <= now)?;
        let mut alarm = self.config.alarms.remove(due);
        alarm.last_triggered_at = Some(now);
        log::info!("alarm {} ({}) triggered", alarm.id, alarm.title);
        match self.config.sounds.get(&alarm.sound) {
            Some(sound) => self.send(Message::new(
                MessageType::AlarmTriggered {
                    volume: alarm.volume,
                    sound_path: sound.path.clone(),
                },
                alarm.id,
            )),
            None => log::warn!("alarm {} has unknown sound {:?}", alarm.id, alarm.sound),
        }
        self.active_alert = Some(alarm);
        self.active_alert.as_ref()
    }

    /// stops the alert sound and clears the ringing state; nothing else is
    /// rescheduled or mutated
    pub fn dismiss(&mut self) -> Option<Alarm> {
        let alarm = self.active_alert.take()?;
        log::info!("alarm {} ({}) dismissed", alarm.id, alarm.title);
        self.send(Message::new(MessageType::AlarmStopped, alarm.id));
        Some(alarm)
    }

    pub fn create(&mut self, draft: AlarmDraft, now: NaiveDateTime) -> &Alarm {
        let alarm = draft.build(now);
        log::info!(
            "alarm {} ({}) created, next trigger {}",
            alarm.id,
            alarm.title,
            alarm.next_trigger_at
        );
        self.config.alarms.push(alarm);
        // position is valid, we just pushed
        &self.config.alarms[self.config.alarms.len() - 1]
    }

    /// full-replacement edit; the alarm keeps its id and trigger history
    /// while every recurrence field and the next trigger are recomputed
    pub fn edit(&mut self, id: Uuid, draft: AlarmDraft, now: NaiveDateTime) -> bool {
        let Some(alarm) = self.config.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return false;
        };
        *alarm += draft.build(now);
        log::info!("alarm {id} edited, next trigger {}", alarm.next_trigger_at);
        true
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let Some(position) = self.config.alarms.iter().position(|alarm| alarm.id == id) else {
            return false;
        };
        self.config.alarms.remove(position);
        log::info!("alarm {id} removed");
        true
    }

    #[must_use]
    pub const fn active_alert(&self) -> Option<&Alarm> {
        self.active_alert.as_ref()
    }

    /// the active alarm with the numerically smallest `next_trigger_at`
    #[must_use]
    pub fn nearest_upcoming(&self) -> Option<&Alarm> {
        self.config
            .alarms
            .iter()
            .filter(|alarm| alarm.is_active)
            .min_by_key(|alarm| alarm.next_trigger_at)
    }

    /// countdown to the nearest upcoming alarm, floored to whole hours and
    /// minutes
    #[must_use]
    pub fn time_remaining(&self, now: NaiveDateTime) -> Option<TimeRemaining> {
        let nearest = self.nearest_upcoming()?;
        let diff = nearest.next_trigger_at - now;
        if diff <= chrono::Duration::zero() {
            return Some(TimeRemaining::Due);
        }
        let hours = diff.num_hours();
        let minutes = diff.num_minutes() % 60;
        if hours == 0 && minutes == 0 {
            Some(TimeRemaining::UnderAMinute)
        } else {
            Some(TimeRemaining::In { hours, minutes })
        }
    }

    /// the collection sorted by due time, for display
    #[must_use]
    pub fn alarms_by_due(&self) -> Vec<&Alarm> {
        let mut alarms: Vec<&Alarm> = self.config.alarms.iter().collect();
        alarms.sort_by_key(|alarm| alarm.next_trigger_at);
        alarms
    }

    #[must_use]
    pub fn alarm(&self, id: Uuid) -> Option<&Alarm> {
        self.config.alarms.iter().find(|alarm| alarm.id == id)
    }

    #[must_use]
    pub fn sound_path(&self, name: &str) -> Option<PathBuf> {
        self.config.sounds.get(name).map(|sound| sound.path.clone())
    }

    #[must_use]
    pub fn sound_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.config.sounds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn add_sound(&mut self, sound: crate::config::Sound) {
        self.config.sounds.insert(sound.name.clone(), sound);
    }

    #[must_use]
    pub fn time_format(&self) -> &str {
        self.config.time_format()
    }

    pub fn save(&self, path: &Path) {
        self.config.save(path);
    }

    // audio is fire-and-forget; a missing audio thread must never stall a tick
    fn send(&self, message: Message) {
        if self.sender.send(message).is_err() {
            log::warn!("audio thread is gone, alert is silent");
        }
    }
}

/// display value for "how long until the nearest alarm"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRemaining {
    /// the nearest alarm is due now (or overdue, waiting on a tick)
    Due,
    UnderAMinute,
    In { hours: i64, minutes: i64 },
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Due => write!(f, "the alarm is about to ring!"),
            Self::UnderAMinute => write!(f, "ringing in under a minute"),
            Self::In { hours: 0, minutes } => write!(f, "{minutes}m remaining"),
            Self::In { hours, minutes } => write!(f, "{hours}h {minutes}m remaining"),
        }
    }
}

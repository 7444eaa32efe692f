use std::{
    collections::BTreeSet,
    error::Error,
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
    time::Duration,
};

use chrono::NaiveDateTime;
use clap::{command, Parser, Subcommand};
use sketch_alarms::{
    alarm::{AlarmDraft, IntervalType},
    audio,
    communication::{Message, MessageType},
    config::{Config, Sound},
    Scheduler,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// write a fresh config and create the sounds directory
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// register a sound file under a name
    NewSound { name: String, path: PathBuf },
    /// add an alarm; start is "YYYY-MM-DD HH:MM"
    Add {
        title: String,
        start: String,
        /// repeat every N days
        #[clap(long, conflicts_with_all = ["days", "once"])]
        every: Option<u32>,
        /// repeat on weekdays, e.g. "mon,wed,fri"
        #[clap(long, conflicts_with = "once")]
        days: Option<String>,
        /// weeks between weekday firings (1 = every matching week)
        #[clap(long, default_value_t = 1, requires = "days")]
        skip: u32,
        /// fire a single time, then disappear
        #[clap(long)]
        once: bool,
        #[clap(long)]
        sound: Option<String>,
        #[clap(long, default_value_t = 50.0)]
        volume: f32,
    },
    /// replace an alarm's fields; same options as add
    Edit {
        id: Uuid,
        title: String,
        start: String,
        #[clap(long, conflicts_with_all = ["days", "once"])]
        every: Option<u32>,
        #[clap(long, conflicts_with = "once")]
        days: Option<String>,
        #[clap(long, default_value_t = 1, requires = "days")]
        skip: u32,
        #[clap(long)]
        once: bool,
        #[clap(long)]
        sound: Option<String>,
        #[clap(long, default_value_t = 50.0)]
        volume: f32,
    },
    /// delete an alarm
    Remove { id: Uuid },
    /// show all alarms sorted by due time
    List,
    /// audition a registered sound
    Preview {
        sound: String,
        #[clap(long, default_value_t = 50.0)]
        volume: f32,
    },
    /// watch the clock and ring alarms; press enter to dismiss
    Run,
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// the form boundary: reject malformed date/time input before anything
/// reaches the recurrence engine
fn parse_start(start: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M")
        .map_err(|e| format!("invalid start \"{start}\" (expected YYYY-MM-DD HH:MM): {e}"))
}

fn parse_days(days: &str) -> Result<BTreeSet<u8>, String> {
    days.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.to_lowercase().as_str() {
            "sun" | "0" => Ok(0),
            "mon" | "1" => Ok(1),
            "tue" | "2" => Ok(2),
            "wed" | "3" => Ok(3),
            "thu" | "4" => Ok(4),
            "fri" | "5" => Ok(5),
            "sat" | "6" => Ok(6),
            other => Err(format!("unknown weekday \"{other}\"")),
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build_draft(
    title: String,
    start: &str,
    every: Option<u32>,
    days: Option<&str>,
    skip: u32,
    once: bool,
    sound: Option<String>,
    volume: f32,
) -> Result<AlarmDraft, String> {
    let start_date = parse_start(start)?;
    let (interval_type, interval_value, repeat_days) = if once {
        (IntervalType::Once, 1, BTreeSet::new())
    } else if let Some(days) = days {
        (IntervalType::Weekly, skip, parse_days(days)?)
    } else {
        (IntervalType::Interval, every.unwrap_or(1), BTreeSet::new())
    };
    Ok(AlarmDraft {
        title,
        start_date,
        interval_type,
        interval_value,
        repeat_days,
        sound: sound.unwrap_or_else(Sound::get_default_name),
        volume,
    })
}

fn describe(alarm: &sketch_alarms::alarm::Alarm, time_format: &str) -> String {
    let rule = match alarm.interval_type {
        IntervalType::Once => "once".to_string(),
        IntervalType::Interval => format!("every {} day(s)", alarm.interval_value),
        IntervalType::Weekly => {
            let names = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];
            let picked: Vec<&str> = alarm
                .repeat_days
                .iter()
                .filter_map(|day| names.get(usize::from(*day)).copied())
                .collect();
            if picked.is_empty() {
                "daily (no weekdays chosen)".to_string()
            } else if alarm.interval_value > 1 {
                format!("{} every {} weeks", picked.join(","), alarm.interval_value)
            } else {
                format!("weekly on {}", picked.join(","))
            }
        }
    };
    format!(
        "{} {} [{}] {} vol {}% {}",
        alarm.id,
        alarm.next_trigger_at.format(time_format),
        rule,
        alarm.title,
        alarm.volume,
        if alarm.is_active { "" } else { "(dormant)" }
    )
}

fn main() -> Result<(), Box<dyn Error>> {
    // initialize the logger
    simple_file_logger::init_logger!("sketch_alarms").expect("couldn't initialize logger");

    let args = Args::parse();
    let (sender, receiver) = mpsc::channel();
    let config_path = Config::config_path();
    let mut scheduler = Scheduler::new(Config::load(&config_path), sender.clone());

    match args.command {
        Command::Init { force } => {
            if force || !Config::is_config_present() {
                Config::new().save(&config_path);
                std::fs::create_dir_all(Config::sounds_path())?;
                println!(
                    "wrote {}, drop alert sounds into {}",
                    config_path.display(),
                    Config::sounds_path().display()
                );
            } else {
                println!("config already present, use --force to overwrite");
            }
        }
        Command::NewSound { name, path } => {
            scheduler.add_sound(Sound::new(name, path));
            scheduler.save(&config_path);
        }
        Command::Add {
            title,
            start,
            every,
            days,
            skip,
            once,
            sound,
            volume,
        } => {
            let draft = build_draft(title, &start, every, days.as_deref(), skip, once, sound, volume)?;
            let added = describe(scheduler.create(draft, now()), "%Y-%m-%d %H:%M");
            println!("added: {added}");
            scheduler.save(&config_path);
        }
        Command::Edit {
            id,
            title,
            start,
            every,
            days,
            skip,
            once,
            sound,
            volume,
        } => {
            let draft = build_draft(title, &start, every, days.as_deref(), skip, once, sound, volume)?;
            if scheduler.edit(id, draft, now()) {
                scheduler.save(&config_path);
            } else {
                return Err(format!("no alarm with id {id}").into());
            }
        }
        Command::Remove { id } => {
            if scheduler.remove(id) {
                scheduler.save(&config_path);
            } else {
                return Err(format!("no alarm with id {id}").into());
            }
        }
        Command::List => {
            let time_format = scheduler.time_format().to_string();
            if let Some(remaining) = scheduler.time_remaining(now()) {
                println!("next alarm: {remaining}");
            }
            for alarm in scheduler.alarms_by_due() {
                println!("{}", describe(alarm, &time_format));
            }
            println!("sounds: {}", scheduler.sound_names().join(", "));
        }
        Command::Preview { sound, volume } => {
            let path = scheduler
                .sound_path(&sound)
                .ok_or_else(|| format!("no sound named \"{sound}\""))?;
            let audio_thread = audio::spawn(receiver);
            if sender
                .send(Message::new(
                    MessageType::Preview { volume, sound_path: path },
                    Uuid::nil(),
                ))
                .is_err()
            {
                log::warn!("audio thread is gone, nothing to preview");
            }
            thread::sleep(Duration::from_secs(5));
            drop(sender);
            drop(scheduler);
            let _ = audio_thread.join();
        }
        Command::Run => run(scheduler, &config_path, receiver),
    }
    Ok(())
}

/// the 1-second polling loop; a stdin reader thread turns "enter" into
/// dismissal of the active alert
fn run(mut scheduler: Scheduler, config_path: &Path, receiver: mpsc::Receiver<Message>) {
    audio::spawn(receiver);

    let (dismiss_sender, dismiss_receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() || dismiss_sender.send(()).is_err() {
                break;
            }
        }
    });

    println!("watching alarms, ctrl-c to quit");
    let mut last_countdown = String::new();
    loop {
        let now = now();
        if scheduler.active_alert().is_some() {
            if dismiss_receiver.try_recv().is_ok() {
                scheduler.dismiss();
                println!("alarm dismissed");
            }
        } else {
            // drain stale keypresses so they don't dismiss a future alert
            while dismiss_receiver.try_recv().is_ok() {}
            let fired = scheduler
                .tick(now)
                .map(|alarm| (alarm.title.clone(), alarm.next_trigger_at));
            if let Some((title, due)) = fired {
                println!(
                    "\n*** {} / {title} is ringing! press enter to stop ***",
                    due.format(scheduler.time_format())
                );
                // firing removed the alarm from the collection, persist that
                scheduler.save(config_path);
            }
        }
        let countdown = scheduler
            .time_remaining(now)
            .map_or_else(|| "no active alarms".to_string(), |remaining| remaining.to_string());
        if countdown != last_countdown && scheduler.active_alert().is_none() {
            println!("{countdown}");
            last_countdown = countdown;
        }
        thread::sleep(Duration::from_secs(1));
    }
}

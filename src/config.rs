use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::alarm::Alarm;

/// the persisted snapshot: the whole alarm collection plus the sound
/// registry, written as one TOML document
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub(crate) time_format: String,
    #[serde(default)]
    pub(crate) alarms: Vec<Alarm>,
    pub(crate) sounds: HashMap<String, Sound>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%Y-%m-%d %H:%M".to_string(),
            alarms: vec![],
            sounds: [
                Sound::crystal_morning(),
                Sound::horizon_echo(),
                Sound::warm_piano(),
                Sound::sunrise_edm(),
                Sound::panic_pulse(),
            ]
            .into_iter()
            .map(|sound| (sound.name.clone(), sound))
            .collect(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// loads the snapshot; anything that goes wrong (missing file, bad TOML)
    /// degrades to the default config with no alarms, never an error
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let config = match std::fs::read_to_string(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("couldn't read config file {}: {e}, starting fresh", path.display());
                return Self::default();
            }
        };
        match toml::from_str(&config) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("couldn't parse config file {}: {e}, starting fresh", path.display());
                Self::default()
            }
        }
    }

    /// best-effort whole-snapshot write; failures are logged and swallowed
    pub fn save(&self, path: &Path) {
        let config = match toml::to_string(self) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("couldn't serialize config: {e}");
                return;
            }
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("couldn't create config dir {}: {e}", parent.display());
                return;
            }
        }
        if let Err(e) = std::fs::write(path, config) {
            log::warn!("couldn't write config file {}: {e}", path.display());
        }
    }

    /// # Panics
    /// panics when the platform has no usable home directory
    #[must_use]
    pub fn config_path() -> PathBuf {
        let mut path = directories::ProjectDirs::from("", "", "sketch_alarms")
            .expect("couldn't get config path")
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        path
    }

    /// # Panics
    /// panics when the platform has no usable home directory
    #[must_use]
    pub fn sounds_path() -> PathBuf {
        let mut path = directories::ProjectDirs::from("", "", "sketch_alarms")
            .expect("couldn't get sounds directory path")
            .data_dir()
            .to_path_buf();
        path.push("sounds");
        path
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().exists()
    }

    #[must_use]
    pub fn time_format(&self) -> &str {
        &self.time_format
    }
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Sound {
    pub name: String,
    pub path: PathBuf,
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::crystal_morning()
    }
}

impl Sound {
    #[must_use]
    pub fn get_default_name() -> String {
        Self::crystal_morning().name
    }

    #[must_use]
    pub const fn new(name: String, path: PathBuf) -> Self {
        Self { name, path }
    }

    #[must_use]
    pub fn crystal_morning() -> Self {
        Self {
            name: "crystal morning".to_string(),
            path: Config::sounds_path().join("crystal_morning.mp3"),
        }
    }

    #[must_use]
    pub fn horizon_echo() -> Self {
        Self {
            name: "horizon echo".to_string(),
            path: Config::sounds_path().join("horizon_echo.mp3"),
        }
    }

    #[must_use]
    pub fn warm_piano() -> Self {
        Self {
            name: "warm piano".to_string(),
            path: Config::sounds_path().join("warm_piano.mp3"),
        }
    }

    #[must_use]
    pub fn sunrise_edm() -> Self {
        Self {
            name: "sunrise edm".to_string(),
            path: Config::sounds_path().join("sunrise_edm.mp3"),
        }
    }

    #[must_use]
    pub fn panic_pulse() -> Self {
        Self {
            name: "panic pulse".to_string(),
            path: Config::sounds_path().join("panic_pulse.mp3"),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}

#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

pub mod alarm;
pub mod audio;
pub mod communication;
pub mod config;
pub mod recurrence;
pub mod scheduler;

pub use scheduler::{Scheduler, TimeRemaining};

//! Shared vocabulary for the radio front-ends and the playback core:
//! stations, user commands, configuration and platform paths.

pub mod config;
pub mod platform;
pub mod protocol;

//! FamilyStream relay: reverse-proxy the FamilyStream site with an injected cast
//! widget, and bridge player commands to Home Assistant media players.

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod hub;
pub mod playback;
pub mod relay;

//! Client for the home-automation hub's REST API.

pub mod client;
pub mod entity;

pub use client::{HubClient, HubError};
pub use entity::{MediaAction, MediaPlayer, TrackMetadata};

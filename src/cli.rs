use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "familystream",
    about = "FamilyStream relay: proxies the FamilyStream site and casts to Home Assistant media players",
    long_about = None,
    version = env!("FAMILYSTREAM_VERSION"),
)]
pub struct Args {
    /// HTTP port to listen on [default: 8099]
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to TOML config file (overrides default search: ./familystream.toml, ~/.config/familystream/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bind to localhost only (127.0.0.1) instead of all interfaces (0.0.0.0 + :::)
    #[arg(long)]
    pub localhost: bool,

    /// Website to reverse-proxy [default: https://www.familystream.com]
    #[arg(long, value_name = "URL")]
    pub target: Option<String>,

    /// Home Assistant API base [default: http://supervisor/core]
    #[arg(long, value_name = "URL")]
    pub hub_url: Option<String>,

    /// Media player used when a request omits entity_id
    #[arg(long, env = "DEFAULT_MEDIA_PLAYER", value_name = "ENTITY")]
    pub default_media_player: Option<String>,

    /// Cache static assets from the proxied site under this directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory of static files served ahead of the proxy [default: public]
    #[arg(long, value_name = "DIR")]
    pub public_dir: Option<PathBuf>,

    /// Externally reachable base URL of this relay, used to hand the capture stream to players
    #[arg(long, value_name = "URL")]
    pub public_url: Option<String>,

    /// Enable the /api/capture.mp3 local audio capture stream
    #[arg(long)]
    pub capture: bool,

    /// Bearer token for the Home Assistant API
    #[arg(long, env = "SUPERVISOR_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,
}

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mprisbee_bridge::{BridgeState, EventBridge, MemoryHost, MemoryState, Notification};
use mprisbee_core::{
    init_logging, AppDirs, BridgeConfig, Config, HostPlayState, NowPlaying, RepeatMode, TrackTags,
};
use mprisbee_transport::{Channel, ReadSettings, SocketAddress};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "mprisbee", version, about = "Bridge a media player to its MPRIS peer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the socket path the bridge connects to
    SocketPath,
    /// Run a bridge backed by an in-memory player driven from stdin
    Simulate {
        /// Socket path override (defaults to the per-user path)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let config = Config::load_or_default(&dirs)?;
    let _logging = init_logging(&config.logging, &dirs)?;

    match cli.command {
        Command::SocketPath => {
            let address = SocketAddress::for_current_user(&config.bridge)?;
            println!("{address}");
        }
        Command::Simulate { socket } => simulate(config.bridge, socket)?,
    }

    Ok(())
}

fn simulate(config: BridgeConfig, socket: Option<PathBuf>) -> Result<()> {
    let address = match socket {
        Some(path) => SocketAddress::new(path)?,
        None => SocketAddress::for_current_user(&config)?,
    };
    let settings = ReadSettings::from(&config);

    let host = Arc::new(MemoryHost::new(MemoryState::default()));
    let echoed = host.subscribe();
    let bridge = Arc::new(EventBridge::new(Arc::clone(&host), config));
    bridge.start_with(Channel::connect(&address, settings));
    if bridge.state() == BridgeState::Suspended {
        bail!("no MPRIS peer listening at {address}");
    }

    // Peer commands change the in-memory player; forward what it raises.
    let forwarder = Arc::downgrade(&bridge);
    thread::spawn(move || {
        for notification in echoed {
            match forwarder.upgrade() {
                Some(bridge) => bridge.notify(notification),
                None => break,
            }
        }
    });

    tracing::info!(path = %address, "simulation started");
    println!("connected to {address}; type `quit` or close stdin to exit");

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let command = match SimCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        if command == SimCommand::Quit {
            break;
        }
        for notification in command.apply(&host) {
            bridge.notify(notification);
        }
    }

    bridge.shutdown();
    Ok(())
}

/// One line of simulator input.
#[derive(Debug, Clone, PartialEq)]
enum SimCommand {
    Play,
    Pause,
    Stop,
    Next,
    Track {
        url: String,
        title: String,
        artist: Option<String>,
    },
    Volume(f32),
    Mute,
    Unmute,
    Shuffle(bool),
    Repeat(RepeatMode),
    Quit,
}

#[derive(Debug, Error, PartialEq)]
enum SimParseError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("volume must be a number in 0..=1, got `{0}`")]
    Volume(String),
}

impl SimCommand {
    fn parse(line: &str) -> Result<Option<Self>, SimParseError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("play", []) => SimCommand::Play,
            ("pause", []) => SimCommand::Pause,
            ("stop", []) => SimCommand::Stop,
            ("next", []) => SimCommand::Next,
            ("mute", []) => SimCommand::Mute,
            ("unmute", []) => SimCommand::Unmute,
            ("quit", []) => SimCommand::Quit,
            ("track", [url, title, rest @ ..]) if rest.len() <= 1 => SimCommand::Track {
                url: (*url).to_owned(),
                title: (*title).to_owned(),
                artist: rest.first().map(|artist| (*artist).to_owned()),
            },
            ("track", _) => return Err(SimParseError::Usage("track <url> <title> [artist]")),
            ("volume", [level]) => {
                let volume = level
                    .parse::<f32>()
                    .ok()
                    .filter(|volume| (0.0..=1.0).contains(volume))
                    .ok_or_else(|| SimParseError::Volume((*level).to_owned()))?;
                SimCommand::Volume(volume)
            }
            ("volume", _) => return Err(SimParseError::Usage("volume <0..1>")),
            ("shuffle", ["on"]) => SimCommand::Shuffle(true),
            ("shuffle", ["off"]) => SimCommand::Shuffle(false),
            ("shuffle", _) => return Err(SimParseError::Usage("shuffle on|off")),
            ("repeat", ["none"]) => SimCommand::Repeat(RepeatMode::None),
            ("repeat", ["one"]) => SimCommand::Repeat(RepeatMode::One),
            ("repeat", ["all"]) => SimCommand::Repeat(RepeatMode::All),
            ("repeat", _) => return Err(SimParseError::Usage("repeat none|one|all")),
            (
                "play" | "pause" | "stop" | "next" | "mute" | "unmute" | "quit",
                _,
            ) => return Err(SimParseError::Usage("command takes no arguments")),
            (other, _) => return Err(SimParseError::Unknown(other.to_owned())),
        };
        Ok(Some(command))
    }

    /// Changes the player the way a user would and returns the
    /// notifications the host raises for it.
    fn apply(&self, host: &MemoryHost) -> Vec<Notification> {
        match self {
            SimCommand::Play => {
                host.update(|state| state.play_state = HostPlayState::Playing);
                vec![Notification::PlayStateChanged]
            }
            SimCommand::Pause => {
                host.update(|state| state.play_state = HostPlayState::Paused);
                vec![Notification::PlayStateChanged]
            }
            SimCommand::Stop => {
                host.update(|state| {
                    state.play_state = HostPlayState::Stopped;
                    state.position_ms = 0;
                });
                vec![Notification::PlayStateChanged]
            }
            // No queue to advance; restart the current track.
            SimCommand::Next => {
                let loaded = host.update(|state| {
                    state.position_ms = 0;
                    state.now_playing.is_some()
                });
                if loaded {
                    vec![Notification::TrackChanged]
                } else {
                    Vec::new()
                }
            }
            SimCommand::Track { url, title, artist } => {
                host.update(|state| {
                    state.now_playing = Some(NowPlaying {
                        tags: TrackTags {
                            title: title.clone(),
                            artist: artist.clone().unwrap_or_default(),
                            ..TrackTags::default()
                        },
                        duration_ms: 0,
                        file_url: url.clone(),
                        artwork_path: None,
                    });
                    state.artwork_path = None;
                    state.position_ms = 0;
                    state.play_state = HostPlayState::Playing;
                });
                vec![Notification::TrackChanged, Notification::PlayStateChanged]
            }
            SimCommand::Volume(volume) => {
                host.update(|state| state.volume = *volume);
                vec![Notification::VolumeLevelChanged]
            }
            SimCommand::Mute | SimCommand::Unmute => {
                let muted = *self == SimCommand::Mute;
                host.update(|state| state.muted = muted);
                vec![Notification::VolumeMuteChanged]
            }
            SimCommand::Shuffle(enabled) => {
                host.update(|state| state.shuffle = *enabled);
                vec![Notification::ShuffleChanged]
            }
            SimCommand::Repeat(mode) => {
                host.update(|state| state.repeat = *mode);
                vec![Notification::RepeatChanged]
            }
            SimCommand::Quit => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mprisbee_core::PlayerHost;

    #[test]
    fn parses_track_with_optional_artist() {
        assert_eq!(
            SimCommand::parse("track file:///a.flac Intro").unwrap(),
            Some(SimCommand::Track {
                url: "file:///a.flac".into(),
                title: "Intro".into(),
                artist: None,
            })
        );
        assert_eq!(
            SimCommand::parse("  track file:///a.flac Intro Band ").unwrap(),
            Some(SimCommand::Track {
                url: "file:///a.flac".into(),
                title: "Intro".into(),
                artist: Some("Band".into()),
            })
        );
        assert!(matches!(
            SimCommand::parse("track file:///a.flac"),
            Err(SimParseError::Usage(_))
        ));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(SimCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn volume_must_be_in_unit_range() {
        assert_eq!(
            SimCommand::parse("volume 0.25").unwrap(),
            Some(SimCommand::Volume(0.25))
        );
        assert_eq!(
            SimCommand::parse("volume 1.5"),
            Err(SimParseError::Volume("1.5".into()))
        );
        assert_eq!(
            SimCommand::parse("volume loud"),
            Err(SimParseError::Volume("loud".into()))
        );
    }

    #[test]
    fn toggles_and_modes() {
        assert_eq!(
            SimCommand::parse("shuffle on").unwrap(),
            Some(SimCommand::Shuffle(true))
        );
        assert_eq!(
            SimCommand::parse("repeat all").unwrap(),
            Some(SimCommand::Repeat(RepeatMode::All))
        );
        assert!(matches!(
            SimCommand::parse("repeat forever"),
            Err(SimParseError::Usage(_))
        ));
        assert!(matches!(
            SimCommand::parse("stop now"),
            Err(SimParseError::Usage(_))
        ));
        assert_eq!(
            SimCommand::parse("dance"),
            Err(SimParseError::Unknown("dance".into()))
        );
    }

    #[test]
    fn track_command_loads_and_plays() {
        let host = MemoryHost::default();
        let raised = SimCommand::Track {
            url: "file:///a.flac".into(),
            title: "Intro".into(),
            artist: Some("Band".into()),
        }
        .apply(&host);
        assert_eq!(
            raised,
            vec![Notification::TrackChanged, Notification::PlayStateChanged]
        );
        let now = host.now_playing().unwrap();
        assert_eq!(now.tags.artist, "Band");
        assert_eq!(host.play_state(), HostPlayState::Playing);
        assert!(host.take_calls().is_empty());
    }

    #[test]
    fn next_without_track_raises_nothing() {
        let host = MemoryHost::default();
        assert!(SimCommand::Next.apply(&host).is_empty());
    }

    #[test]
    fn mute_round_trip() {
        let host = MemoryHost::default();
        SimCommand::Mute.apply(&host);
        assert!(host.is_muted());
        assert_eq!(
            SimCommand::Unmute.apply(&host),
            vec![Notification::VolumeMuteChanged]
        );
        assert!(!host.is_muted());
    }
}

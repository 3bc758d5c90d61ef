// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tracker_seq::audio::{AudioClock, TimelineEntry, TraceRenderer};
use tracker_seq::config::{SongEvent, SongWatcher};
use tracker_seq::timing::{SystemTimebase, Timebase};
use tracker_seq::{
    render_offline, Notification, Sequencer, SequencerConfig, Song, Transport, TransportHandle,
};

const DEFAULT_RENDER_SECONDS: f64 = 8.0;

fn print_usage() {
    println!("TRACKER-SEQ - Lookahead pattern sequencer");
    println!();
    println!("Usage:");
    println!("  tracker-seq play <song.yaml> [OPTIONS]    Play a song in real time");
    println!("  tracker-seq render <song.yaml> [OPTIONS]  Print the note timeline offline");
    println!();
    println!("Options:");
    println!("  --config <file.toml>  Sequencer settings");
    println!("  --seconds <N>         Stop after N seconds (render default: 8)");
    println!("  --loop                Loop the song");
    println!("  --metronome           Enable the metronome");
    println!("  --record              Record one pass, counting in if --count-in");
    println!("  --count-in            Play a metronome measure before recording");
    println!("  --watch               Reload the song when the file changes (play only)");
    println!("  --audio-clock         Use the default audio output as the clock (play only)");
    println!("  --help                Show this help message");
}

/// Parsed command line options
#[derive(Debug, Default)]
struct Options {
    song_path: PathBuf,
    config_path: Option<PathBuf>,
    seconds: Option<f64>,
    looping: bool,
    metronome: bool,
    record: bool,
    count_in: bool,
    watch: bool,
    audio_clock: bool,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        let mut options = Options::default();
        let mut song_path = None;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| anyhow!("--config requires a file path"))?;
                    options.config_path = Some(PathBuf::from(path));
                }
                "--seconds" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| anyhow!("--seconds requires a number"))?;
                    let seconds: f64 = value
                        .parse()
                        .map_err(|_| anyhow!("Invalid number of seconds: {}", value))?;
                    if !seconds.is_finite() || seconds < 0.0 {
                        return Err(anyhow!("Invalid number of seconds: {}", value));
                    }
                    options.seconds = Some(seconds);
                }
                "--loop" => options.looping = true,
                "--metronome" => options.metronome = true,
                "--record" => options.record = true,
                "--count-in" => options.count_in = true,
                "--watch" => options.watch = true,
                "--audio-clock" => options.audio_clock = true,
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown option: {}", other));
                }
                path => {
                    if song_path.is_some() {
                        return Err(anyhow!("Unexpected argument: {}", path));
                    }
                    song_path = Some(PathBuf::from(path));
                }
            }
        }

        options.song_path = song_path.ok_or_else(|| anyhow!("A song file is required"))?;
        Ok(options)
    }

    fn load_config(&self) -> Result<SequencerConfig> {
        let mut config = match &self.config_path {
            Some(path) => SequencerConfig::load(path)?,
            None => SequencerConfig::default(),
        };
        config.looping |= self.looping;
        config.metronome |= self.metronome;
        config.count_in |= self.count_in;
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Log notifications, shutting the transport down once a recording pass ends
fn spawn_notification_logger(notifications: Receiver<Notification>, handle: TransportHandle) {
    thread::spawn(move || {
        for notification in notifications {
            match notification {
                Notification::PatternSwitch(measure) => info!(measure, "pattern switch"),
                Notification::TempoUpdated { old, new } => info!(old, new, "tempo updated"),
                Notification::RecordingComplete => {
                    info!("recording complete");
                    handle.shutdown();
                }
                other => info!(?other, "transport"),
            }
        }
    });
}

fn spawn_song_watcher(watcher: SongWatcher, handle: TransportHandle) {
    thread::spawn(move || {
        while let Some(event) = watcher.recv() {
            match event {
                SongEvent::Reloaded(song) => {
                    info!(path = ?watcher.watched_path(), "song changed, reloading");
                    // loading stops playback
                    if !handle.load_song(*song) || !handle.play() {
                        break;
                    }
                }
                SongEvent::Error(e) => warn!("{}", e),
            }
        }
    });
}

fn spawn_timer(seconds: f64, handle: TransportHandle) {
    thread::spawn(move || {
        thread::sleep(Duration::from_secs_f64(seconds));
        handle.shutdown();
    });
}

fn play(options: &Options) -> Result<()> {
    let song = Song::load(&options.song_path)?;
    let config = options.load_config()?;

    let timebase: Box<dyn Timebase> = if options.audio_clock {
        let clock = AudioClock::open_default().context("Failed to open audio clock")?;
        info!(sample_rate = clock.sample_rate(), "timing from audio output");
        Box::new(clock)
    } else {
        Box::new(SystemTimebase::new())
    };

    info!(
        title = %song.meta.title,
        tempo = song.meta.tempo,
        patterns = song.patterns.len(),
        "loaded song"
    );

    let mut sequencer = Sequencer::new(song, config, timebase, TraceRenderer::new())?;
    let notifications = sequencer.subscribe();
    sequencer.set_recording(options.record);
    if sequencer.is_recording() {
        info!(count_in = sequencer.metronome().count_in(), "recording armed");
    }

    let mut transport = Transport::new(sequencer)?;
    let handle = transport.handle();

    spawn_notification_logger(notifications, handle.clone());
    if options.watch {
        let watcher = SongWatcher::new(&options.song_path, None)?;
        spawn_song_watcher(watcher, handle.clone());
    }
    if let Some(seconds) = options.seconds {
        spawn_timer(seconds, handle.clone());
    }

    handle.play();
    transport.run();

    let position = transport.sequencer().position();
    println!(
        "Stopped at measure {} step {}",
        position.measure, position.step
    );
    Ok(())
}

fn render(options: &Options) -> Result<()> {
    let song = Song::load(&options.song_path)?;
    let config = options.load_config()?;
    let seconds = options.seconds.unwrap_or(DEFAULT_RENDER_SECONDS);

    let entries = render_offline(song, config, seconds)?;
    for entry in &entries {
        match entry {
            TimelineEntry::NoteOn {
                time,
                instrument,
                note,
                octave,
                measure,
            } => println!(
                "{:>9.4}  on   {}{:<2} inst {:<3} measure {}",
                time, note, octave, instrument, measure
            ),
            TimelineEntry::NoteOff {
                time, note, octave, ..
            } => println!("{:>9.4}  off  {}{}", time, note, octave),
            TimelineEntry::Click { time, kind } => println!("{:>9.4}  click {:?}", time, kind),
        }
    }
    println!("{} entries over {:.2}s", entries.len(), seconds);
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("TRACKER-SEQ - Lookahead pattern sequencer");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "play" => {
            init_tracing();
            play(&Options::parse(&args[2..])?)?;
        }
        "render" => {
            init_tracing();
            render(&Options::parse(&args[2..])?)?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

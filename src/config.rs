use crate::cadence::{SpeedMultiplier, MAX_SPEED};
use crate::keypad::Keymap;
use crate::pacer::{DEFAULT_FRAME_RATE, MAX_FRAME_RATE, MIN_FRAME_RATE};
use crate::rom::DEFAULT_CATALOG_URL;
use clap::Parser;
use std::path::PathBuf;

/// Command-line options, as parsed.
#[derive(Parser, Debug)]
#[command(version, about = "Terminal host for CHIP-8 engines", long_about = None)]
pub struct Args {
    #[arg(short, long, help = "ROM file to load at startup")]
    pub rom: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_CATALOG_URL, help = "Base URL the ROM catalog is served from")]
    pub catalog_url: String,

    #[arg(long, conflicts_with = "catalog_url", help = "Serve the catalog from a local directory instead")]
    pub catalog_dir: Option<PathBuf>,

    #[arg(short, long = "game", help = "Catalog entry to offer in the picker (repeatable)")]
    pub games: Vec<String>,

    #[arg(long, help = "Catalog entry to load at startup")]
    pub select: Option<String>,

    #[arg(short, long, default_value_t = 1.0, value_parser = parse_speed, help = "Speed multiplier (steps per frame = 10 x speed)")]
    pub speed: f64,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=16), help = "Magnification of each display pixel")]
    pub scale: u32,

    #[arg(short, long, default_value_t = DEFAULT_FRAME_RATE, value_parser = parse_frame_rate, help = "Frame rate in frames per second (1-240)")]
    pub frame_rate: f64,

    #[arg(short, long, default_value = "conventional", help = "Physical keymap: conventional or literal")]
    pub keymap: Keymap,

    #[arg(long, help = "Write log output here rather than to stderr")]
    pub log_file: Option<PathBuf>,
}

fn parse_speed(s: &str) -> Result<f64, String> {
    let m: f64 = s.parse().map_err(|e| format!("{}", e))?;
    SpeedMultiplier::new(m)
        .map(SpeedMultiplier::value)
        .ok_or_else(|| format!("speed must be between 0 and {}, got {}", MAX_SPEED, s))
}

fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!(
            "frame rate must be between {} and {}, got {}",
            MIN_FRAME_RATE, MAX_FRAME_RATE, s
        ))
    }
}

/// Where catalog ROMs come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    Http(String),
    Dir(PathBuf),
}

/// Settings for one run of the host.
#[derive(Debug, Clone)]
pub struct Config {
    pub rom: Option<PathBuf>,
    pub catalog: CatalogSource,
    pub games: Vec<String>,
    pub select: Option<String>,
    pub speed: SpeedMultiplier,
    pub scale: u32,
    pub frame_rate: f64,
    pub keymap: Keymap,
    pub log_file: Option<PathBuf>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let catalog = match args.catalog_dir {
            Some(dir) => CatalogSource::Dir(dir),
            None => CatalogSource::Http(args.catalog_url),
        };
        Config {
            rom: args.rom,
            catalog,
            games: args.games,
            select: args.select,
            // already validated by parse_speed
            speed: SpeedMultiplier::new(args.speed).unwrap_or_default(),
            scale: args.scale,
            frame_rate: args.frame_rate,
            keymap: args.keymap,
            log_file: args.log_file,
        }
    }
}

impl Config {
    pub fn from_args() -> Self {
        Args::parse().into()
    }
}

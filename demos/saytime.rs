//! Talking clock: speak the local time with a voice picked from a list,
//! reusing loaded voices through the cache.
//!
//! ```text
//! cargo run --example saytime --features flite,playback -- --voices slt,awb --loop 3 --interval 2
//! ```
//!
//! `--loop` without a count repeats forever. `--save` writes
//! `saytime-<n>-<voice>.wav` files instead of playing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Timelike};
use clap::Parser;
use speechpipe::{engines::flite::FliteEngine, OutputFormat, SynthesisContext, SynthesisStats};

/// Limited-domain voice that only knows clock phrases in its own wording.
const EXCLUDED_VOICE: &str = "awb_time";

#[derive(Parser, Debug)]
#[command(about = "Speak the current time")]
struct Args {
    /// Voice names, comma separated (default: every built-in voice but awb_time)
    #[arg(long, value_delimiter = ',')]
    voices: Vec<String>,

    /// Repeat COUNT times; without COUNT, repeat forever
    #[arg(long = "loop", value_name = "COUNT")]
    loop_count: Option<Option<u32>>,

    /// Seconds to sleep between announcements
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,

    /// Write WAV files instead of playing through the speakers
    #[arg(long)]
    save: bool,
}

impl Args {
    /// `None` means forever.
    fn repetitions(&self) -> Result<Option<u32>, String> {
        match self.loop_count {
            None => Ok(Some(1)),
            Some(None) => Ok(None),
            Some(Some(0)) => Err("invalid loop count 0. It must be a positive number.".to_string()),
            Some(Some(n)) => Ok(Some(n)),
        }
    }
}

fn default_voices(builtin: &[&str]) -> Vec<String> {
    builtin
        .iter()
        .filter(|name| **name != EXCLUDED_VOICE)
        .map(|name| name.to_string())
        .collect()
}

fn time_text(hour: u32, min: u32, sec: u32) -> String {
    let hour = match hour {
        0 => 12,
        h @ 13..=23 => h - 12,
        h => h,
    };
    let min = match min {
        0 => " o'clock".to_string(),
        m => format!(":{m:02}"),
    };
    let sec = match sec {
        0 => "exactly".to_string(),
        1 => "and 1 second".to_string(),
        s => format!("and {s} seconds"),
    };
    format!("The time is {hour}{min} {sec}.")
}

fn saytime(
    context: &SynthesisContext<FliteEngine>,
    voices: &[String],
    n: u32,
    save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = Local::now();
    let voice = &voices[now.nanosecond() as usize % voices.len()];
    let text = time_text(now.hour(), now.minute(), now.second());
    println!("text: {text}");
    println!("voice: {voice}");

    let start = Instant::now();
    let stats: SynthesisStats = if save {
        let path = PathBuf::from(format!("saytime-{n}-{voice}.wav"));
        let stats = context.speak_to_file(&text, Some(voice), &path, &OutputFormat::wav())?;
        println!("wrote {}", path.display());
        stats
    } else {
        context.speak_aloud(&text, Some(voice))?
    };
    log::info!(
        "{:.2}s of audio with '{voice}' in {:.2?}",
        stats.duration_secs(),
        start.elapsed()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let repetitions = args.repetitions()?;

    let engine = Arc::new(FliteEngine::new());
    let registry = engine.registry();
    let voices = if args.voices.is_empty() {
        default_voices(&registry.builtin_names())
    } else {
        args.voices.clone()
    };
    if voices.is_empty() {
        return Err("no voices to speak with".into());
    }

    let context = SynthesisContext::new(Arc::clone(&engine), registry)?;

    let mut n = 0;
    loop {
        if n > 0 {
            if let Some(secs) = args.interval {
                std::thread::sleep(Duration::from_secs(secs));
            }
        }
        saytime(&context, &voices, n, args.save)?;
        n += 1;
        if repetitions.is_some_and(|count| n >= count) {
            break;
        }
    }

    log::info!("{} voices loaded", context.cache().len());
    Ok(())
}

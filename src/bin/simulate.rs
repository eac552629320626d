//! Development harness: runs the engine against a scripted in-memory
//! page and prints placement snapshots. Useful for eyeballing the three
//! placement behaviors without a browser.

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use wmx::registry::{Engine, EngineOptions};
use wmx::sim::{pump, SimHost};
use wmx::{Rect, Settings};

#[derive(Debug, Parser)]
#[command(name = "simulate")]
#[command(about = "Run the watermark engine against a scripted page")]
struct Cli {
    /// Placement mode: static, random-pop, or bounce.
    #[arg(long, default_value = "bounce")]
    mode: String,
    /// Virtual time to simulate, in milliseconds.
    #[arg(long, default_value_t = 6000.0)]
    duration_ms: f64,
    /// Snapshot cadence, in milliseconds.
    #[arg(long, default_value_t = 500.0)]
    sample_ms: f64,
    /// Engine RNG seed; the same seed replays the same run.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    #[arg(long, default_value = "WATERMARKTEST")]
    text: String,
    /// Bounce speed in pixels per second.
    #[arg(long, default_value_t = 80.0)]
    speed: f64,
    /// Random-pop interval in milliseconds.
    #[arg(long, default_value_t = 1200.0)]
    interval_ms: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let mut host = SimHost::new();
    let video = host.add_video(Rect::new(100.0, 60.0, 640.0, 360.0));

    let mut settings = Settings::default();
    let patch = json!({
        "mode": cli.mode,
        "text": cli.text,
        "bounceSpeed": cli.speed,
        "randomIntervalMs": cli.interval_ms,
        "debug": true,
    });
    if let serde_json::Value::Object(patch) = patch {
        settings.apply_patch(&patch);
    }

    let mut engine = Engine::new(
        host,
        settings,
        EngineOptions {
            seed: Some(cli.seed),
        },
    );
    engine.start();

    println!(
        "mode={} duration={}ms seed={}",
        cli.mode, cli.duration_ms, cli.seed
    );
    let mut elapsed = 0.0;
    while elapsed < cli.duration_ms {
        let step = cli.sample_ms.min(cli.duration_ms - elapsed);
        pump(&mut engine, step);
        elapsed += step;

        if let Some(snapshot) = engine.snapshot(video) {
            match snapshot.velocity {
                Some(velocity) => println!(
                    "t={:>7.1}ms pos=({:>6.1}, {:>6.1}) vel=({:>6.1}, {:>6.1})",
                    elapsed, snapshot.position.x, snapshot.position.y, velocity.x, velocity.y
                ),
                None => println!(
                    "t={:>7.1}ms pos=({:>6.1}, {:>6.1})",
                    elapsed, snapshot.position.x, snapshot.position.y
                ),
            }
        }
    }

    engine.stop();
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use framestep_input::{Action, InputSnapshot};
use framestep_render::RecordingBackend;
use framestep_scene::{FrameControl, SceneConfig, SceneDriver};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framestep-cli", about = "Headless tool for framestep scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run frames against a recording backend and report what was drawn
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Seconds per frame
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Actions held for every frame
        #[arg(long, value_enum)]
        hold: Vec<HeldAction>,
        /// Per-frame mouse motion while the look button is held, as DX DY
        #[arg(long, num_args = 2, value_names = ["DX", "DY"], allow_negative_numbers = true)]
        look: Option<Vec<f32>>,
        /// Scene description (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the full command listing
        #[arg(long)]
        dump: bool,
    },
    /// Print a scene description as JSON
    DumpConfig {
        /// Scene description to normalize; the built-in scene when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HeldAction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl From<HeldAction> for Action {
    fn from(held: HeldAction) -> Self {
        match held {
            HeldAction::Forward => Action::MoveForward,
            HeldAction::Backward => Action::MoveBackward,
            HeldAction::Left => Action::StrafeLeft,
            HeldAction::Right => Action::StrafeRight,
            HeldAction::Up => Action::Ascend,
            HeldAction::Down => Action::Descend,
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading scene config {}", path.display())),
        None => Ok(SceneConfig::default()),
    }
}

fn frame_input(hold: &[HeldAction], look: Option<&[f32]>) -> InputSnapshot {
    let mut input = hold
        .iter()
        .fold(InputSnapshot::default(), |input, held| input.with_held((*held).into()));
    if let Some([dx, dy]) = look {
        input = input.with_mouse(*dx, *dy, true);
    }
    input
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("framestep-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", framestep_render::crate_info());
            println!("scene: {}", framestep_scene::crate_info());
            println!("actions: {}", Action::ALL.len());
        }
        Commands::Simulate {
            frames,
            dt,
            hold,
            look,
            config,
            dump,
        } => {
            let config = load_config(config.as_deref())?;
            let mut backend = RecordingBackend::new(config.width, config.height);
            let mut driver = SceneDriver::load(config, &mut backend)?;
            let input = frame_input(&hold, look.as_deref());

            let mut ran = 0;
            for _ in 0..frames {
                if driver.frame(&input, dt, &mut backend)? == FrameControl::Quit {
                    break;
                }
                ran += 1;
            }

            let stats = driver.stats();
            tracing::info!(
                frames = ran,
                draws = stats.draw_calls,
                fallbacks = stats.fallbacks,
                "simulation finished"
            );
            let camera = driver.camera();
            println!("Simulated {ran} frames at dt={dt}");
            println!(
                "draws={} view_recomputes={} world_recomputes={} fallbacks={}",
                stats.draw_calls, stats.view_recomputes, stats.world_recomputes, stats.fallbacks
            );
            println!(
                "camera: position={:?} yaw={:.4} pitch={:.4}",
                camera.position(),
                camera.yaw(),
                camera.pitch()
            );
            for (index, entity) in driver.entities().iter().enumerate() {
                println!(
                    "entity {index}: position={:?} rotation={:?}",
                    entity.position(),
                    entity.rotation()
                );
            }
            if dump {
                print!("{}", backend.describe());
            }
            driver.teardown(&mut backend);
        }
        Commands::DumpConfig { config } => {
            let config = load_config(config.as_deref())?;
            config.validate()?;
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_actions_and_look_build_a_snapshot() {
        let input = frame_input(&[HeldAction::Forward, HeldAction::Up], Some(&[4.0, -2.0]));
        assert!(input.is_held(Action::MoveForward));
        assert!(input.is_held(Action::Ascend));
        assert!(!input.is_held(Action::Quit));
        assert!(input.look_held());
        assert_eq!(input.mouse_delta().x, 4.0);
    }

    #[test]
    fn simulate_parses_look_pair() {
        let cli = Cli::parse_from([
            "framestep-cli",
            "simulate",
            "--frames",
            "3",
            "--hold",
            "left",
            "--look",
            "-5",
            "2",
        ]);
        let Commands::Simulate { frames, hold, look, .. } = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(frames, 3);
        assert_eq!(hold.len(), 1);
        assert_eq!(look, Some(vec![-5.0, 2.0]));
    }
}

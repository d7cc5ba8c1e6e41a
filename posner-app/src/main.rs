mod app;
mod bridge;
mod cli;
mod logging;

use anyhow::{Context, Result, anyhow};
use app::App;
use bridge::{ChannelInput, UserEvent, WindowSurface};
use clap::Parser;
use cli::{Cli, SessionFiles};
use logging::init_logging;
use posner_core::Reporter;
use posner_experiment::{ConsoleReporter, ExperimentConfig, Session, SessionRecorder, TrialPlan};
use posner_render::{ChartReporter, load_font};
use posner_timing::HighPrecisionTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::mpsc;
use std::thread;
use tracing::{error, info};
use winit::event_loop::EventLoop;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let participant = cli.participant()?;
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate().context("checking configuration")?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let plan = TrialPlan::build(config.valid_trials, config.invalid_trials, &mut rng)?;

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let files = SessionFiles::new(&cli.output_dir, &participant);
    let recorder = SessionRecorder::create(&files.log)?;
    let font = load_font(cli.font.as_deref())?;

    println!("=== POSNER SPATIAL CUEING ===");
    println!("Participant: {participant}");
    println!(
        "Trials: {} valid, {} invalid",
        config.valid_trials, config.invalid_trials
    );
    println!("Log: {}", files.log.display());
    println!("Press ESC to abort.\n");

    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    let proxy = event_loop.create_proxy();
    let (key_tx, key_rx) = mpsc::channel();
    let timer = HighPrecisionTimer::new();

    let engine = {
        let timer = timer.fork();
        let config = config.clone();
        let chart_font = cli.font.clone();
        let files = files.clone();
        thread::Builder::new()
            .name("engine".into())
            .spawn(move || {
                let mut surface = WindowSurface::new(proxy);
                let mut input = ChannelInput::new(key_rx, timer.clone());
                let mut reporters: Vec<Box<dyn Reporter + Send>> = vec![
                    Box::new(ConsoleReporter::stdout()),
                    Box::new(ChartReporter::new(
                        &files.chart,
                        load_font(chart_font.as_deref()).ok().flatten(),
                    )),
                ];
                let mut session =
                    Session::new(&config, timer, rng).with_summary_path(&files.summary);
                let result =
                    session.run(&plan, recorder, &mut surface, &mut input, &mut reporters);
                surface.finish();
                result
            })
            .context("starting engine thread")?
    };

    let mut app = App::new(config.layout.clone(), font, cli.windowed, timer, key_tx);
    let shown = event_loop.run_app(&mut app);
    app.log_frame_stats();
    let aborted = app.aborted();
    // Closes the key channel so a waiting engine wakes up.
    drop(app);

    let outcome = engine
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?;
    shown.context("running event loop")?;

    match outcome {
        Ok(means) => {
            info!(
                valid_ms = means.valid_ms,
                invalid_ms = means.invalid_ms,
                "session complete"
            );
            println!("\nSession complete. Results saved to {}", files.log.display());
            Ok(())
        }
        Err(e) if aborted => {
            error!(error = %e, "session stopped early");
            Err(anyhow!("session aborted after: {e}"))
        }
        Err(e) => Err(e).context("session failed"),
    }
}

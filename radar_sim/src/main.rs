// radar_sim/src/main.rs

//! Runs the sonar radar against the simulated board, in a window or headless.

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use radar_core::prelude::*;
use radar_sim::board::SimulatedBoard;
use radar_sim::cli::Cli;
use radar_sim::config::AppConfig;
use radar_sim::display::{RadarDisplayPlugin, RadarView};
use radar_sim::headless::HeadlessPlugin;
use radar_sim::link::{RadarLink, RadarLinkPlugin, Selection};

const HEADLESS_FRAME: Duration = Duration::from_millis(33);

fn main() -> AppExit {
    let cli = Cli::parse();

    // --- 1. Configuration (nothing touches the board before this passes) ---
    let mut config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("radar_sim: {}: {e}", cli.config.display());
            return AppExit::error();
        }
    };
    if cli.seed.is_some() {
        config.simulation.seed = cli.seed;
    }
    let run_for = match Duration::try_from_secs_f64(cli.duration) {
        Ok(run_for) => run_for,
        Err(e) => {
            eprintln!("radar_sim: invalid --duration {}: {e}", cli.duration);
            return AppExit::error();
        }
    };

    // --- 2. Bevy Plugins & Logging ---
    let mut app = App::new();
    let log = LogPlugin {
        level: Level::INFO,
        filter: cli.log_filter.clone(),
        ..default()
    };
    if cli.headless {
        app.add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(HEADLESS_FRAME)),
            log,
            HeadlessPlugin::new(run_for),
        ));
    } else {
        let size = RadarView::new(&config.radar.display).window_size();
        app.add_plugins(DefaultPlugins.set(log).set(WindowPlugin {
            primary_window: Some(Window {
                title: "Sonar Radar".into(),
                resolution: (size.x, size.y).into(),
                resizable: false,
                ..default()
            }),
            ..default()
        }));
    }

    if cli.config.exists() {
        info!("Loaded configuration from {}", cli.config.display());
    } else {
        warn!("{} not found, using defaults", cli.config.display());
    }

    // --- 3. Board & Radar Runtime ---
    let board = match SimulatedBoard::new(&config.radar, &config.simulation) {
        Ok(board) => Arc::new(board),
        Err(e) => {
            error!("could not build the simulated board: {e}");
            return AppExit::error();
        }
    };
    let runtime = match RadarRuntime::start(config.radar.clone(), board.clone()) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("radar failed to start: {e}");
            return AppExit::error();
        }
    };

    let link = RadarLink(runtime.handle());
    let mut selection = Selection::default();
    if let Some((x, y)) = cli.target_point() {
        selection.aim(&link, TargetPoint::new(x, y));
    }
    app.insert_resource(selection).add_plugins(RadarLinkPlugin {
        handle: link.0.clone(),
        max_angle: config.radar.sweep.max_angle,
    });
    if !cli.headless {
        app.add_plugins(RadarDisplayPlugin::new(&config.radar, Some(board)));
    }

    // --- 4. Run, then stop the radar in order ---
    let exit = app.run();
    match runtime.shutdown() {
        Ok(()) => exit,
        Err(e) => {
            error!("radar shut down with an error: {e}");
            AppExit::error()
        }
    }
}

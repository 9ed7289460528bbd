use anyhow::Context;
use chrono::Utc;
use log::*;
use std::env;
use std::fs::read_to_string;
use std::process::ExitCode;

mod catalog;
mod config;
mod dashboard;
mod error;
mod history;
mod insights;
mod live;
mod reading;
mod sample;
mod scheduler;
mod server;
mod source;
#[cfg(test)]
mod testutil;

use config::Config;
use history::InfluxHistory;
use live::HomeAssistant;
use reading::{QueryWindow, SensorId};
use sample::SampleSource;

const SNAPSHOT_JOB: &str = "snapshot";

fn usage(program: &str) {
    eprintln!("Usage: {program} [--config <secrets.json>] [SUBCOMMAND] [OPTIONS]");
    eprintln!("Subcommands:");
    eprintln!("    serve [address]                   start the daemon (default: 127.0.0.1:6969)");
    eprintln!("    test live <sensor_id>             fetch the current reading of one sensor");
    eprintln!("    test history <sensor_id>          fetch today's readings of one sensor");
    eprintln!("    test snapshot [--cache]           build the dashboard snapshot (or print the cached one)");
}

fn build_snapshot(config: &Config) -> anyhow::Result<String> {
    let now = Utc::now();
    let window = QueryWindow::since_today_at(server::DAY_START_HOUR, now);
    let live = HomeAssistant::new(&config.api)?;
    let history = InfluxHistory::new(&config.influxdb)?;

    let snapshot = match dashboard::build(&live, &history, &window, now) {
        Ok(snapshot) => snapshot,
        Err(err) if config.sample_fallback => {
            warn!("Live data unavailable ({err}), generating sample data");
            dashboard::build(&SampleSource, &SampleSource, &window, now)?
        }
        Err(err) => return Err(err.into()),
    };
    Ok(serde_json::to_string(&snapshot)?)
}

fn start_scheduler(config: &Config) {
    let config = config.clone();
    scheduler::Job::new(SNAPSHOT_JOB, config.refresh_secs, move || {
        build_snapshot(&config)
            .map_err(|err| error!("Snapshot refresh failed: {err:#}"))
            .ok()
    })
    .run();
}

fn serve(config: &Config, address: &str) -> anyhow::Result<()> {
    start_scheduler(config);

    let api = if config.sample_fallback && config.api.token.is_empty() {
        warn!("No API token configured, serving sample data");
        server::Api::new(Box::new(SampleSource), Box::new(SampleSource), scheduler::get_cache_fp(SNAPSHOT_JOB))
    } else {
        server::Api::new(
            Box::new(HomeAssistant::new(&config.api)?),
            Box::new(InfluxHistory::new(&config.influxdb)?),
            scheduler::get_cache_fp(SNAPSHOT_JOB),
        )
    };
    server::start(address, api)
}

fn run_test(config: &Config, target: &str, arg: Option<String>) -> anyhow::Result<String> {
    match target {
        "live" => {
            let sensor_id = SensorId::new(arg.context("'test live' requires a sensor id")?);
            let reading = HomeAssistant::new(&config.api)?.latest(&sensor_id)?;
            Ok(serde_json::to_string_pretty(&reading)?)
        }
        "history" => {
            let sensor_id = SensorId::new(arg.context("'test history' requires a sensor id")?);
            let window = QueryWindow::since_today_at(server::DAY_START_HOUR, Utc::now());
            let history = InfluxHistory::new(&config.influxdb)?;
            let readings = match catalog::SensorKind::from_entity_id(&sensor_id) {
                Some((_, kind)) => history.readings_in(kind.unit(), &sensor_id, &window)?,
                None => history.readings(&sensor_id, &window)?,
            };
            Ok(serde_json::to_string_pretty(&readings)?)
        }
        "snapshot" if arg.as_deref() == Some("--cache") => {
            let cache_fp = scheduler::get_cache_fp(SNAPSHOT_JOB);
            read_to_string(&cache_fp).with_context(|| format!("failed to read cache file '{}'", cache_fp.display()))
        }
        "snapshot" => build_snapshot(config),
        _ => anyhow::bail!("unknown test target '{target}'"),
    }
}

fn entry() -> anyhow::Result<()> {
    let mut args = env::args().peekable();
    let program = args.next().unwrap_or_else(|| "sensorboard".into());

    let mut config_path = None;
    if args.peek().map(String::as_str) == Some("--config") {
        args.next();
        config_path = Some(args.next().context("--config requires a path")?);
    }

    let Some(subcommand) = args.next() else {
        usage(&program);
        anyhow::bail!("no subcommand is provided");
    };

    let config = Config::from_file(&Config::locate(config_path.as_deref())?)?;

    match subcommand.as_str() {
        "serve" => {
            let address = args.next().unwrap_or("127.0.0.1:6969".to_string());
            serve(&config, &address)
        }

        "test" => {
            let Some(target) = args.next() else {
                usage(&program);
                anyhow::bail!("'test' requires a target: live, history, or snapshot");
            };
            let result = run_test(&config, &target, args.next())?;
            println!("{result}");
            Ok(())
        }

        _ => {
            usage(&program);
            anyhow::bail!("unknown subcommand {subcommand}")
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match entry() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

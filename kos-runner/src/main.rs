use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use kos_script::{
    persist::{save_variables, SavedVariable},
    Cpu, FlightControlBinding, LoggerConfig, OutputSink,
};

use config::RunnerConfig;

mod config;
mod listing;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML opcode listing to run.
    #[clap(short, long)]
    listing: PathBuf,
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Give up after this many ticks.
    #[clap(short, long, default_value_t = 1000)]
    ticks: usize,
    /// Seconds per tick.
    #[clap(short, long, default_value_t = 0.02)]
    delta: f64,
    /// Run as a program context instead of typing it into the interpreter.
    #[clap(short, long)]
    program: bool,
    /// Variables to replay before the listing runs.
    #[clap(long)]
    restore: Option<PathBuf>,
    /// Where to write the variables left at the end.
    #[clap(long)]
    save: Option<PathBuf>,
}

fn init_logger(config: &LoggerConfig) {
    env_logger::Builder::new()
        .filter_level(config.level_filter)
        .filter_module("kos_script", config.app_level_filter)
        .filter_module("kos_runner", config.app_level_filter)
        .parse_default_env()
        .init();
}

fn read_saved(path: &Path) -> Result<Vec<SavedVariable>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_saved(path: &Path, cpu: &Cpu) -> Result<()> {
    let saved = save_variables(cpu);
    std::fs::write(path, serde_yaml::to_string(&saved)?).with_context(|| format!("writing {}", path.display()))?;
    log::info!("saved {} variables to {}", saved.len(), path.display());
    Ok(())
}

/// Tick until nothing is left to do. Returns the number of ticks run.
fn drive(cpu: &mut Cpu, max_ticks: usize, delta: f64) -> usize {
    for tick in 0..max_ticks {
        if cpu.is_idle() {
            return tick;
        }
        cpu.update(delta);
    }
    max_ticks
}

fn build_cpu(config: &RunnerConfig, output: impl OutputSink + 'static) -> Cpu {
    Cpu::builder()
        .config(config.cpu.clone())
        .binding(FlightControlBinding::new(config.channels.iter().cloned()))
        .output(output)
        .build()
}

fn run(args: &Args, config: &RunnerConfig, output: impl OutputSink + 'static) -> Result<Cpu> {
    let parts = listing::load(&args.listing)?;
    let mut cpu = build_cpu(config, output);

    if let Some(path) = &args.restore {
        let saved = read_saved(path)?;
        cpu.restore_variables(&saved).context("replaying saved variables")?;
        drive(&mut cpu, args.ticks, args.delta);
    }

    if args.program {
        cpu.run_program(parts, false).context("linking program")?;
    } else {
        cpu.run_command(parts).context("linking command")?;
    }

    let ticks = drive(&mut cpu, args.ticks, args.delta);
    if cpu.is_idle() {
        log::info!("idle after {ticks} ticks ({:.2}s)", cpu.session_time());
    } else {
        log::warn!("still busy after {ticks} ticks");
    }

    if let Some(path) = &args.save {
        write_saved(path, &cpu)?;
    }
    Ok(cpu)
}

fn main() {
    let args = Args::parse();
    let config = match RunnerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logger(&LoggerConfig::default());
            log::error!("Error: {:#}", e);
            std::process::exit(2);
        }
    };
    init_logger(&config.logger);

    if let Err(e) = run(&args, &config, kos_script::ConsoleOutput) {
        log::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

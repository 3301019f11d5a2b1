mod options;

use cachesim::{config, report, trace, MemorySystem};
use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use options::{Command, Format, Options};
use rand::SeedableRng;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

fn load_config(path: Option<&Path>) -> eyre::Result<config::Hierarchy> {
    match path {
        Some(path) => config::Hierarchy::load(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display())),
        None => Ok(config::Hierarchy::default()),
    }
}

fn run(options: &options::Run) -> eyre::Result<()> {
    let config = load_config(options.config.as_deref())?;
    let mut system = MemorySystem::new(&config)?;

    let start = Instant::now();
    let references = trace::open(&options.trace)?;
    let summary = trace::run(&mut system, references)
        .wrap_err_with(|| format!("failed to run trace {}", options.trace.display()))?;
    if options.flush {
        system.flush();
    }
    log::info!("simulated {} references in {:?}", summary.references, start.elapsed());

    let report = report::Report::new(&system, &config.latency, summary);
    let mut stdout = std::io::stdout().lock();
    match options.format {
        Format::Text => report::write_text(&report, &mut stdout)?,
        Format::Csv => report::write_csv(&system, &mut stdout)?,
        Format::Json => {
            report::write_json(&report, &mut stdout)?;
            writeln!(stdout)?;
        }
    }
    if options.dump {
        for cache in system.levels() {
            writeln!(stdout)?;
            report::write_lines(cache, &mut stdout)?;
        }
    }
    Ok(())
}

fn sweep(options: &options::Sweep) -> eyre::Result<()> {
    let mut config = load_config(options.config.as_deref())?;
    if config.level(&options.level).is_none() {
        eyre::bail!("unknown cache level {:?}", options.level);
    }

    let output: Box<dyn Write> = match &options.output {
        Some(path) => Box::new(utils::fs::open_writable(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(output);

    for &associativity in &options.associativity {
        if let Some(level) = config.level_mut(&options.level) {
            level.associativity = associativity;
        }
        let mut system = MemorySystem::new(&config)
            .wrap_err_with(|| format!("invalid {}-way {}", associativity, options.level))?;
        let summary = trace::run(&mut system, trace::open(&options.trace)?)?;
        log::info!(
            "{}-way {}: {} references",
            associativity,
            options.level,
            summary.references
        );
        writer.serialize(report::SweepRow::new(
            associativity,
            &system,
            &config.latency,
        ))?;
    }
    writer.flush()?;
    Ok(())
}

fn generate(options: &options::Generate) -> eyre::Result<()> {
    let mut rng = match options.seed {
        Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
        None => rand::rngs::StdRng::from_entropy(),
    };
    let references = trace::generate(&mut rng, options.count);
    let written = match &options.output {
        Some(path) => trace::write(references, utils::fs::open_writable(path)?),
        None => trace::write(references, std::io::stdout().lock()),
    }
    .wrap_err("failed to write trace")?;
    log::info!("generated {written} references");
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let options = Options::parse();
    let level = match options.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match &options.command {
        Command::Run(run_options) => run(run_options),
        Command::Sweep(sweep_options) => sweep(sweep_options),
        Command::Generate(generate_options) => generate(generate_options),
    }
}

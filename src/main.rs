mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use cli::{Cli, Command, InspectArgs, ProcessArgs};
use spectrobars::analysis::{Analyzer, LogObserver};
use spectrobars::audio::decode::decode_audio;
use spectrobars::config::{self, AnalysisConfig, Config};
use spectrobars::format::{self, DocumentReader};
use spectrobars::inspect;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let cfg = match config::find_config_path(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None if cli.config.is_some() => {
                anyhow::bail!("Failed to load config from {}", path.display());
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };
    let data_dir = cli.data_dir.clone().unwrap_or(cfg.paths.data_dir);

    match cli.command {
        Command::Process(args) => process(&args, cfg.analysis, &data_dir),
        Command::Inspect(args) => inspect(&args, &data_dir),
    }
}

fn song_dir(data_dir: &Path, song: &str) -> PathBuf {
    data_dir.join("songs").join(song)
}

fn process(args: &ProcessArgs, mut analysis: AnalysisConfig, data_dir: &Path) -> Result<()> {
    // CLI flags win over the config file
    if let Some(v) = args.block_size { analysis.block_size = v; }
    if let Some(v) = args.num_bars { analysis.num_bars = v; }
    if let Some(v) = args.freq_min { analysis.freq_min = v; }
    if let Some(v) = args.freq_max { analysis.freq_max = v; }
    if let Some(v) = args.min_vol { analysis.min_vol = v; }
    if let Some(v) = args.max_vol { analysis.max_vol = v; }
    if let Some(v) = args.kaiser_beta { analysis.kaiser_beta = v; }

    let dir = song_dir(data_dir, &args.song);
    let input = args.input.clone().unwrap_or_else(|| dir.join("audio.flac"));
    let output = args.output.clone().unwrap_or_else(|| dir.join("spectrum.bin"));

    if !input.exists() {
        cli::missing_file_error("process", "Input audio file", &input).exit();
    }

    log::info!("Processing: {} ({})", args.song, input.display());
    log::info!("Output: {}", output.display());

    let audio = decode_audio(&input)
        .with_context(|| format!("Bad input audio: {}", input.display()))?;

    let analyzer = Analyzer::new(&analysis, audio.sample_rate).context("Bad analysis config")?;
    let num_blocks = analyzer.block_count(audio.samples.len());

    let pb = ProgressBar::new(num_blocks as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} blocks ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let observer = LogObserver;
    let mut analyzer = analyzer.with_progress(pb.clone());
    if args.trace_blocks {
        analyzer = analyzer.with_observer(&observer);
    }

    let doc = analyzer
        .run(&audio.samples)
        .with_context(|| format!("Bad input audio: {}", input.display()))?;
    pb.finish_with_message("Analysis complete");

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    format::write_document_atomic(&output, &doc)
        .with_context(|| format!("Failed to write spectrum document: {}", output.display()))?;

    log::info!(
        "Done! {} frames of {} bars ({:.1}s) written to {}",
        doc.frames.len(),
        doc.header.num_bars,
        doc.duration_secs(),
        output.display()
    );
    Ok(())
}

fn inspect(args: &InspectArgs, data_dir: &Path) -> Result<()> {
    let path = args
        .input
        .clone()
        .unwrap_or_else(|| song_dir(data_dir, &args.song).join("spectrum.bin"));

    if !path.exists() {
        cli::missing_file_error("inspect", "Spectrum document", &path).exit();
    }
    log::info!("Reading spectrum document from {}", path.display());

    let file = File::open(&path)
        .with_context(|| format!("Failed to open spectrum document: {}", path.display()))?;
    let mut reader = DocumentReader::open(BufReader::new(file))
        .with_context(|| format!("Bad spectrum document: {}", path.display()))?;

    if args.frames {
        for (i, frame) in reader.frames().enumerate() {
            let frame = frame.with_context(|| format!("Failed to read frame {}", i))?;
            println!("Block {:5}: {}", i, inspect::render_bar_row(&frame));
        }
    }

    if let Some(index) = args.frame {
        let frame = reader
            .frame(index)
            .with_context(|| format!("Failed to read frame {}", index))?
            .with_context(|| {
                format!("Frame {} out of range (document has {} frames)", index, reader.frame_count())
            })?;
        println!("Block {}: {:?}", index, frame.as_slice());
        println!("         {}", inspect::render_bar_row(&frame));
    }

    if args.json {
        let json = serde_json::to_string_pretty(reader.header()).context("Failed to encode header")?;
        println!("{}", json);
    } else {
        for line in inspect::header_summary(reader.header(), reader.frame_count()) {
            println!("{}", line);
        }
    }
    Ok(())
}

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "spectrobars", about = "Precomputes spectrum bar frames for music visualization")]
pub struct Cli {
    /// Config file (defaults to spectrobars.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding songs/<name>/
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a song's audio and write its spectrum document
    Process(ProcessArgs),
    /// Print the header and frames of a spectrum document
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Song name (reads <data-dir>/songs/<song>/audio.flac)
    pub song: String,

    /// Audio file to analyze instead of the song's audio.flac
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Document to write instead of the song's spectrum.bin
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Samples per block
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Bars per frame
    #[arg(long)]
    pub num_bars: Option<usize>,

    /// Lowest frequency covered by the bars (Hz)
    #[arg(long)]
    pub freq_min: Option<f32>,

    /// Highest frequency covered by the bars (Hz)
    #[arg(long)]
    pub freq_max: Option<f32>,

    /// dB level shown as an empty bar
    #[arg(long, allow_hyphen_values = true)]
    pub min_vol: Option<f32>,

    /// dB level shown as a full bar
    #[arg(long, allow_hyphen_values = true)]
    pub max_vol: Option<f32>,

    /// Kaiser window shape parameter
    #[arg(long)]
    pub kaiser_beta: Option<f32>,

    /// Log the spectrum peak and bars of every block
    #[arg(long)]
    pub trace_blocks: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Song name (reads <data-dir>/songs/<song>/spectrum.bin)
    pub song: String,

    /// Document to read instead of the song's spectrum.bin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Print every frame as a row of bars
    #[arg(long)]
    pub frames: bool,

    /// Print a single frame by index
    #[arg(long, conflicts_with = "frames")]
    pub frame: Option<usize>,

    /// Print the header as JSON
    #[arg(long)]
    pub json: bool,
}

/// Usage error for an input file that does not exist; exits with clap's usage status.
pub fn missing_file_error(subcommand: &str, what: &str, path: &Path) -> clap::Error {
    let mut cmd = Cli::command();
    let msg = format!("{} not found: {}", what, path.display());
    match cmd.find_subcommand_mut(subcommand) {
        Some(sub) => sub.error(ErrorKind::ValueValidation, msg),
        None => cmd.error(ErrorKind::ValueValidation, msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_requires_a_song() {
        let err = Cli::try_parse_from(["spectrobars", "process"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["spectrobars"]).is_err());
    }

    #[test]
    fn process_flags_parse() {
        let cli = Cli::try_parse_from([
            "spectrobars",
            "--data-dir",
            "/tmp/data",
            "process",
            "song",
            "--num-bars",
            "64",
            "--min-vol",
            "-90",
            "--trace-blocks",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/data")));
        match cli.command {
            Command::Process(args) => {
                assert_eq!(args.song, "song");
                assert_eq!(args.num_bars, Some(64));
                assert_eq!(args.min_vol, Some(-90.0));
                assert!(args.trace_blocks);
                assert!(args.block_size.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn inspect_frame_and_frames_conflict() {
        let err = Cli::try_parse_from(["spectrobars", "inspect", "song", "--frames", "--frame", "3"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn missing_file_reports_usage() {
        let err = missing_file_error("process", "Input audio file", Path::new("data/songs/x/audio.flac"));
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_ne!(err.exit_code(), 0);
        let rendered = err.render().to_string();
        assert!(rendered.contains("data/songs/x/audio.flac"), "{}", rendered);
        assert!(rendered.contains("Usage:"), "{}", rendered);
    }
}

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Posner spatial-cueing reaction-time experiment.
#[derive(Parser, Debug)]
#[command(name = "posner", author, version, about)]
pub struct Cli {
    /// Participant name; also names the output files. Asked for when omitted.
    #[arg(short, long)]
    pub participant: Option<String>,

    /// JSON file overriding the default session parameters.
    #[arg(short, long, env = "POSNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the trial log, summary and chart.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// TrueType font for on-screen text and chart labels.
    #[arg(long, env = "POSNER_FONT")]
    pub font: Option<PathBuf>,

    /// Open a window of the configured display size instead of fullscreen.
    #[arg(long)]
    pub windowed: bool,

    /// Seed for trial order and cue sides; overrides the config file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn participant(&self) -> Result<String> {
        let name = match &self.participant {
            Some(name) => name.clone(),
            None => prompt("Participant name: ")?,
        };
        check_participant(name.trim())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading participant name")?;
    Ok(line)
}

/// The name becomes a file stem, so it must be a single path component.
fn check_participant(name: &str) -> Result<String> {
    if name.is_empty() {
        bail!("participant name is empty");
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        bail!("participant name '{name}' cannot be used as a file name");
    }
    Ok(name.to_string())
}

/// Files written for one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFiles {
    pub log: PathBuf,
    pub summary: PathBuf,
    pub chart: PathBuf,
}

impl SessionFiles {
    pub fn new(dir: &Path, participant: &str) -> Self {
        Self {
            log: dir.join(format!("{participant}.tsv")),
            summary: dir.join(format!("{participant}.summary.json")),
            chart: dir.join(format!("{participant}.means.png")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "posner", "-p", "p01", "--output-dir", "out", "--seed", "7", "--windowed", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.participant().unwrap(), "p01");
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.seed, Some(7));
        assert!(cli.windowed);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["posner", "-p", "p01"]).unwrap();
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert!(!cli.windowed);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn participant_must_be_a_plain_file_stem() {
        assert_eq!(check_participant("anna").unwrap(), "anna");
        assert!(check_participant("").is_err());
        assert!(check_participant("..").is_err());
        assert!(check_participant("a/b").is_err());
        assert!(check_participant("a\\b").is_err());
    }

    #[test]
    fn output_files_are_named_after_the_participant() {
        let files = SessionFiles::new(Path::new("out"), "p01");
        assert_eq!(files.log, Path::new("out/p01.tsv"));
        assert_eq!(files.summary, Path::new("out/p01.summary.json"));
        assert_eq!(files.chart, Path::new("out/p01.means.png"));
    }
}

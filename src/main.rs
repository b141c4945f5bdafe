use anyhow::{Context, Result};
use beholder::config::{Config, ConfigOverrides, Credentials};
use beholder::pipeline::{Pipeline, RunOptions};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Bot for Extracting & Highlighting Outstanding Literature, Evaluations & Reviews.
///
/// Searches Semantic Scholar for recent papers on your watch terms, downloads
/// them, writes a podcast script with Gemini and narrates it.
///
/// Needs `G_API_KEY` in the environment or a `.env` file, plus:
///   watch_terms.txt    search terms, one per line
///   script_prompt.txt  system prompt, may use {DAYS_BACK} and {INTERESTS}
#[derive(Parser, Debug)]
#[command(name = "beholder", version, about, long_about = None)]
struct Cli {
    /// Folder where papers are stored and the podcast is written
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Areas of interest for the script prompt, defaults to the watch terms
    #[arg(short, long, num_args = 1..)]
    interests: Vec<String>,

    /// How many days back to search
    #[arg(short, long)]
    days_back: Option<u32>,

    /// Search results requested per watch term
    #[arg(short = 'c', long = "search-chunk")]
    search_chunk: Option<u32>,

    /// Gemini model used for the script
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature for the script
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Maximum output tokens for the script
    #[arg(short = 's', long)]
    max_tokens: Option<u32>,

    /// Text-to-speech language code
    #[arg(short, long)]
    language: Option<String>,

    /// Text-to-speech voice name
    #[arg(short, long)]
    voice: Option<String>,

    /// Semantic Scholar fields of study
    #[arg(short, long, num_args = 1..)]
    fields_of_study: Vec<String>,

    /// Watch terms file
    #[arg(short, long, default_value = "watch_terms.txt")]
    watch_terms: PathBuf,

    /// Script prompt file
    #[arg(short = 'p', long, default_value = "script_prompt.txt")]
    script_prompt: PathBuf,

    /// Skip paper retrieval and use this folder of papers
    #[arg(long, value_name = "DIR")]
    from_papers: Option<PathBuf>,

    /// Skip retrieval and generation, narrate this saved script
    #[arg(long, value_name = "JSON", conflicts_with = "from_papers")]
    from_script: Option<PathBuf>,

    /// Save the generated script to <output>/script.json
    #[arg(long)]
    save_script: bool,

    /// Stop after retrieving papers
    #[arg(long)]
    no_podcast: bool,

    /// Stop after generating the script
    #[arg(long)]
    no_audio: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            days_back: self.days_back,
            search_limit: self.search_chunk,
            fields_of_study: (!self.fields_of_study.is_empty())
                .then(|| self.fields_of_study.clone()),
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_tokens,
            language: self.language.clone(),
            voice: self.voice.clone(),
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_directive = if verbose {
        "beholder=debug"
    } else {
        "beholder=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(atty::is(atty::Stream::Stderr)).init();
    }
}

/// One term per line, surrounding whitespace and blank lines dropped
fn read_watch_terms(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read watch terms from {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    config
        .apply_overrides(cli.overrides())
        .context("invalid command line options")?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let credentials = Credentials::from_env()
        .context("loading G_API_KEY from the environment failed, check your .env file")?;

    // Watch terms are only needed to search or as default interests
    let needs_watch_terms =
        cli.from_script.is_none() && (cli.from_papers.is_none() || cli.interests.is_empty());
    let watch_terms = if needs_watch_terms {
        read_watch_terms(&cli.watch_terms)?
    } else {
        Vec::new()
    };

    let options = RunOptions {
        output: cli.output,
        watch_terms,
        interests: cli.interests,
        prompt_path: cli.script_prompt,
        from_papers: cli.from_papers,
        from_script: cli.from_script,
        save_script: cli.save_script,
        no_podcast: cli.no_podcast,
        no_audio: cli.no_audio,
    };

    let pipeline = Pipeline::new(config, credentials);
    match pipeline.run(&options).await {
        Ok(summary) => {
            if let Some(path) = summary.podcast_path {
                info!("Podcast written to {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags_match_the_documented_ones() {
        let cli = Cli::try_parse_from([
            "beholder", "-o", "out", "-d", "7", "-c", "20", "-m", "gemini-2.0-flash", "-t",
            "1.1", "-s", "1000", "-l", "fr-FR", "-v", "fr-FR-Voice", "-f", "Physics", "Biology",
            "-w", "terms.txt", "-p", "prompt.txt",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(overrides.days_back, Some(7));
        assert_eq!(overrides.search_limit, Some(20));
        assert_eq!(overrides.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(overrides.max_output_tokens, Some(1000));
        assert_eq!(overrides.voice.as_deref(), Some("fr-FR-Voice"));
        assert_eq!(
            overrides.fields_of_study,
            Some(vec!["Physics".to_string(), "Biology".to_string()])
        );
        assert_eq!(cli.watch_terms, PathBuf::from("terms.txt"));
    }

    #[test]
    fn test_defaults_leave_config_alone() {
        let cli = Cli::try_parse_from(["beholder"]).unwrap();
        let overrides = cli.overrides();

        assert!(overrides.fields_of_study.is_none());
        assert!(overrides.days_back.is_none());
        assert_eq!(cli.script_prompt, PathBuf::from("script_prompt.txt"));
    }

    #[test]
    fn test_from_script_conflicts_with_from_papers() {
        assert!(Cli::try_parse_from([
            "beholder",
            "--from-papers",
            "p",
            "--from-script",
            "s.json"
        ])
        .is_err());
    }

    #[test]
    fn test_watch_terms_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.txt");
        std::fs::write(&path, "  retrieval augmented generation \n\nagents\n").unwrap();

        assert_eq!(
            read_watch_terms(&path).unwrap(),
            vec!["retrieval augmented generation", "agents"]
        );
    }
}

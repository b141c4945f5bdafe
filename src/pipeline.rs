//! End-to-end run: acquire papers, write a script, render the podcast

use crate::acquisition::{
    AcquisitionBatch, AcquisitionReport, TieredAcquisitionEngine, WkhtmltopdfRenderer,
};
use crate::audio::{
    decode_file, write_wav, AudioFormat, AudioTimelineBuilder, BackgroundMusicMixer,
    SoundEffectCatalog,
};
use crate::client::SearchClient;
use crate::config::{Config, Credentials};
use crate::discovery::DateWindow;
use crate::script::{
    collect_paper_contents, load_script, render_prompt, save_script, GeminiScriptGenerator,
    ScriptGenerator, Turn,
};
use crate::tts::{GoogleTtsSynthesizer, SpeechSynthesizer};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

pub const SCRIPT_FILE: &str = "script.json";
pub const PODCAST_FILE: &str = "podcast.wav";

/// What a single invocation should do
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output: PathBuf,
    pub watch_terms: Vec<String>,
    /// Interests listed in the prompt, the watch terms when empty
    pub interests: Vec<String>,
    pub prompt_path: PathBuf,
    /// Use an existing papers folder instead of searching
    pub from_papers: Option<PathBuf>,
    /// Render a saved script instead of generating one
    pub from_script: Option<PathBuf>,
    pub save_script: bool,
    pub no_podcast: bool,
    pub no_audio: bool,
}

impl RunOptions {
    fn interests(&self) -> &[String] {
        if self.interests.is_empty() {
            &self.watch_terms
        } else {
            &self.interests
        }
    }
}

/// What a run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub papers_folder: Option<PathBuf>,
    pub acquisition: Option<AcquisitionReport>,
    pub turns: usize,
    pub script_path: Option<PathBuf>,
    pub podcast_path: Option<PathBuf>,
}

/// Wires the configured collaborators together for one run
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    credentials: Credentials,
}

impl Pipeline {
    #[must_use]
    pub const fn new(config: Config, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// `<output>/Papers_<start>_<end>`
    #[must_use]
    pub fn papers_folder(output: &Path, window: &DateWindow) -> PathBuf {
        output.join(format!("Papers_{}", window.folder_label()))
    }

    #[instrument(skip_all, fields(output = %options.output.display()))]
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        tokio::fs::create_dir_all(&options.output).await?;
        let mut summary = RunSummary::default();

        let turns = if let Some(script_path) = &options.from_script {
            info!("Rendering saved script {}", script_path.display());
            load_script(script_path).await?
        } else {
            let window = DateWindow::ending_today(self.config.search.days_back)?;
            info!("Running {} paper review", window);

            let folder = match &options.from_papers {
                Some(folder) => {
                    info!(
                        "Skipping paper retrieval, using {} as paper folder",
                        folder.display()
                    );
                    folder.clone()
                }
                None => {
                    let folder = Self::papers_folder(&options.output, &window);
                    let report = self
                        .acquire_papers(&options.watch_terms, &window, &folder)
                        .await?;
                    info!(
                        "Generating script for {} papers ({} considered)",
                        report.acquired(),
                        report.candidates_considered
                    );
                    summary.acquisition = Some(report);
                    folder
                }
            };
            summary.papers_folder = Some(folder.clone());

            if options.no_podcast {
                return Ok(summary);
            }

            let template = tokio::fs::read_to_string(&options.prompt_path).await?;
            let prompt = render_prompt(&template, self.config.search.days_back, options.interests());
            let turns = self.generate_script(&folder, &prompt).await?;

            if options.save_script {
                let path = options.output.join(SCRIPT_FILE);
                save_script(&path, &turns).await?;
                info!("Script saved to {}", path.display());
                summary.script_path = Some(path);
            }
            turns
        };
        summary.turns = turns.len();

        if options.no_audio {
            return Ok(summary);
        }

        let path = options.output.join(PODCAST_FILE);
        let synthesizer =
            GoogleTtsSynthesizer::new(&self.config.audio, self.credentials.g_api_key.clone())?;
        self.render_podcast(&turns, &synthesizer, &path).await?;
        summary.podcast_path = Some(path);

        info!("All done! Enjoy :)");
        Ok(summary)
    }

    /// Search every watch term and acquire eligible papers into `folder`
    pub async fn acquire_papers(
        &self,
        watch_terms: &[String],
        window: &DateWindow,
        folder: &Path,
    ) -> Result<AcquisitionReport> {
        if watch_terms.is_empty() {
            return Err(Error::InvalidInput {
                field: "watch_terms".to_string(),
                reason: "at least one watch term is required".to_string(),
            });
        }
        info!("Search terms:\n{}", watch_terms.join("\n"));

        let search =
            SearchClient::new(&self.config.search, self.credentials.s2_api_key.clone())?;
        let renderer = Arc::new(WkhtmltopdfRenderer::new(
            self.config.acquisition.wkhtmltopdf.clone(),
            Duration::from_secs(self.config.acquisition.render_timeout_secs),
        ));
        let engine = TieredAcquisitionEngine::new(&self.config.acquisition, renderer)?;

        AcquisitionBatch::new(
            &search,
            &engine,
            *window,
            self.config.search.fields_of_study.clone(),
            self.config.search.limit,
        )
        .acquire_all(watch_terms, folder)
        .await
    }

    /// Collect the folder's papers and ask the model for a script
    pub async fn generate_script(&self, folder: &Path, prompt: &str) -> Result<Vec<Turn>> {
        let contents = collect_paper_contents(folder).await?;
        let generator = GeminiScriptGenerator::new(
            self.config.script.clone(),
            self.credentials.g_api_key.clone(),
        )?;
        generator.generate(&contents, prompt).await
    }

    /// Build the timeline, mix the background music and export to `path`
    pub async fn render_podcast(
        &self,
        turns: &[Turn],
        synthesizer: &dyn SpeechSynthesizer,
        path: &Path,
    ) -> Result<()> {
        let audio = &self.config.audio;
        let format = AudioFormat::new(audio.sample_rate, audio.channels);

        info!("Generating podcast audio for {} turns", turns.len());
        let catalog = SoundEffectCatalog::load(&audio.effects_dir, format)?;
        let bgm = decode_file(&audio.bgm_path(), format)?;

        let timeline = AudioTimelineBuilder::new(format)
            .build(turns, synthesizer, &catalog)
            .await?;
        let mixed = BackgroundMusicMixer::new(audio.bgm_volume_db, audio.mix_window_policy)
            .mix(&timeline, &bgm)?;

        write_wav(path, &mixed)
    }
}

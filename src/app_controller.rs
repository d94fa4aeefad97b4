use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, TranslationSettings};
use crate::legacy::{LegacyTranslatorChain, build_legacy_translator};
use crate::providers::registry::ProviderRegistry;
use crate::providers::{ModelInfo, ProviderDescriptor, TranslationProvider, build_provider};
use crate::session::{BatchProgress, BatchTranslationSession};
use crate::string_table::{
    BackupService, JsonStringTable, SerializeContext, StringTableSerializer, TimestampedBackup, shared_items,
};
use crate::translation::{LegacyTranslationRouter, TranslationMemory, TranslationRouter, TranslationRouterRequest};

// @module: Application controller wiring configuration into the translation router

/// One `translate` run over a string table
#[derive(Debug, Clone, Default)]
pub struct TranslateJob {
    pub input: PathBuf,
    // @field: Output file, the input is overwritten when unset
    pub output: Option<PathBuf>,
    pub start_index: usize,
    // @field: Last index, inclusive; the end of the table when unset
    pub end_index: Option<usize>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub terminology_paths: Vec<PathBuf>,
    pub use_provider: bool,
    pub skip_backup: bool,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    settings: Arc<RwLock<TranslationSettings>>,
    registry: Arc<ProviderRegistry>,
    router: Arc<TranslationRouter>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let settings = Arc::new(RwLock::new(config.settings.clone()));
        let system_prompt = config.settings.system_prompt.clone();

        let registry = Arc::new(ProviderRegistry::new());
        let mut providers: Vec<Arc<dyn TranslationProvider>> = Vec::with_capacity(config.providers.len());
        for provider_config in &config.providers {
            let provider = build_provider(provider_config, &system_prompt);
            registry.register(Arc::clone(&provider));
            providers.push(provider);
        }

        let mut chain = LegacyTranslatorChain::new();
        for translator_config in &config.legacy_translators {
            chain.push(build_legacy_translator(translator_config));
        }

        let mut legacy = LegacyTranslationRouter::new(chain, Arc::clone(&settings));
        // Later registrations win, as in the registry
        let default_provider = config.settings.default_provider().and_then(|name| {
            providers
                .iter()
                .rev()
                .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
                .cloned()
        });
        if let Some(provider) = default_provider {
            info!("Using {} for requests without provider routing", provider.name());
            legacy = legacy.with_default_provider(provider);
        }

        let router = TranslationRouter::new(Arc::clone(&registry), Arc::new(legacy), Arc::clone(&settings))
            .with_memory(TranslationMemory::new());

        Ok(Self {
            config,
            settings,
            registry,
            router: Arc::new(router),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &Arc<TranslationRouter> {
        &self.router
    }

    /// Registered providers in registration order
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        self.registry.providers()
    }

    /// Models offered by a registered provider
    pub async fn models(&self, provider: &str) -> Result<Vec<ModelInfo>> {
        let models = self
            .registry
            .list_models(provider, &CancellationToken::new())
            .await
            .with_context(|| format!("Failed to list models of {}", provider))?;
        Ok(models)
    }

    /// Request template shared by every item of a job
    pub fn request_template(&self, job: &TranslateJob) -> TranslationRouterRequest {
        let context = self.settings.read().pipeline_context(&job.terminology_paths);
        let template =
            TranslationRouterRequest::new("", &self.config.source_language, &self.config.target_language)
                .with_context(context);
        if job.use_provider {
            template.via_provider(job.provider.clone(), job.model.clone())
        } else {
            template
        }
    }

    /// Translate a range of a JSON string table and write the result.
    ///
    /// Ctrl-C cancels the batch; items translated so far are still written.
    pub async fn run_translate(&self, job: TranslateJob) -> Result<BatchProgress> {
        let start_time = std::time::Instant::now();
        if !job.input.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", job.input));
        }

        let serializer = JsonStringTable;
        let items = shared_items(serializer.deserialize(&job.input)?);
        let session = BatchTranslationSession::new(
            Arc::clone(&self.router),
            Arc::clone(&items),
            job.start_index,
            job.end_index.unwrap_or(usize::MAX),
            self.request_template(&job),
        );
        let range = session.range()?;

        let progress_bar = ProgressBar::new(range.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} strings ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let canceller = session.cancel_handle();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing the current string");
                let _ = canceller.cancel();
            }
        });

        let bar = progress_bar.clone();
        let result = session
            .start_with_progress(move |progress| {
                bar.set_position(progress.completed() as u64);
                if progress.failure_count > 0 {
                    bar.set_message(format!("{} failed", progress.failure_count));
                }
            })
            .await;
        interrupt.abort();
        progress_bar.finish_and_clear();
        let progress = result?;

        let output = job.output.clone().unwrap_or_else(|| job.input.clone());
        if !job.skip_backup {
            TimestampedBackup::new().backup(&output)?;
        }
        let context = SerializeContext::new(&output)
            .with_languages(&self.config.source_language, &self.config.target_language);
        let snapshot = items.read().clone();
        serializer.serialize(&snapshot, &context)?;

        info!(
            "Translated {} of {} strings ({} failed, {} pending) in {}",
            progress.success_count,
            progress.range_size,
            progress.failure_count,
            progress.pending_count,
            Self::format_duration(start_time.elapsed())
        );
        info!("Success: {:?}", output);
        Ok(progress)
    }

    // @returns: Human readable duration
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

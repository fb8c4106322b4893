//! One working session: configuration, stored profiles and the three
//! outside collaborators (data source, license validator, mail client).
//!
//! Preview and generation share one gate; a second run while one is in
//! flight is rejected with `Busy` instead of queued. Profile edits work on
//! a copy and are only stored when the whole edit succeeds.

use crate::config::Config;
use crate::data_source::DataSource;
use crate::error::{DraftMateError, Result};
use crate::generator::{self, GenerateOptions, GenerationReport, LicensePolicy};
use crate::license::{self, LicenseStatus, LicenseValidator};
use crate::mailer::Mailer;
use crate::store::Store;
use chrono::Utc;
use draftmate_common::{
    build_preview, DataSourceConfig, Dataset, PipelineOptions, PreviewRow, Profile, ProfileBook, ProfileSnapshot,
};
use tokio::sync::Mutex;

pub struct Session<S, V, M> {
    config: Config,
    store: Store,
    book: ProfileBook,
    gate: Mutex<()>,
    source: S,
    validator: V,
    mailer: M,
    license: LicensePolicy,
}

impl<S, V, M> Session<S, V, M>
where
    S: DataSource,
    V: LicenseValidator,
    M: Mailer,
{
    /// Open a session over `store`; profiles are read once here.
    pub fn new(config: Config, store: Store, source: S, validator: V, mailer: M) -> Self {
        let book = store.load_book();
        let license = LicensePolicy {
            required: true,
            key_override: Config::env_license_key(),
            recheck_minutes: config.license_recheck_minutes,
        };
        Self {
            config,
            store,
            book,
            gate: Mutex::new(()),
            source,
            validator,
            mailer,
            license,
        }
    }

    /// Turn license checks off (or on) for this session
    pub fn with_license_required(mut self, required: bool) -> Self {
        self.license.required = required;
        self
    }

    pub fn with_license_key(mut self, key: Option<String>) -> Self {
        self.license.key_override = key;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn book(&self) -> &ProfileBook {
        &self.book
    }

    pub fn active(&self) -> &Profile {
        self.book.active()
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        self.book.snapshot()
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn options(&self) -> PipelineOptions {
        self.config.pipeline_options()
    }

    /// Read the active profile's data source.
    pub async fn load(&self) -> Result<Dataset> {
        let snapshot = self.snapshot();
        let dataset = self.source.load(&snapshot.data_source).await?;
        log::info!(
            "loaded {} row(s) from {}",
            dataset.count(),
            snapshot.data_source.location()
        );
        Ok(dataset)
    }

    /// Point the active profile at a new source. The source is read first and
    /// the profile is only changed when that succeeds.
    pub async fn set_data_source(&mut self, data_source: DataSourceConfig) -> Result<Dataset> {
        let dataset = self.source.load(&data_source).await?;
        self.edit_profile(move |p| {
            p.data_source = data_source;
            Ok(())
        })?;
        Ok(dataset)
    }

    /// Fresh data plus assignment, for display only.
    pub async fn preview(&self, only_recipients: bool) -> Result<Vec<PreviewRow>> {
        let _guard = self.gate.try_lock().map_err(|_| DraftMateError::Busy)?;

        let snapshot = self.snapshot();
        if !snapshot.data_source.is_configured() {
            return Err(DraftMateError::MissingDataSource);
        }
        if snapshot.templates.is_empty() {
            return Err(DraftMateError::NoTemplates(snapshot.name.clone()));
        }

        let dataset = self.source.load(&snapshot.data_source).await?;
        Ok(build_preview(
            &dataset.rows,
            &snapshot.templates,
            &snapshot.overrides,
            only_recipients,
            &self.options(),
        ))
    }

    /// Create one draft per eligible, assigned recipient.
    pub async fn generate(&self, opts: &GenerateOptions) -> Result<GenerationReport> {
        let _guard = self.gate.try_lock().map_err(|_| DraftMateError::Busy)?;

        let snapshot = self.snapshot();
        generator::generate(
            &snapshot,
            &self.source,
            &self.validator,
            &self.mailer,
            &self.store,
            &self.license,
            &self.options(),
            opts,
        )
        .await
    }

    /// Apply `edit` to a copy of the active profile; stored only on success.
    pub fn edit_profile<R, F>(&mut self, edit: F) -> Result<R>
    where
        F: FnOnce(&mut Profile) -> draftmate_common::Result<R>,
    {
        let mut working = self.book.active().clone();
        let out = edit(&mut working)?;
        working.repair();

        let mut book = self.book.clone();
        book.replace(working)?;
        self.store.save_book(&book)?;
        self.book = book;
        Ok(out)
    }

    /// Same as `edit_profile`, for create/rename/delete/switch.
    pub fn edit_book<R, F>(&mut self, edit: F) -> Result<R>
    where
        F: FnOnce(&mut ProfileBook) -> draftmate_common::Result<R>,
    {
        let mut book = self.book.clone();
        let out = edit(&mut book)?;
        self.store.save_book(&book)?;
        self.book = book;
        Ok(out)
    }

    /// Cached check unless stale or `force`.
    pub async fn check_license(&self, force: bool) -> Result<LicenseStatus> {
        license::ensure_licensed(
            &self.validator,
            &self.store,
            self.license.key_override.as_deref(),
            self.license.recheck_minutes,
            force,
            Utc::now(),
        )
        .await
    }

    pub async fn activate_license(&self, key: &str) -> Result<LicenseStatus> {
        license::activate(&self.validator, &self.store, key, Utc::now()).await
    }

    /// This machine's id as stored in the license table
    pub fn machine_id(&self) -> Result<String> {
        Ok(license::machine_id(&self.store.install_id()?))
    }
}

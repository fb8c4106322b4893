//! Session orchestration tests
//!
//! Preview and generation against in-memory data sources, license
//! validators and mail clients.

use draftmate::config::Config;
use draftmate::data_source::DataSource;
use draftmate::error::{DraftMateError, Result};
use draftmate::generator::GenerateOptions;
use draftmate::license::{LicenseStatus, LicenseValidator};
use draftmate::mailer::{Draft, Mailer, MemoryMailer};
use draftmate::session::Session;
use draftmate::store::Store;
use draftmate_common::{DataSourceConfig, DataSourceKind, Dataset, Row, TemplateId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

/// Serves the queued datasets in order, repeating the last one
struct FakeSource {
    versions: Mutex<Vec<Dataset>>,
    loads: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

impl FakeSource {
    fn new(rows: Vec<Row>) -> Self {
        Self::versions(vec![rows])
    }

    fn versions(versions: Vec<Vec<Row>>) -> Self {
        Self {
            versions: Mutex::new(
                versions
                    .into_iter()
                    .map(|rows| Dataset::new(Vec::new(), rows))
                    .collect(),
            ),
            loads: AtomicUsize::new(0),
            delay: None,
            fail: false,
        }
    }

    /// Every load fails, as an unreachable sheet would
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(sample_rows())
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl DataSource for FakeSource {
    async fn load(&self, _config: &DataSourceConfig) -> Result<Dataset> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DraftMateError::DataLoad("sheet is not shared publicly".into()));
        }
        let mut versions = self.versions.lock().unwrap();
        if versions.len() > 1 {
            Ok(versions.remove(0))
        } else {
            Ok(versions[0].clone())
        }
    }
}

struct FakeValidator {
    valid: AtomicBool,
    calls: AtomicUsize,
}

impl FakeValidator {
    fn accepting() -> Self {
        Self {
            valid: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    fn rejecting() -> Self {
        Self {
            valid: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The license gets revoked on the server side
    fn revoke(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl LicenseValidator for FakeValidator {
    async fn validate(&self, _key: &str) -> Result<LicenseStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.valid.load(Ordering::SeqCst) {
            Ok(LicenseStatus::valid("ok"))
        } else {
            Ok(LicenseStatus::invalid("License not found."))
        }
    }
}

/// Records drafts like `MemoryMailer` but fails for one address
struct FlakyMailer {
    inner: MemoryMailer,
    fail_for: String,
}

#[async_trait::async_trait]
impl Mailer for FlakyMailer {
    async fn create_draft(&self, draft: &Draft) -> Result<()> {
        if draft.to == self.fail_for {
            return Err(DraftMateError::Mail("Outlook is not responding".into()));
        }
        self.inner.create_draft(draft).await
    }
}

fn row(first: &str, firm: &str, email: &str) -> Row {
    Row::from_pairs([("First Name", first), ("Firm", firm), ("Email", email)])
}

fn sample_rows() -> Vec<Row> {
    vec![
        row("Ana", "Acme", "ana@acme.com"),
        row("Bo", "Beta", "bo@beta.com"),
        row("Cy", "Gamma", "cy@gamma.com"),
    ]
}

fn session<M: Mailer>(
    dir: &std::path::Path,
    source: FakeSource,
    validator: FakeValidator,
    mailer: M,
) -> Session<FakeSource, FakeValidator, M> {
    let store = Store::open(dir).unwrap();
    let mut session = Session::new(Config::default(), store, source, validator, mailer)
        .with_license_key(None)
        .with_license_required(false);
    session
        .edit_profile(|p| {
            p.data_source.set(DataSourceKind::Csv, "contacts.csv");
            p.add_template("Intro", "Hi {first name} at {firm}");
            p.add_template("Follow up", "Hello again {first name}");
            Ok(())
        })
        .unwrap();
    session
}

fn template_id(session: &Session<FakeSource, FakeValidator, impl Mailer>, name: &str) -> TemplateId {
    session.active().find_template(name).unwrap().id.clone()
}

#[tokio::test]
async fn test_generate_creates_rotated_drafts() {
    let dir = tempdir().expect("Failed to create temp dir");
    let session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );

    let report = session.generate(&GenerateOptions::default()).await.unwrap();
    assert_eq!(report.created, 3);
    assert!(report.success());

    let drafts = session.mailer().drafts();
    let to: Vec<&str> = drafts.iter().map(|d| d.to.as_str()).collect();
    assert_eq!(to, vec!["ana@acme.com", "bo@beta.com", "cy@gamma.com"]);

    assert_eq!(drafts[0].subject, "Interested in opportunities at Acme");
    assert!(drafts[0].html_body.starts_with("<html><body"));
    assert!(drafts[0].html_body.contains("Hi Ana at Acme"));
    assert!(drafts[1].html_body.contains("Hello again Bo"));
    // third row wraps back to the first template
    assert!(drafts[2].html_body.contains("Hi Cy at Gamma"));
    assert_eq!(drafts[0].attachment, None);
}

#[tokio::test]
async fn test_preview_matches_generated_drafts() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );
    let follow_up = template_id(&session, "Follow up");
    session
        .edit_profile(|p| p.set_override(" CY@Gamma.com ", &follow_up))
        .unwrap();

    let preview = session.preview(true).await.unwrap();
    let names: Vec<&str> = preview.iter().map(|r| r.template_name.as_str()).collect();
    assert_eq!(names, vec!["Intro", "Follow up", "Follow up"]);
    assert!(preview[2].is_manual);

    session.generate(&GenerateOptions::default()).await.unwrap();
    let drafts = session.mailer().drafts();
    assert!(drafts[2].html_body.contains("Hello again Cy"));
}

#[tokio::test]
async fn test_partial_failure_keeps_going() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mailer = FlakyMailer {
        inner: MemoryMailer::new(),
        fail_for: "bo@beta.com".into(),
    };
    let session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        mailer,
    );

    let report = session.generate(&GenerateOptions::default()).await.unwrap();
    assert_eq!(report.created, 2);
    assert!(!report.success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].email, "bo@beta.com");
    assert!(report.failures[0].message.contains("not responding"));

    let sent: Vec<String> = session.mailer().inner.drafts().into_iter().map(|d| d.to).collect();
    assert_eq!(sent, vec!["ana@acme.com", "cy@gamma.com"]);
}

#[tokio::test]
async fn test_generate_reloads_data() {
    let dir = tempdir().expect("Failed to create temp dir");
    let source = FakeSource::versions(vec![
        vec![row("Ana", "Acme", "ana@acme.com")],
        sample_rows(),
    ]);
    let session = session(dir.path(), source, FakeValidator::accepting(), MemoryMailer::new());

    let preview = session.preview(true).await.unwrap();
    assert_eq!(preview.len(), 1);

    let report = session.generate(&GenerateOptions::default()).await.unwrap();
    assert_eq!(report.created, 3);
}

#[tokio::test]
async fn test_second_run_is_rejected_while_busy() {
    let dir = tempdir().expect("Failed to create temp dir");
    let source = FakeSource::new(sample_rows()).slow(Duration::from_millis(50));
    let session = session(dir.path(), source, FakeValidator::accepting(), MemoryMailer::new());

    let opts = GenerateOptions::default();
    let (first, second) = tokio::join!(
        session.preview(true),
        session.generate(&opts)
    );
    assert_eq!(first.unwrap().len(), 3);
    assert!(matches!(second, Err(DraftMateError::Busy)));
    assert!(session.mailer().drafts().is_empty());

    // gate is released afterwards
    assert!(session.preview(true).await.is_ok());
}

#[tokio::test]
async fn test_dry_run_counts_only() {
    let dir = tempdir().expect("Failed to create temp dir");
    let session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );

    let report = session
        .generate(&GenerateOptions {
            dry_run: true,
            show_progress: false,
        })
        .await
        .unwrap();
    assert_eq!(report.created, 3);
    assert!(report.dry_run);
    assert!(session.mailer().drafts().is_empty());
}

#[tokio::test]
async fn test_unassigned_recipients_are_skipped() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );
    session
        .edit_profile(|p| {
            let ids: Vec<TemplateId> = p.templates.iter().map(|t| t.id.clone()).collect();
            for id in &ids {
                p.set_manual_only(id, true)?;
            }
            p.set_override("ana@acme.com", &ids[0])
        })
        .unwrap();

    let report = session.generate(&GenerateOptions::default()).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, vec!["bo@beta.com", "cy@gamma.com"]);
}

#[tokio::test]
async fn test_missing_inputs_are_rejected() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = Store::open(dir.path()).unwrap();
    let mut session = Session::new(
        Config::default(),
        store,
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    )
    .with_license_required(false);

    let err = session.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, DraftMateError::MissingDataSource));

    session
        .edit_profile(|p| {
            p.data_source.set(DataSourceKind::Csv, "contacts.csv");
            Ok(())
        })
        .unwrap();
    let err = session.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, DraftMateError::NoTemplates(_)));

    session
        .edit_profile(|p| {
            p.add_template("Intro", "Hi");
            p.attachment_path = Some(dir.path().join("missing.pdf"));
            Ok(())
        })
        .unwrap();
    let err = session.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, DraftMateError::FileNotFound(_)));
}

#[tokio::test]
async fn test_no_eligible_recipients() {
    let dir = tempdir().expect("Failed to create temp dir");
    let rows = vec![
        Row::from_pairs([("Email", "ana@acme.com"), ("Generate", "no")]),
        Row::from_pairs([("Email", ""), ("Firm", "Beta")]),
    ];
    let session = session(
        dir.path(),
        FakeSource::new(rows),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );

    let err = session.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, DraftMateError::NoRecipients));

    let preview = session.preview(false).await.unwrap();
    assert_eq!(preview.len(), 2);
    assert!(preview.iter().all(|r| !r.is_eligible && r.template_id.is_none()));
}

#[tokio::test]
async fn test_attachment_is_passed_to_every_draft() {
    let dir = tempdir().expect("Failed to create temp dir");
    let resume = dir.path().join("resume.pdf");
    std::fs::write(&resume, b"%PDF").unwrap();

    let mut session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );
    let path = resume.clone();
    session
        .edit_profile(move |p| {
            p.attachment_path = Some(path);
            Ok(())
        })
        .unwrap();

    session.generate(&GenerateOptions::default()).await.unwrap();
    assert!(session
        .mailer()
        .drafts()
        .iter()
        .all(|d| d.attachment.as_deref() == Some(resume.as_path())));
}

#[tokio::test]
async fn test_invalid_license_blocks_generation() {
    let dir = tempdir().expect("Failed to create temp dir");
    let session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::rejecting(),
        MemoryMailer::new(),
    )
    .with_license_required(true)
    .with_license_key(Some("K-404".into()));

    let err = session.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, DraftMateError::LicenseInvalid(_)));
    assert!(session.mailer().drafts().is_empty());
}

#[tokio::test]
async fn test_generate_revalidates_revoked_license() {
    let dir = tempdir().expect("Failed to create temp dir");
    let session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    )
    .with_license_required(true);

    session.activate_license("K-1").await.unwrap();
    session.generate(&GenerateOptions::default()).await.unwrap();
    assert_eq!(session.mailer().drafts().len(), 3);
    assert_eq!(session.validator_calls(), 2);

    session.validator().revoke();
    let err = session.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, DraftMateError::LicenseInvalid(_)));
    assert_eq!(session.validator_calls(), 3);
    assert_eq!(session.mailer().drafts().len(), 3);
}

#[tokio::test]
async fn test_status_check_uses_fresh_cache() {
    let dir = tempdir().expect("Failed to create temp dir");
    let session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    )
    .with_license_required(true);

    session.activate_license("K-1").await.unwrap();
    session.check_license(false).await.unwrap();
    assert_eq!(session.validator_calls(), 1);

    session.check_license(true).await.unwrap();
    assert_eq!(session.validator_calls(), 2);
}

#[tokio::test]
async fn test_missing_license_key() {
    let dir = tempdir().expect("Failed to create temp dir");
    let session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    )
    .with_license_required(true);

    let err = session.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, DraftMateError::LicenseInvalid(_)));
}

#[tokio::test]
async fn test_set_data_source_only_saves_on_success() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut session = session(
        dir.path(),
        FakeSource::new(sample_rows()),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );

    let mut config = session.active().data_source.clone();
    config.set(DataSourceKind::Sheet, "https://docs.google.com/spreadsheets/d/abc/edit");
    let dataset = session.set_data_source(config).await.unwrap();
    assert_eq!(dataset.count(), 3);
    assert_eq!(session.active().data_source.kind, DataSourceKind::Sheet);

    let reopened = Store::open(dir.path()).unwrap().load_book();
    assert_eq!(reopened.active().data_source.kind, DataSourceKind::Sheet);
    assert_eq!(reopened.active().data_source.csv_path, "contacts.csv");
}

#[tokio::test]
async fn test_set_data_source_failure_keeps_profile() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut session = session(
        dir.path(),
        FakeSource::failing(),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );

    let mut config = session.active().data_source.clone();
    config.set(DataSourceKind::Sheet, "https://docs.google.com/spreadsheets/d/abc/edit");
    let err = session.set_data_source(config).await.unwrap_err();
    assert!(matches!(err, DraftMateError::DataLoad(_)));
    assert_eq!(session.active().data_source.kind, DataSourceKind::Csv);
    assert_eq!(session.active().data_source.location(), "contacts.csv");

    let reopened = Store::open(dir.path()).unwrap().load_book();
    assert_eq!(reopened.active().data_source.kind, DataSourceKind::Csv);
    assert_eq!(reopened.active().data_source.csv_path, "contacts.csv");
    assert!(reopened.active().data_source.sheet_url.is_empty());
}

#[tokio::test]
async fn test_generate_reports_warnings() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut rows = sample_rows();
    rows.push(row("Dee", "Delta", "dee at delta"));
    let mut session = session(
        dir.path(),
        FakeSource::new(rows),
        FakeValidator::accepting(),
        MemoryMailer::new(),
    );
    session
        .edit_profile(|p| {
            p.subject_template = "Quick question".into();
            Ok(())
        })
        .unwrap();

    let report = session.generate(&GenerateOptions::default()).await.unwrap();
    assert_eq!(report.created, 4);
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings[0].contains("no placeholders"));
    assert_eq!(report.warnings[1], "Invalid email address: dee at delta");
}

trait ValidatorCalls {
    fn validator_calls(&self) -> usize;
}

impl<M: Mailer> ValidatorCalls for Session<FakeSource, FakeValidator, M> {
    fn validator_calls(&self) -> usize {
        self.validator().calls()
    }
}

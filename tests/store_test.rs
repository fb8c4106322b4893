//! Persistence tests
//!
//! Profile edits through a session survive a restart; broken files only
//! reset their own piece of state.

use draftmate::config::Config;
use draftmate::license::{LicenseState, SkipLicense};
use draftmate::mailer::MemoryMailer;
use draftmate::session::Session;
use draftmate::store::Store;
use draftmate_common::{DataSourceConfig, Dataset};
use tempfile::tempdir;

/// Data source that is never reached in these tests
struct NoSource;

#[async_trait::async_trait]
impl draftmate::data_source::DataSource for NoSource {
    async fn load(&self, _config: &DataSourceConfig) -> draftmate::error::Result<Dataset> {
        Ok(Dataset::default())
    }
}

fn open(dir: &std::path::Path) -> Session<NoSource, SkipLicense, MemoryMailer> {
    Session::new(
        Config::default(),
        Store::open(dir).expect("open store"),
        NoSource,
        SkipLicense,
        MemoryMailer::new(),
    )
}

#[test]
fn test_edits_survive_restart() {
    let dir = tempdir().expect("Failed to create temp dir");
    {
        let mut session = open(dir.path());
        session.edit_book(|b| b.create("Banks").map(|_| ())).unwrap();
        let id = session
            .edit_profile(|p| Ok(p.add_template("Intro", "Hi {first name}").id.clone()))
            .unwrap();
        session
            .edit_profile(|p| p.set_override("Ana@Acme.com", &id))
            .unwrap();
    }

    let session = open(dir.path());
    assert_eq!(session.book().active_name(), "Banks");
    let names: Vec<&str> = session.book().names().collect();
    assert_eq!(names, vec!["Default", "Banks"]);

    let profile = session.active();
    assert_eq!(profile.templates.len(), 1);
    assert_eq!(profile.templates[0].name, "Intro");
    assert_eq!(
        profile.overrides.get("ana@acme.com"),
        Some(&profile.templates[0].id)
    );
}

#[test]
fn test_failed_edit_is_not_saved() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut session = open(dir.path());
    session
        .edit_profile(|p| {
            p.add_template("Intro", "Hi");
            Ok(())
        })
        .unwrap();

    // the rename happens on the working copy, then the override fails
    let result = session.edit_profile(|p| {
        let id = p.templates[0].id.clone();
        p.rename_template(&id, "Renamed")?;
        p.set_override("", &id)
    });
    assert!(result.is_err());
    assert_eq!(session.active().templates[0].name, "Intro");

    let reopened = open(dir.path());
    assert_eq!(reopened.active().templates[0].name, "Intro");
}

#[test]
fn test_duplicate_keeps_overrides_valid() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut session = open(dir.path());
    let id = session
        .edit_profile(|p| Ok(p.add_template("Intro", "Hi").id.clone()))
        .unwrap();
    session
        .edit_profile(|p| p.set_override("ana@acme.com", &id))
        .unwrap();

    let copy = session
        .edit_book(|b| b.duplicate("Default", None).map(|p| p.name.clone()))
        .unwrap();
    assert_eq!(copy, "Default Copy");
    assert_eq!(session.book().active_name(), "Default Copy");
    assert_eq!(session.active().overrides.get("ana@acme.com"), Some(&id));
}

#[test]
fn test_corrupt_profiles_reset_only_profiles() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = Store::open(dir.path()).unwrap();
    store
        .save_license(&LicenseState {
            key: Some("K-1".into()),
            last_validated: None,
            message: "ok".into(),
        })
        .unwrap();
    std::fs::write(dir.path().join("profiles.json"), "{ not json").unwrap();

    let book = store.load_book();
    assert_eq!(book.len(), 1);
    assert_eq!(book.active_name(), "Default");
    assert_eq!(store.load_license().key.as_deref(), Some("K-1"));
}

#[test]
fn test_delete_last_profile_rejected() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut session = open(dir.path());
    assert!(session.edit_book(|b| b.delete("Default")).is_err());
    assert_eq!(session.book().len(), 1);
}

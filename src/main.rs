use clap::Parser;
use dialoguer::{Confirm, Input, Select};
use draftmate::cli::{
    Cli, Commands, ConfigArgs, LicenseCommand, LoadArgs, OverrideCommand, ProfileCommand,
    TemplateCommand,
};
use draftmate::config::Config;
use draftmate::data_source::{detect_kind, SourceLoader};
use draftmate::error::{DraftMateError, Result};
use draftmate::export;
use draftmate::generator::GenerateOptions;
use draftmate::license::{machine_id, ConfiguredValidator, SheetLicenseValidator, SkipLicense};
use draftmate::mailer::OutlookMailer;
use draftmate::scanner;
use draftmate::session::Session;
use draftmate::store::Store;
use draftmate_common::{
    eligible_indices, DataSourceKind, HeaderAliases, PreviewStats, Recipient, TemplateId,
};
use env_logger::Env;
use std::path::PathBuf;

type AppSession = Session<SourceLoader, ConfiguredValidator, OutlookMailer>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().default_filter_or(filter));

    let config = Config::load()?;
    let command = match cli.command {
        Commands::Config(args) => return run_config(config, args),
        other => other,
    };

    let store = Store::open(config.data_dir()?)?;
    let loader = SourceLoader::new(config.sheet_timeout_seconds)?;
    let skip_license = Config::skip_license();
    let validator = build_validator(&config, &store, loader.client().clone(), skip_license)?;
    let mut session = Session::new(config, store, loader, validator, OutlookMailer::new())
        .with_license_required(!skip_license);

    match command {
        Commands::Load(args) => run_load(&mut session, args).await?,

        Commands::Preview {
            all_rows,
            json,
            xlsx,
        } => {
            let rows = session.preview(!all_rows).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("👀 Preview: profile \"{}\"\n", session.active().name);
                for r in &rows {
                    let template = match (r.is_eligible, r.template_name.is_empty()) {
                        (false, _) => "(skipped)".to_string(),
                        (true, true) => "–".to_string(),
                        (true, false) if r.is_manual => format!("{} (manual)", r.template_name),
                        (true, false) => r.template_name.clone(),
                    };
                    println!(
                        "{:>4}  {:<26} {:<32} {:<22} {}",
                        r.row_index + 1,
                        truncate(&r.name, 26),
                        truncate(&r.email, 32),
                        truncate(&r.firm, 22),
                        template
                    );
                }

                let stats = PreviewStats::from_rows(&rows);
                println!(
                    "\n{} row(s), {} eligible, {} with a template ({} manual), {} without",
                    stats.total, stats.eligible, stats.assigned, stats.manual, stats.unassigned
                );
            }

            if let Some(output) = xlsx {
                let path = export::output_path_for(&output, "preview", "xlsx");
                export::export_preview_xlsx(&rows, &path)?;
                println!("✔ Preview saved: {}", path.display());
            }
        }

        Commands::Generate { dry_run, yes } => {
            if !dry_run && !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Create drafts for profile \"{}\"?",
                        session.active().name
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled");
                    return Ok(());
                }
            }

            println!("✉️  Generating drafts{}\n", if dry_run { " (dry run)" } else { "" });
            let report = session
                .generate(&GenerateOptions {
                    dry_run,
                    show_progress: true,
                })
                .await?;

            for warning in &report.warnings {
                println!("⚠ {}", warning);
            }
            if report.dry_run {
                println!("✔ {} draft(s) would be created", report.created);
            } else {
                println!("✔ {} draft(s) created", report.created);
            }
            if !report.skipped.is_empty() {
                println!(
                    "⚠ {} recipient(s) had no template: {}",
                    report.skipped.len(),
                    report.skipped.join(", ")
                );
            }
            for failure in &report.failures {
                println!("⚠ {}: {}", failure.email, failure.message);
            }
            if report.success() {
                println!("\n✅ Done");
            } else {
                println!("\n⚠ {} draft(s) failed", report.failures.len());
            }
        }

        Commands::Profile(command) => run_profile(&mut session, command)?,
        Commands::Template(command) => run_template(&mut session, command)?,
        Commands::Override(command) => run_override(&mut session, command)?,
        Commands::License(command) => run_license(&session, command).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}

fn build_validator(
    config: &Config,
    store: &Store,
    client: reqwest::Client,
    skip: bool,
) -> Result<ConfiguredValidator> {
    if skip {
        return Ok(ConfiguredValidator::Skip(SkipLicense));
    }
    let Some(sheet_url) = config.license_sheet_url.clone() else {
        return Ok(ConfiguredValidator::Missing);
    };
    Ok(ConfiguredValidator::Sheet(SheetLicenseValidator::new(
        client,
        sheet_url,
        config.license_bind_url.clone(),
        config.license_bind_secret.clone(),
        machine_id(&store.install_id()?),
    )))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

async fn run_load(session: &mut AppSession, args: LoadArgs) -> Result<()> {
    let (kind, location) = if let Some(path) = args.csv {
        (DataSourceKind::Csv, path.display().to_string())
    } else if let Some(url) = args.sheet {
        (DataSourceKind::Sheet, url)
    } else if let Some(path) = args.excel {
        (DataSourceKind::Excel, path.display().to_string())
    } else if let Some(location) = args.location {
        (detect_kind(&location), location)
    } else {
        let current = session.active().data_source.clone();
        if !current.is_configured() {
            return Err(DraftMateError::MissingDataSource);
        }
        (current.kind, current.location().to_string())
    };

    let mut data_source = session.active().data_source.clone();
    data_source.set(kind, location.trim());

    println!("📥 Loading {} source: {}\n", kind, data_source.location());
    let dataset = session.set_data_source(data_source).await?;

    let aliases: &HeaderAliases = &session.config().header_aliases;
    let eligible = eligible_indices(&dataset.rows, aliases).len();
    println!("✔ {} row(s), {} eligible", dataset.count(), eligible);
    println!("  Columns: {}", dataset.headers.join(", "));

    for (i, row) in dataset.rows.iter().take(args.head).enumerate() {
        let recipient = Recipient::resolve(row, aliases);
        println!(
            "  {:>3}. {:<26} {:<32} {}",
            i + 1,
            truncate(&recipient.display_name(), 26),
            truncate(recipient.email(), 32),
            recipient.firm()
        );
    }
    if dataset.count() > args.head {
        println!("  … {} more", dataset.count() - args.head);
    }
    Ok(())
}

fn run_profile(session: &mut AppSession, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::List => {
            let active = session.book().active_name().to_string();
            for name in session.book().names() {
                let marker = if name == active { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        }

        ProfileCommand::Show => {
            let p = session.active();
            println!("Profile: {}", p.name);
            if p.data_source.is_configured() {
                println!("  Data source: {} {}", p.data_source.kind, p.data_source.location());
            } else {
                println!("  Data source: (not set)");
            }
            println!("  Subject: {}", p.subject_template);
            match p.attachment() {
                Some(path) => println!("  Attachment: {}", path.display()),
                None => println!("  Attachment: (none)"),
            }
            println!("  Templates: {}", p.templates.len());
            println!("  Overrides: {}", p.overrides.len());
        }

        ProfileCommand::New { name } => {
            let name = session.edit_book(|b| b.create(&name).map(|p| p.name.clone()))?;
            let subject = session.config().default_subject.clone();
            session.edit_profile(move |p| {
                p.subject_template = subject;
                Ok(())
            })?;
            println!("✔ Created profile \"{}\" (now active)", name);
        }

        ProfileCommand::Duplicate { name, from } => {
            let src = from.unwrap_or_else(|| session.book().active_name().to_string());
            let created =
                session.edit_book(|b| b.duplicate(&src, name.as_deref()).map(|p| p.name.clone()))?;
            println!("✔ Copied \"{}\" to \"{}\" (now active)", src, created);
        }

        ProfileCommand::Rename { old, new } => {
            session.edit_book(|b| b.rename(&old, &new))?;
            println!("✔ Renamed \"{}\" to \"{}\"", old, new.trim());
        }

        ProfileCommand::Delete { name, yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete profile \"{}\"?", name))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled");
                    return Ok(());
                }
            }
            let removed = session.edit_book(|b| b.delete(&name))?;
            println!(
                "✔ Deleted \"{}\"; active profile is \"{}\"",
                removed.name,
                session.book().active_name()
            );
        }

        ProfileCommand::Switch { name } => {
            session.edit_book(|b| b.switch(&name))?;
            println!("✔ Active profile: {}", session.book().active_name());
        }

        ProfileCommand::SetSubject { subject } => {
            session.edit_profile(move |p| {
                p.subject_template = subject;
                Ok(())
            })?;
            println!("✔ Subject: {}", session.active().subject_template);
        }

        ProfileCommand::SetAttachment { path } => {
            let path = match path {
                Some(path) if !path.is_file() => {
                    return Err(DraftMateError::FileNotFound(path.display().to_string()))
                }
                Some(path) => Some(std::fs::canonicalize(&path)?),
                None => None,
            };
            let shown = path.clone();
            session.edit_profile(move |p| {
                p.attachment_path = path;
                Ok(())
            })?;
            match shown {
                Some(path) => println!("✔ Attachment: {}", path.display()),
                None => println!("✔ Attachment cleared"),
            }
        }
    }
    Ok(())
}

/// Resolve an id, 1-based position or name to a template id
fn template_id(session: &AppSession, key: &str) -> Result<TemplateId> {
    session
        .active()
        .find_template(key)
        .map(|t| t.id.clone())
        .ok_or_else(|| draftmate_common::Error::TemplateNotFound(key.to_string()).into())
}

fn text_from(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (text, file) {
        (_, Some(file)) => Ok(scanner::read_template_file(&file)?.content),
        (Some(text), None) => Ok(text),
        (None, None) => Ok(String::new()),
    }
}

fn run_template(session: &mut AppSession, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::List => {
            let p = session.active();
            if p.templates.is_empty() {
                println!("No templates in \"{}\"", p.name);
            }
            for (i, t) in p.templates.iter().enumerate() {
                let first_line = t.text.lines().next().unwrap_or_default();
                println!(
                    "{:>2}. {}{}  {}",
                    i + 1,
                    t.name,
                    if t.manual_only { " [manual]" } else { "" },
                    truncate(first_line, 50)
                );
            }
        }

        TemplateCommand::Show { template } => {
            let id = template_id(session, &template)?;
            if let Some(t) = session.active().template(&id) {
                println!("# {}{}\n", t.name, if t.manual_only { " [manual]" } else { "" });
                println!("{}", t.text);
            }
        }

        TemplateCommand::Add {
            name,
            text,
            file,
            manual,
        } => {
            let text = text_from(text, file)?;
            let added = session.edit_profile(|p| {
                let template = p.add_template(&name, &text);
                let (id, name) = (template.id.clone(), template.name.clone());
                if manual {
                    p.set_manual_only(&id, true)?;
                }
                Ok(name)
            })?;
            println!("✔ Added template \"{}\"", added);
        }

        TemplateCommand::Rename { template, name } => {
            let id = template_id(session, &template)?;
            session.edit_profile(|p| p.rename_template(&id, &name))?;
            println!("✔ Renamed template to \"{}\"", name.trim());
        }

        TemplateCommand::SetText {
            template,
            text,
            file,
        } => {
            let id = template_id(session, &template)?;
            let text = text_from(text, file)?;
            session.edit_profile(|p| p.set_template_text(&id, &text))?;
            println!("✔ Template text updated");
        }

        TemplateCommand::Manual { template, off } => {
            let id = template_id(session, &template)?;
            session.edit_profile(|p| p.set_manual_only(&id, !off))?;
            if off {
                println!("✔ Template back in rotation");
            } else {
                println!("✔ Template is manual-only (used through overrides)");
            }
        }

        TemplateCommand::MoveUp { template } => {
            let id = template_id(session, &template)?;
            if session.edit_profile(|p| p.move_up(&id))? {
                println!("✔ Moved up");
            } else {
                println!("Already first");
            }
        }

        TemplateCommand::MoveDown { template } => {
            let id = template_id(session, &template)?;
            if session.edit_profile(|p| p.move_down(&id))? {
                println!("✔ Moved down");
            } else {
                println!("Already last");
            }
        }

        TemplateCommand::Remove { template } => {
            let id = template_id(session, &template)?;
            let removed = session.edit_profile(|p| p.remove_template(&id))?;
            println!("✔ Removed template \"{}\"", removed.name);
        }

        TemplateCommand::Import { files, folder } => {
            let paths = match folder {
                Some(folder) => scanner::scan_template_folder(&folder)?,
                None => files,
            };
            let found = scanner::read_template_files(&paths);
            let imported = session.edit_profile(|p| Ok(p.import_templates(found)))?;
            println!("✔ Imported {} template(s)", imported);
        }

        TemplateCommand::Export { dir } => {
            let dir = dir.unwrap_or_else(export::default_export_dir);
            let path = export::export_templates_zip(&session.active().templates, &dir)?;
            println!("✔ Exported templates: {}", path.display());
        }
    }
    Ok(())
}

fn run_override(session: &mut AppSession, command: OverrideCommand) -> Result<()> {
    match command {
        OverrideCommand::List => {
            let p = session.active();
            if p.overrides.is_empty() {
                println!("No overrides");
            }
            for (email, id) in &p.overrides {
                let name = p
                    .template(id)
                    .map(|t| t.name.as_str())
                    .unwrap_or("(missing template)");
                println!("  {:<36} {}", email, name);
            }
        }

        OverrideCommand::Set { email, template } => {
            let id = template_id(session, &template)?;
            session.edit_profile(|p| p.set_override(&email, &id))?;
            println!("✔ {} → {}", email.trim(), template);
        }

        OverrideCommand::Pick { email } => {
            let templates = session.active().templates.clone();
            if templates.is_empty() {
                return Err(DraftMateError::NoTemplates(session.active().name.clone()));
            }
            let mut items: Vec<String> = templates
                .iter()
                .map(|t| {
                    if t.manual_only {
                        format!("{} [manual]", t.name)
                    } else {
                        t.name.clone()
                    }
                })
                .collect();
            items.push("(automatic rotation)".to_string());

            let choice = Select::new()
                .with_prompt(format!("Template for {}", email.trim()))
                .items(&items)
                .default(0)
                .interact()?;

            match templates.get(choice) {
                Some(t) => {
                    let id = t.id.clone();
                    session.edit_profile(|p| p.set_override(&email, &id))?;
                    println!("✔ {} → {}", email.trim(), t.name);
                }
                None => {
                    session.edit_profile(|p| Ok(p.clear_override(&email)))?;
                    println!("✔ {} uses automatic rotation", email.trim());
                }
            }
        }

        OverrideCommand::Clear { email } => {
            if session.edit_profile(|p| Ok(p.clear_override(&email)))? {
                println!("✔ Override removed");
            } else {
                println!("No override for {}", email.trim());
            }
        }
    }
    Ok(())
}

async fn run_license(session: &AppSession, command: LicenseCommand) -> Result<()> {
    match command {
        LicenseCommand::Activate { key } => {
            let key = match key {
                Some(key) => key,
                None => Input::<String>::new()
                    .with_prompt("License key")
                    .interact_text()?,
            };
            let status = session.activate_license(&key).await?;
            println!("✔ {}", status.message);
        }

        LicenseCommand::Status => {
            let state = session.store().load_license();
            match &state.key {
                Some(key) => println!("Key: {}", mask_key(key)),
                None => println!("Key: (not set)"),
            }
            match state.last_validated {
                Some(at) => println!("Last validated: {}", at.format("%Y-%m-%d %H:%M UTC")),
                None => println!("Last validated: never"),
            }
            if !state.message.is_empty() {
                println!("Message: {}", state.message);
            }
        }

        LicenseCommand::Check => {
            let status = session.check_license(true).await?;
            println!("✔ {}", status.message);
        }

        LicenseCommand::MachineId => {
            println!("{}", session.machine_id()?);
        }
    }
    Ok(())
}

fn mask_key(key: &str) -> String {
    let shown: String = key.chars().take(4).collect();
    format!("{}…", shown)
}

fn run_config(mut config: Config, args: ConfigArgs) -> Result<()> {
    let mut changed = false;

    if let Some(style) = args.placeholder_style {
        config.placeholder_style = style;
        changed = true;
    }
    if let Some(scope) = args.rotation {
        config.rotation_scope = scope;
        changed = true;
    }
    if let Some(subject) = args.default_subject {
        config.default_subject = subject;
        changed = true;
    }
    if let Some(url) = args.license_sheet_url {
        config.license_sheet_url = Some(url).filter(|u| !u.trim().is_empty());
        changed = true;
    }
    if let Some(url) = args.license_bind_url {
        config.license_bind_url = Some(url).filter(|u| !u.trim().is_empty());
        changed = true;
    }
    if let Some(secret) = args.license_bind_secret {
        config.license_bind_secret = Some(secret).filter(|s| !s.is_empty());
        changed = true;
    }
    if let Some(minutes) = args.license_recheck_minutes {
        config.license_recheck_minutes = minutes.max(0);
        changed = true;
    }
    if let Some(seconds) = args.sheet_timeout_seconds {
        config.sheet_timeout_seconds = seconds.max(1);
        changed = true;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
        changed = true;
    }
    for (field, header) in args.aliases {
        let entry = config.header_aliases.extra.entry(field).or_default();
        if !entry.iter().any(|h| h.eq_ignore_ascii_case(&header)) {
            entry.push(header);
        }
        changed = true;
    }

    if changed {
        config.save()?;
        println!("✔ Settings saved");
    }

    if args.show || !changed {
        println!("Settings:");
        println!("  Placeholder style: {}", config.placeholder_style);
        println!("  Rotation: {}", config.rotation_scope);
        println!("  Default subject: {}", config.default_subject);
        println!("  Sheet timeout: {}s", config.sheet_timeout_seconds);
        println!(
            "  License sheet: {}",
            config.license_sheet_url.as_deref().unwrap_or("(not set)")
        );
        println!(
            "  License bind URL: {}",
            config.license_bind_url.as_deref().unwrap_or("(not set)")
        );
        println!("  License re-check: every {} min", config.license_recheck_minutes);
        match config.data_dir() {
            Ok(dir) => println!("  Data dir: {}", dir.display()),
            Err(e) => println!("  Data dir: {}", e),
        }
        for (field, headers) in &config.header_aliases.extra {
            println!("  Alias {:?}: {}", field, headers.join(", "));
        }
    }
    Ok(())
}

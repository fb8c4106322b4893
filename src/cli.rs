use clap::{Args, Parser, Subcommand};
use draftmate_common::{Field, PlaceholderStyle, RotationScope};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "draftmate")]
#[command(
    about = "Bulk personalized email drafts from a spreadsheet and a set of templates",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set the active profile's data source and show what it contains
    Load(LoadArgs),

    /// Show which template each recipient would get
    Preview {
        /// Include every row (ineligible rows are greyed out)
        #[arg(long)]
        all_rows: bool,

        /// Print the preview as JSON
        #[arg(long)]
        json: bool,

        /// Also write the preview to an .xlsx file (or directory)
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },

    /// Create one draft per eligible recipient in the mail client
    Generate {
        /// Count drafts without creating them
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Manage the active profile's templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Pin recipients to specific templates
    #[command(subcommand)]
    Override(OverrideCommand),

    /// License activation and status
    #[command(subcommand)]
    License(LicenseCommand),

    /// Show or edit settings
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LoadArgs {
    /// CSV path, Google Sheets URL or .xlsx path (kind is detected)
    pub location: Option<String>,

    /// Local CSV file
    #[arg(long, conflicts_with_all = ["sheet", "excel", "location"])]
    pub csv: Option<PathBuf>,

    /// Google Sheets link (must be shared publicly)
    #[arg(long, conflicts_with_all = ["excel", "location"])]
    pub sheet: Option<String>,

    /// Local Excel workbook (first sheet)
    #[arg(long, conflicts_with = "location")]
    pub excel: Option<PathBuf>,

    /// Number of rows to print
    #[arg(short = 'n', long, default_value = "5")]
    pub head: usize,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// List profiles (active one marked with *)
    List,
    /// Show the active profile
    Show,
    /// Create an empty profile and switch to it
    New { name: String },
    /// Copy a profile (default: the active one) and switch to the copy
    Duplicate {
        /// New name (default: "<name> Copy")
        name: Option<String>,
        #[arg(long)]
        from: Option<String>,
    },
    /// Rename a profile
    Rename { old: String, new: String },
    /// Delete a profile (the last one cannot be deleted)
    Delete {
        name: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Make a profile active
    Switch { name: String },
    /// Subject line template for the active profile
    SetSubject { subject: String },
    /// File attached to every draft (omit to clear)
    SetAttachment { path: Option<PathBuf> },
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    /// List templates in rotation order
    List,
    /// Print one template
    Show { template: String },
    /// Add a template (text from --text, --file, or empty)
    Add {
        name: String,
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Only used through overrides
        #[arg(long)]
        manual: bool,
    },
    /// Rename a template
    Rename { template: String, name: String },
    /// Replace a template's text
    SetText {
        template: String,
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Mark a template manual-only (or back to rotation with --off)
    Manual {
        template: String,
        #[arg(long)]
        off: bool,
    },
    /// Move a template one place earlier
    MoveUp { template: String },
    /// Move a template one place later
    MoveDown { template: String },
    /// Remove a template (overrides pointing at it are cleared)
    Remove { template: String },
    /// Import .txt/.html files as templates
    Import {
        files: Vec<PathBuf>,
        /// Import every template file in a folder
        #[arg(long, conflicts_with = "files")]
        folder: Option<PathBuf>,
    },
    /// Write all templates into a ZIP archive
    Export {
        /// Target directory (default: Downloads)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum OverrideCommand {
    /// List overrides
    List,
    /// Pin an email to a template
    Set { email: String, template: String },
    /// Choose the template for an email interactively
    Pick { email: String },
    /// Remove an override
    Clear { email: String },
}

#[derive(Subcommand)]
pub enum LicenseCommand {
    /// Store a license key and validate it
    Activate {
        /// Prompted for when omitted
        key: Option<String>,
    },
    /// Show the stored license state
    Status,
    /// Validate online now
    Check,
    /// Print this machine's id
    MachineId,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Show settings
    #[arg(long)]
    pub show: bool,

    /// Placeholder syntax (single/double/any)
    #[arg(long)]
    pub placeholder_style: Option<PlaceholderStyle>,

    /// Rotation counter (global/per-firm)
    #[arg(long)]
    pub rotation: Option<RotationScope>,

    /// Subject for new profiles
    #[arg(long)]
    pub default_subject: Option<String>,

    /// Published CSV link of the license table
    #[arg(long)]
    pub license_sheet_url: Option<String>,

    /// License bind endpoint
    #[arg(long)]
    pub license_bind_url: Option<String>,

    /// Secret sent with bind requests
    #[arg(long)]
    pub license_bind_secret: Option<String>,

    /// Minutes before a successful license check is repeated
    #[arg(long)]
    pub license_recheck_minutes: Option<i64>,

    /// Google Sheets request timeout
    #[arg(long)]
    pub sheet_timeout_seconds: Option<u64>,

    /// Where profiles are stored
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Extra header name for a field, as FIELD=HEADER (repeatable)
    #[arg(long = "alias", value_parser = parse_alias)]
    pub aliases: Vec<(Field, String)>,
}

fn parse_alias(s: &str) -> Result<(Field, String), String> {
    let (field, header) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected FIELD=HEADER, got {}", s))?;
    let header = header.trim();
    if header.is_empty() {
        return Err("Header name is empty".to_string());
    }
    Ok((field.parse()?, header.to_string()))
}

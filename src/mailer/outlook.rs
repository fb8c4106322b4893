//! Microsoft Outlook (classic, macOS) through AppleScript

use super::{Draft, Mailer};
use crate::error::{DraftMateError, Result};
use tokio::process::Command;

/// Escape text for use inside an AppleScript string literal
pub fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Script that opens a new Outlook draft for `draft`
pub fn draft_script(draft: &Draft) -> String {
    let to = escape_applescript(&draft.to);
    let subject = escape_applescript(&draft.subject);
    let body = escape_applescript(&draft.html_body);

    let attach = match &draft.attachment {
        Some(path) => format!(
            "make new attachment with properties {{file:POSIX file \"{}\"}}",
            escape_applescript(&path.to_string_lossy())
        ),
        None => String::new(),
    };

    format!(
        r#"on run
    try
        tell application "Microsoft Outlook" to get name
    on error errMsg number errNum
        error "Outlook AppleScript not available. If you're on 'New Outlook', switch to Classic Outlook. " & errMsg number errNum
    end try

    tell application "Microsoft Outlook"
        set newMessage to make new outgoing message
        tell newMessage
            make new recipient at end of to recipients with properties {{email address:{{address:"{to}"}}}}
            set subject to "{subject}"
            set content to "{body}"
            {attach}
            open
        end tell
        activate
    end tell
end run"#
    )
}

/// Opens each draft in Outlook via `osascript`
#[derive(Debug, Clone, Default)]
pub struct OutlookMailer;

impl OutlookMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Mailer for OutlookMailer {
    async fn create_draft(&self, draft: &Draft) -> Result<()> {
        if !cfg!(target_os = "macos") {
            return Err(DraftMateError::Mail(
                "Outlook automation requires macOS (use --dry-run elsewhere)".into(),
            ));
        }

        let output = Command::new("osascript")
            .arg("-e")
            .arg(draft_script(draft))
            .output()
            .await
            .map_err(|e| DraftMateError::Mail(format!("failed to run osascript: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DraftMateError::Mail(format!(
                "osascript failed (code {:?}): {}",
                output.status.code(),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

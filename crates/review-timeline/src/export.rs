//! Canonical plain-text rendering of a single feed item.
//!
//! The renderer only ever reads notes and file references through the
//! authorization it is given. Withheld content is either omitted or replaced
//! by a fixed marker, never echoed.

use chrono::SecondsFormat;

use crate::config::ExportConfig;
use crate::model::{non_blank, TimelineUpdate};
use crate::permissions::Authorization;
use crate::timeline::CombinedUpdate;

/// Marker written in place of withheld content.
pub const RESTRICTED_MARKER: &str = "[restricted]";

/// Plain-text exporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exporter {
    file_url_prefix: String,
    restricted_markers: bool,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

impl Exporter {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            file_url_prefix: config.file_url_prefix.clone(),
            restricted_markers: config.restricted_markers,
        }
    }

    /// Render using the item's own authorization.
    pub fn render(&self, item: &CombinedUpdate) -> String {
        self.render_with(item, item.authorization)
    }

    /// Render honoring `authorization` for notes and file.
    pub fn render_with(&self, item: &CombinedUpdate, authorization: Authorization) -> String {
        let mut lines = Vec::new();
        let update = &item.update;

        let heading = match update {
            TimelineUpdate::Author(_) => "Author update",
            TimelineUpdate::Referee(_) => "Referee review",
        };
        lines.push(format!("{} #{}", heading, update.id()));
        lines.push(format!("From: {}", item.actor_name));
        lines.push(format!(
            "Date: {}",
            update
                .created_date()
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        ));

        let file_label = match update {
            TimelineUpdate::Author(revision) => {
                push_field(&mut lines, "Updated Title", revision.title.as_deref());
                push_field(&mut lines, "Updated Abstract", revision.abstract_tr.as_deref());
                push_field(
                    &mut lines,
                    "Updated Abstract (English)",
                    revision.abstract_en.as_deref(),
                );
                push_field(&mut lines, "Updated Keywords", revision.keywords.as_deref());
                push_field(
                    &mut lines,
                    "Updated Keywords (English)",
                    revision.keywords_en.as_deref(),
                );
                "Updated File"
            }
            TimelineUpdate::Referee(_) => "Review File",
        };

        if let Some(path) = update.file_path() {
            if authorization.can_view_file() {
                lines.push(format!("{}: {}", file_label, self.file_url(path)));
            } else if self.restricted_markers {
                lines.push(format!("{}: {}", file_label, RESTRICTED_MARKER));
            }
        }

        if let Some(notes) = update.notes() {
            if authorization.can_view_notes() {
                push_field(&mut lines, "Notes", Some(notes));
            } else if self.restricted_markers {
                lines.push(format!("Notes: {}", RESTRICTED_MARKER));
            }
        }

        lines.join("\n")
    }

    /// Link for a stored file path. Absolute URLs are left alone.
    pub fn file_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.file_url_prefix.is_empty() {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.file_url_prefix.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// [`Exporter::render_with`] using the default export settings.
pub fn serialize(item: &CombinedUpdate, authorization: Authorization) -> String {
    Exporter::default().render_with(item, authorization)
}

/// `Label: value`, with continuation lines of multi-line values indented.
fn push_field(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    let Some(value) = non_blank(value) else {
        return;
    };
    let mut parts = value.lines();
    let first = parts.next().unwrap_or_default();
    lines.push(format!("{}: {}", label, first));
    lines.extend(parts.map(|line| format!("  {}", line)));
}

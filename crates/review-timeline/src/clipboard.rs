//! Layered clipboard delivery.
//!
//! A [`ClipboardChain`] tries interchangeable [`ClipboardStrategy`] layers in
//! order. A layer failure is recorded and the next layer is tried; only when
//! every layer has failed does the caller see [`CopyOutcome::Failed`], which
//! hands the text back for manual selection.

use std::io::{IsTerminal, Write};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::error::ClipboardError;

/// One way of placing text on a clipboard.
pub trait ClipboardStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn attempt(&self, text: &str) -> Result<(), ClipboardError>;
}

/// A layer that did not take the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerFailure {
    pub strategy: String,
    pub error: String,
}

/// Three-tier result of a copy request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CopyOutcome {
    /// The first layer took the text
    Copied { strategy: String },
    /// A later layer took the text after earlier ones failed
    Degraded {
        strategy: String,
        failures: Vec<LayerFailure>,
    },
    /// Every layer failed; `text` is left for the user to select by hand
    Failed {
        text: String,
        failures: Vec<LayerFailure>,
    },
}

impl CopyOutcome {
    /// The text reached a clipboard through some layer.
    pub fn is_copied(&self) -> bool {
        !matches!(self, CopyOutcome::Failed { .. })
    }

    pub fn failures(&self) -> &[LayerFailure] {
        match self {
            CopyOutcome::Copied { .. } => &[],
            CopyOutcome::Degraded { failures, .. } | CopyOutcome::Failed { failures, .. } => {
                failures
            }
        }
    }

    /// Text to show for manual selection, when nothing else worked.
    pub fn manual_text(&self) -> Option<&str> {
        match self {
            CopyOutcome::Failed { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Ordered clipboard layers.
#[derive(Default)]
pub struct ClipboardChain {
    layers: Vec<Box<dyn ClipboardStrategy>>,
}

impl ClipboardChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform command first, then the terminal escape sequence.
    pub fn system() -> Self {
        Self::new()
            .with(CommandClipboard::system_default())
            .with(Osc52Clipboard::stdout())
    }

    pub fn with(mut self, strategy: impl ClipboardStrategy + 'static) -> Self {
        self.layers.push(Box::new(strategy));
        self
    }

    pub fn push(&mut self, strategy: Box<dyn ClipboardStrategy>) {
        self.layers.push(strategy);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn copy(&self, text: &str) -> CopyOutcome {
        let mut failures = Vec::new();

        for (index, layer) in self.layers.iter().enumerate() {
            match layer.attempt(text) {
                Ok(()) if index == 0 => {
                    return CopyOutcome::Copied {
                        strategy: layer.name().to_string(),
                    };
                }
                Ok(()) => {
                    tracing::debug!("Copied via fallback layer {}", layer.name());
                    return CopyOutcome::Degraded {
                        strategy: layer.name().to_string(),
                        failures,
                    };
                }
                Err(e) => {
                    tracing::debug!("Clipboard layer {} failed: {}", layer.name(), e);
                    failures.push(LayerFailure {
                        strategy: layer.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::warn!(
            "All {} clipboard layers failed, falling back to manual copy",
            self.layers.len()
        );
        CopyOutcome::Failed {
            text: text.to_string(),
            failures,
        }
    }
}

/// Copy `text` through `chain`.
pub fn copy_to_clipboard(chain: &ClipboardChain, text: &str) -> CopyOutcome {
    chain.copy(text)
}

/// Pipes the text into a clipboard utility such as `pbcopy` or `xclip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The usual clipboard utility for the current platform.
    pub fn system_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("pbcopy", &[])
        } else if cfg!(target_os = "windows") {
            Self::new("clip", &[])
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Self::new("wl-copy", &[])
        } else {
            Self::new("xclip", &["-selection", "clipboard"])
        }
    }
}

impl ClipboardStrategy for CommandClipboard {
    fn name(&self) -> &str {
        &self.program
    }

    fn attempt(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::Unavailable(format!("{}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClipboardError::Rejected(e.to_string()));
            }
        }

        let status = child
            .wait()
            .map_err(|e| ClipboardError::Rejected(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Rejected(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Writes an OSC 52 escape sequence, which most terminal emulators turn into
/// a clipboard write.
pub struct Osc52Clipboard {
    sink: Option<Mutex<Box<dyn Write + Send>>>,
}

impl Osc52Clipboard {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Some(Mutex::new(Box::new(sink))),
        }
    }

    /// Standard output, if it is a terminal.
    pub fn stdout() -> Self {
        let stdout = std::io::stdout();
        if stdout.is_terminal() {
            Self::new(stdout)
        } else {
            Self { sink: None }
        }
    }

    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
    }
}

impl ClipboardStrategy for Osc52Clipboard {
    fn name(&self) -> &str {
        "osc52"
    }

    fn attempt(&self, text: &str) -> Result<(), ClipboardError> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| ClipboardError::Unavailable("output is not a terminal".to_string()))?;
        let mut sink = sink
            .lock()
            .map_err(|_| ClipboardError::Unavailable("terminal writer poisoned".to_string()))?;

        sink.write_all(Self::sequence(text).as_bytes())
            .map_err(|e| ClipboardError::Rejected(e.to_string()))?;
        sink.flush()
            .map_err(|e| ClipboardError::Rejected(e.to_string()))
    }
}

/// In-process clipboard, for embedding and tests.
#[derive(Debug)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    available: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self {
            contents: Mutex::new(None),
            available: true,
        }
    }

    /// A clipboard that refuses every write.
    pub fn unavailable() -> Self {
        Self {
            contents: Mutex::new(None),
            available: false,
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardStrategy for MemoryClipboard {
    fn name(&self) -> &str {
        "memory"
    }

    fn attempt(&self, text: &str) -> Result<(), ClipboardError> {
        if !self.available {
            return Err(ClipboardError::Unavailable("clipboard disabled".to_string()));
        }
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| ClipboardError::Rejected("clipboard poisoned".to_string()))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

impl<T: ClipboardStrategy + ?Sized> ClipboardStrategy for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn attempt(&self, text: &str) -> Result<(), ClipboardError> {
        (**self).attempt(text)
    }
}

use std::io::{self, BufRead, Write};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use lumina_engine::{CredentialSource, EnvCredentials};

/// Terminal key selection.
///
/// A key entered at the prompt wins over `GEMINI_API_KEY`/`GOOGLE_API_KEY`.
/// The key stays in memory only.
#[derive(Debug, Default)]
pub struct ConsoleCredentials {
    selected: RwLock<Option<String>>,
}

impl ConsoleCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompts on `output` and reads one line from `input`.
    ///
    /// Returns true only when a key was entered; a blank line keeps the
    /// current selection and returns false.
    pub fn select_key_with(&self, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
        write!(output, "Paste a Gemini API key (blank to cancel): ")?;
        output.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
        let key = line.trim();
        if key.is_empty() {
            return Ok(false);
        }
        let mut selected = self
            .selected
            .write()
            .map_err(|_| anyhow!("API key lock poisoned"))?;
        *selected = Some(key.to_string());
        Ok(true)
    }

    fn entered_key(&self) -> Option<String> {
        self.selected.read().ok().and_then(|selected| selected.clone())
    }
}

impl CredentialSource for ConsoleCredentials {
    fn has_selected_key(&self) -> bool {
        self.entered_key().is_some() || EnvCredentials.has_selected_key()
    }

    fn select_key(&self) -> Result<bool> {
        self.select_key_with(&mut io::stdin().lock(), &mut io::stdout())
    }

    fn resolve_key(&self) -> Result<String> {
        match self.entered_key() {
            Some(key) => Ok(key),
            None => EnvCredentials.resolve_key(),
        }
    }
}

//! Credential setup: detection, input, and optional persistence.
//!
//! Keys entered here live in the session config. Saving writes them into the
//! config file with `toml_edit`, so existing comments and layout survive.

use std::path::Path;

use dialoguer::{Password, Select};
use imgscout_core::config::resolve_env_var;
use imgscout_core::{Config, HostKind};

use super::theme::{note, scout_theme, warn};

/// True when a config value resolves to something usable (literal or set env var).
pub(crate) fn has_credential(value: &str) -> bool {
    resolve_env_var(value).is_some()
}

/// One-word description of the upload host's credential state.
pub fn host_credential_summary(config: &Config) -> &'static str {
    match config.upload.host {
        HostKind::Imgbb if has_credential(&config.upload.imgbb.api_key) => "API key set",
        HostKind::Imgbb => "no API key",
        HostKind::Catbox if has_credential(&config.upload.catbox.userhash) => "userhash set",
        HostKind::Catbox => "anonymous",
    }
}

/// A credential the user can enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Credential {
    ImgbbKey,
    CatboxUserhash,
    GoogleKey,
    GoogleCx,
}

impl Credential {
    fn label(self) -> &'static str {
        match self {
            Credential::ImgbbKey => "ImgBB API key",
            Credential::CatboxUserhash => "Catbox userhash",
            Credential::GoogleKey => "Google API key",
            Credential::GoogleCx => "Google search engine ID (cx)",
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            Credential::ImgbbKey => "IMGBB_API_KEY",
            Credential::CatboxUserhash => "CATBOX_USERHASH",
            Credential::GoogleKey => "GOOGLE_API_KEY",
            Credential::GoogleCx => "GOOGLE_CX",
        }
    }

    /// Table path and key inside the config file.
    pub(crate) fn location(self) -> (&'static [&'static str], &'static str) {
        match self {
            Credential::ImgbbKey => (&["upload", "imgbb"], "api_key"),
            Credential::CatboxUserhash => (&["upload", "catbox"], "userhash"),
            Credential::GoogleKey => (&["search", "google"], "api_key"),
            Credential::GoogleCx => (&["search", "google"], "cx"),
        }
    }

    fn current(self, config: &Config) -> &str {
        match self {
            Credential::ImgbbKey => &config.upload.imgbb.api_key,
            Credential::CatboxUserhash => &config.upload.catbox.userhash,
            Credential::GoogleKey => &config.search.google.api_key,
            Credential::GoogleCx => &config.search.google.cx,
        }
    }

    fn slot(self, config: &mut Config) -> &mut String {
        match self {
            Credential::ImgbbKey => &mut config.upload.imgbb.api_key,
            Credential::CatboxUserhash => &mut config.upload.catbox.userhash,
            Credential::GoogleKey => &mut config.search.google.api_key,
            Credential::GoogleCx => &mut config.search.google.cx,
        }
    }
}

/// Menu for entering any credential.
pub fn guided_credentials(config: &mut Config) -> anyhow::Result<()> {
    let theme = scout_theme();
    let options = [
        Credential::ImgbbKey,
        Credential::CatboxUserhash,
        Credential::GoogleKey,
        Credential::GoogleCx,
    ];

    loop {
        let mut items: Vec<String> = options
            .iter()
            .map(|c| {
                let state = if has_credential(c.current(config)) {
                    "set"
                } else {
                    "not set"
                };
                format!("{} ({state})", c.label())
            })
            .collect();
        items.push("Back".to_string());

        let choice = Select::with_theme(&theme)
            .with_prompt("Which credential?")
            .items(&items)
            .default(0)
            .interact_opt()?;

        match choice {
            Some(i) if i < options.len() => {
                prompt_credential(config, options[i])?;
            }
            _ => return Ok(()),
        }
    }
}

/// Make sure the selected upload host can be used, prompting if needed.
///
/// Returns false when the host needs a key and the user declined to give one.
pub fn ensure_upload_credentials(config: &mut Config) -> anyhow::Result<bool> {
    if config.upload.host != HostKind::Imgbb || has_credential(&config.upload.imgbb.api_key) {
        return Ok(true);
    }
    warn(format!("{} not set.", Credential::ImgbbKey.env_var()));
    prompt_credential(config, Credential::ImgbbKey)
}

/// Ask for one credential, store it in the session config, optionally persist it.
///
/// Returns true when a value was entered.
fn prompt_credential(config: &mut Config, credential: Credential) -> anyhow::Result<bool> {
    let theme = scout_theme();

    let value: String = match Password::with_theme(&theme)
        .with_prompt(format!("Enter your {} (Esc to skip)", credential.label()))
        .allow_empty_password(true)
        .interact()
    {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return Ok(false),
    };

    let save_options = &["Yes, save to config file", "No, use for this session only"];
    let save_choice = Select::with_theme(&theme)
        .with_prompt("Save for future sessions?")
        .items(save_options)
        .default(0)
        .interact_opt()?;

    match save_choice {
        Some(0) => {
            let path = Config::default_path();
            match save_credential(&path, credential, &value) {
                Ok(()) => note(format!("Saved to {}", path.display())),
                Err(e) => {
                    warn(format!("Could not save to config: {e}"));
                    eprintln!("  Using it for this session only.");
                }
            }
        }
        Some(1) => {}
        _ => return Ok(false),
    }

    *credential.slot(config) = value;
    Ok(true)
}

/// Write one credential into the config file, keeping everything else intact.
pub(crate) fn save_credential(
    config_path: &Path,
    credential: Credential,
    value: &str,
) -> anyhow::Result<()> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };
    let mut doc: toml_edit::DocumentMut = content.parse()?;

    let (sections, key) = credential.location();
    let mut table = doc.as_table_mut();
    for name in sections {
        let entry = table.entry(name).or_insert_with(|| {
            let mut t = toml_edit::Table::new();
            t.set_implicit(true);
            toml_edit::Item::Table(t)
        });
        table = entry
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("[{name}] in config is not a table"))?;
    }
    table.insert(key, toml_edit::value(value));

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;
    Ok(())
}

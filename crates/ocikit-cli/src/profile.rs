//! Optional `ocikit.toml` profile: `[source]` and `[target]` vault sections.
//!
//! Command-line flags always win; the profile only fills in what the flags
//! leave unset.

use anyhow::{Context, Result};

/// One vault's worth of profile values. Empty strings mean "not set".
#[derive(Debug, Default, Clone)]
pub struct ProfileVault {
    pub region: String,
    pub compartment: String,
    pub vault: String,
    /// Encryption key OCID; only meaningful under `[target]`.
    pub key: String,
}

/// Parsed profile file.
#[derive(Debug, Default)]
pub struct Profile {
    pub source: ProfileVault,
    pub target: ProfileVault,
}

#[derive(Clone, Copy)]
enum Section {
    Source,
    Target,
}

/// Read and parse a profile file.
///
/// # Errors
///
/// Fails if the file cannot be read.
pub fn load(path: &str) -> Result<Profile> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    Ok(parse(&content))
}

/// Minimal TOML parsing — only flat `key = "value"` lines under the two
/// vault sections are recognized.
fn parse(content: &str) -> Profile {
    let mut profile = Profile::default();
    let mut section: Option<Section> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed.starts_with('[') {
            section = match trimmed {
                "[source]" => Some(Section::Source),
                "[target]" => Some(Section::Target),
                _ => None,
            };
            continue;
        }
        let Some(current) = section else { continue };
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').to_owned();
            let entry = match current {
                Section::Source => &mut profile.source,
                Section::Target => &mut profile.target,
            };
            match key {
                "region" => entry.region = value,
                "compartment" => entry.compartment = value,
                "vault" => entry.vault = value,
                "key" => entry.key = value,
                _ => {}
            }
        }
    }

    profile
}

//! Tool configuration.
//!
//! `poolctl` describes which parameter descriptions make up the pool in a
//! `.parampool.toml` file next to the program being configured:
//!
//! ```toml
//! poolfile = "saved.pool"
//! missing_keys = "warn"
//!
//! [[import]]
//! file = "dolfin-schema.json"
//! format = "schema"
//! mount = "dolfin"
//! ```
//!
//! Relative paths are taken relative to the directory of the config file.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use log::debug;
use parampool::{
    JsonValue, Pool, PoolBuilder,
    import::{ImportMode, JsonDescription, SchemaDescription},
    traverse::MissingKeyPolicy,
};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG: &str = ".parampool.toml";

/// How an imported file describes its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// A JSON Schema document.
    #[default]
    Schema,
    /// A plain JSON object whose values are the defaults.
    Json,
    /// A TOML table read like [`Format::Json`].
    Toml,
}

impl Format {
    /// Plain description format implied by the file extension.
    pub fn for_description(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

/// One foreign description mounted into the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportSpec {
    pub file: PathBuf,
    #[serde(default)]
    pub format: Format,
    /// Group path to mount at; the file stem when absent.
    pub mount: Option<String>,
    /// Merge into existing parameters instead of rejecting overlaps.
    #[serde(default)]
    pub merge: bool,
}

impl ImportSpec {
    pub fn mount(&self) -> String {
        match &self.mount {
            Some(mount) => mount.clone(),
            None => self
                .file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    fn mode(&self) -> ImportMode {
        if self.merge {
            ImportMode::Merge
        } else {
            ImportMode::Reject
        }
    }

    fn read(&self) -> Result<JsonValue> {
        let text = fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let value = match self.format {
            Format::Schema | Format::Json => serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", self.file.display()))?,
            Format::Toml => toml::from_str(&text)
                .with_context(|| format!("{} is not valid TOML", self.file.display()))?,
        };
        Ok(value)
    }

    /// Read the file and mount it into `builder`.
    pub fn apply(&self, builder: &mut PoolBuilder) -> Result<()> {
        let document = self.read()?;
        let mount = self.mount();
        debug!("importing {} at `{mount}`", self.file.display());
        let imported = match self.format {
            Format::Schema => {
                builder.import(&mount, &SchemaDescription::new(&document), self.mode())
            }
            Format::Json | Format::Toml => {
                builder.import(&mount, &JsonDescription::new(&document), self.mode())
            }
        };
        imported.with_context(|| format!("failed to import {}", self.file.display()))?;
        Ok(())
    }
}

/// Command-line spelling `[MOUNT=]FILE`; the format is set by the caller.
impl FromStr for ImportSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (mount, file) = match s.split_once('=') {
            Some((mount, file)) => (Some(mount.to_string()), file),
            None => (None, s),
        };
        if file.is_empty() {
            return Err("missing file name".to_string());
        }
        Ok(ImportSpec {
            file: PathBuf::from(file),
            format: Format::default(),
            mount,
            merge: false,
        })
    }
}

/// Contents of `.parampool.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Pool-state file applied before the command-line flags.
    pub poolfile: Option<PathBuf>,
    /// Reporting of leaves without counterpart during `export --into`.
    pub missing_keys: MissingKeyPolicy,
    #[serde(rename = "import")]
    pub imports: Vec<ImportSpec>,
}

impl ToolConfig {
    /// Parse config text; relative paths are joined to `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self> {
        let mut config: ToolConfig = toml::from_str(text)?;
        for spec in &mut config.imports {
            spec.file = base.join(&spec.file);
        }
        if let Some(poolfile) = &mut config.poolfile {
            *poolfile = base.join(&*poolfile);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let base = path.parent().unwrap_or(Path::new(""));
        Self::parse(&text, base).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Load `path`, or the default config file when it exists.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG).is_file() => Self::load(Path::new(DEFAULT_CONFIG)),
            None => Ok(Self::default()),
        }
    }

    /// Build the pool from every import, in order.
    pub fn build_pool(&self) -> Result<Pool> {
        if self.imports.is_empty() {
            bail!("no parameter descriptions given; use --schema, --describe or {DEFAULT_CONFIG}");
        }
        let mut builder = PoolBuilder::new();
        for spec in &self.imports {
            spec.apply(&mut builder)?;
        }
        Ok(builder.finalize())
    }
}

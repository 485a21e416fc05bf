use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::InitArgs;

/// Compiler detector used when nothing else is configured
pub const DEFAULT_REGEX_COMPILE: &str = r"^.*-?(gcc|clang|cc|g\+\+|c\+\+|clang\+\+)-?.*(\.exe)?";

/// Source file detector used when nothing else is configured
pub const DEFAULT_REGEX_FILE: &str =
    r#"^.*\s+-c.*\s(?:"|')?(.*\.(?:c|cpp|cc|cxx|c\+\+|s|m|mm|cu))(?:"|')?(\s|$)"#;

/// Config file names, first match wins
const CONFIG_FILES: [&str; 4] =
    ["compiledb.toml", "compiledb.yaml", "compiledb.json", ".compiledb.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig
{
    /// Regular expression for source files to leave out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,

    /// Extra tokens appended to every compile command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macros: Option<String>,

    /// Compiler detector
    pub regex_compile: String,

    /// Source file detector
    pub regex_file: String,

    /// Emit `command` strings instead of `arguments` lists
    pub command_style: bool,

    /// Skip the source file existence check
    pub no_strict: bool,

    /// Resolve the compiler to an absolute path
    pub full_path: bool,

    /// Build tool used by `compiledb make`
    pub make_program: String,
}

impl Default for FileConfig
{
    fn default() -> Self
    {
        Self {
            exclude: None,
            macros: None,
            regex_compile: DEFAULT_REGEX_COMPILE.to_string(),
            regex_file: DEFAULT_REGEX_FILE.to_string(),
            command_style: false,
            no_strict: false,
            full_path: false,
            make_program: "make".to_string(),
        }
    }
}

/// Load configuration from the working directory and `COMPILEDB_*` env vars
pub fn load_config() -> Result<FileConfig>
{
    load_config_from(Path::new("."))
}

/// Load configuration looking for config files under `dir`
pub fn load_config_from(dir: &Path) -> Result<FileConfig>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            tracing::debug!("config file: {}", path.display());
            builder = builder.add_source(config::File::from(path.as_path()));
            break;
        }
    }

    // Add environment variables with COMPILEDB_ prefix
    builder = builder.add_source(config::Environment::with_prefix("COMPILEDB").try_parsing(true));

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: FileConfig = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(args: InitArgs) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = FileConfig::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    println!("Created config file at {}", config_path.display());
    Ok(())
}

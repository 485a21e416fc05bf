use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::core::options::ParseOptions;
use crate::core::shadow::MakeInvocation;
use crate::infra::config::FileConfig;
use crate::infra::io::{InputSource, OutputTarget};
use crate::infra::logging::LogControl;

#[derive(Parser)]
#[command(name = "compiledb")]
#[command(about = "Generate a compile_commands.json compilation database from make build logs")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub options: ParseArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run make, recording its dry-run while the real build runs
    #[command(disable_help_flag = true)]
    Make(MakeArgs),

    /// Initialize a compiledb.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by parse mode and make mode
#[derive(Args, Debug, Clone, Default)]
pub struct ParseArgs {
    /// Build log to parse, or `stdin`
    #[arg(short, long, default_value = "stdin")]
    pub parse: String,

    /// Output file path, `-` for stdout
    #[arg(short, long, default_value = "compile_commands.json")]
    pub output: String,

    /// Initial build directory
    #[arg(short = 'd', long)]
    pub build_dir: Option<String>,

    /// Regular expression for source files to leave out
    #[arg(short, long)]
    pub exclude: Option<String>,

    /// Only run the dry-run in make mode; do not build
    #[arg(short, long)]
    pub no_build: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not check that source files exist
    #[arg(short = 'S', long)]
    pub no_strict: bool,

    /// Extra tokens appended to every compile command
    #[arg(short, long, allow_hyphen_values = true)]
    pub macros: Option<String>,

    /// Emit `command` strings instead of `arguments` lists
    #[arg(short, long)]
    pub command_style: bool,

    /// Write the compiler as an absolute path
    #[arg(long)]
    pub full_path: bool,

    /// Compiler detector [default: ^.*-?(gcc|clang|cc|g\+\+|c\+\+|clang\+\+)-?.*(\.exe)?]
    #[arg(long)]
    pub regex_compile: Option<String>,

    /// Source file detector; capture group 1 is the file
    #[arg(long)]
    pub regex_file: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MakeArgs {
    /// Arguments passed to make verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

/// Everything a run needs, resolved once from flags, config and the
/// process working directory, then passed everywhere.
#[derive(Clone)]
pub struct AppContext {
    pub options: ParseOptions,
    pub output: OutputTarget,
    pub no_build: bool,
    pub make: MakeInvocation,
    pub log: LogControl,
}

impl AppContext {
    /// Flags win over config values; boolean flags can only switch a
    /// setting on. In make mode the log comes from the dry-run, never `--parse`.
    pub fn resolve(
        args: &ParseArgs,
        file: FileConfig,
        make_mode: bool,
        cwd: &Path,
        log: LogControl,
    ) -> Self {
        let input = if make_mode {
            InputSource::Stdin
        } else {
            InputSource::from_arg(&args.parse)
        };

        let build_dir = args
            .build_dir
            .as_deref()
            .map(|d| PathBuf::from(shellexpand::tilde(d).as_ref()))
            .map(|d| if d.is_absolute() { d } else { cwd.join(d) });

        let base_dir = ParseOptions::resolve_base_dir(&input, build_dir.as_deref(), cwd);

        let options = ParseOptions {
            input,
            base_dir,
            exclude: args.exclude.clone().or(file.exclude),
            macros: args.macros.clone().or(file.macros),
            regex_compile: args.regex_compile.clone().unwrap_or(file.regex_compile),
            regex_file: args.regex_file.clone().unwrap_or(file.regex_file),
            command_style: args.command_style || file.command_style,
            no_strict: args.no_strict || file.no_strict,
            full_path: args.full_path || file.full_path,
        };

        let mut make = MakeInvocation::new(file.make_program);
        make.dir = build_dir;

        Self {
            options,
            output: OutputTarget::from_arg(&args.output, cwd),
            no_build: args.no_build,
            make,
            log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv).unwrap()
    }

    fn resolve(cli: &Cli, file: FileConfig) -> AppContext {
        let make_mode = matches!(cli.command, Some(Commands::Make(_)));
        AppContext::resolve(
            &cli.options,
            file,
            make_mode,
            Path::new("/work"),
            LogControl::detached(),
        )
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_is_parse_mode_with_defaults() {
        let cli = parse(&["compiledb"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.options.parse, "stdin");
        assert_eq!(cli.options.output, "compile_commands.json");

        let ctx = resolve(&cli, FileConfig::default());
        assert_eq!(ctx.options.input, InputSource::Stdin);
        assert_eq!(ctx.options.base_dir, "/work");
        assert_eq!(
            ctx.output,
            OutputTarget::File(PathBuf::from("/work/compile_commands.json"))
        );
        assert_eq!(ctx.make.program, "make");
        assert!(!ctx.options.no_strict);
    }

    #[test]
    fn short_flags() {
        let cli = parse(&[
            "compiledb", "-p", "build.log", "-o", "-", "-e", "test_.*", "-S", "-c", "-v", "-m",
            "-DX",
        ]);
        let o = &cli.options;
        assert_eq!(o.parse, "build.log");
        assert_eq!(o.output, "-");
        assert_eq!(o.exclude.as_deref(), Some("test_.*"));
        assert!(o.no_strict && o.command_style && o.verbose);
        assert_eq!(o.macros.as_deref(), Some("-DX"));
    }

    #[test]
    fn make_args_pass_through_verbatim() {
        let cli = parse(&["compiledb", "-n", "make", "-j4", "-C", "src", "--keep-going", "all"]);
        assert!(cli.options.no_build);
        match cli.command {
            Some(Commands::Make(m)) => {
                assert_eq!(m.args, vec!["-j4", "-C", "src", "--keep-going", "all"]);
            }
            _ => panic!("expected make subcommand"),
        }
    }

    #[test]
    fn make_help_goes_to_make() {
        let cli = parse(&["compiledb", "make", "--help"]);
        match cli.command {
            Some(Commands::Make(m)) => assert_eq!(m.args, vec!["--help"]),
            _ => panic!("expected make subcommand"),
        }
    }

    #[test]
    fn flags_override_config_and_bools_accumulate() {
        let cli = parse(&["compiledb", "--regex-compile", "^tcc$", "-S"]);
        let file = FileConfig {
            regex_compile: "^icc$".to_string(),
            exclude: Some("vendor/.*".to_string()),
            command_style: true,
            make_program: "gmake".to_string(),
            ..FileConfig::default()
        };

        let ctx = resolve(&cli, file);
        assert_eq!(ctx.options.regex_compile, "^tcc$");
        assert_eq!(ctx.options.exclude.as_deref(), Some("vendor/.*"));
        assert!(ctx.options.command_style);
        assert!(ctx.options.no_strict);
        assert_eq!(ctx.make.program, "gmake");
    }

    #[test]
    fn build_dir_sets_base_and_make_dir() {
        let cli = parse(&["compiledb", "-d", "out", "make"]);
        let ctx = resolve(&cli, FileConfig::default());
        assert_eq!(ctx.options.base_dir, "/work/out");
        assert_eq!(ctx.make.dir, Some(PathBuf::from("/work/out")));
    }

    #[test]
    fn make_mode_ignores_parse_flag() {
        let cli = parse(&["compiledb", "-p", "/logs/build.log", "make"]);
        let ctx = resolve(&cli, FileConfig::default());
        assert_eq!(ctx.options.input, InputSource::Stdin);
        assert_eq!(ctx.options.base_dir, "/work");
    }
}

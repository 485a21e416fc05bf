//! Compiled regular expressions for one interpreter run.
//!
//! The three user-configurable patterns (compiler detector, source file
//! detector, exclude filter) come from [`ParseOptions`]; the rest are fixed
//! shapes of GNU make output and shell builtins.

use regex::Regex;

use crate::core::options::ParseOptions;

/// Leverage `make --print-directory` announcements
const ENTER_DIR: &str = "^.*-?make.*?: Entering directory .*['`\"](.*)['`\"]$";
const LEAVE_DIR: &str = "^.*-?make.*?: Leaving directory .*['`\"](.*)['`\"]$";

/// `make -C dir ...`
const MAKE_DIR: &str = r"^\s*make.*?-C\s+(.*?)(\s|$)";

/// `cd dir` as one shell sub-command
const CD: &str = r"^cd\s+(.*)";

/// configure probes such as `checking whether cc works... yes`
const CHECKING: &str = r"^\s?checking whether .*(yes|no)$";

#[derive(Debug, thiserror::Error)]
pub enum PatternError
{
    #[error("invalid {name} regex: {source}")]
    Invalid
    {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Every pattern the interpreter needs, compiled once
#[derive(Debug, Clone)]
pub struct Patterns
{
    pub compile: Regex,
    pub file: Regex,
    pub exclude: Option<Regex>,
    pub enter_dir: Regex,
    pub leave_dir: Regex,
    pub make_dir: Regex,
    pub cd: Regex,
    pub checking: Regex,
}

impl Patterns
{
    /// Compile all patterns. Any invalid user pattern is fatal for the run.
    pub fn new(options: &ParseOptions) -> Result<Self, PatternError>
    {
        let exclude = match options
            .exclude
            .as_deref()
        {
            Some(p) if !p.is_empty() => Some(compile("exclude", p)?),
            _ => None,
        };

        Ok(Self {
            compile: compile("regex-compile", &options.regex_compile)?,
            file: compile("regex-file", &options.regex_file)?,
            exclude,
            enter_dir: compile("enter-directory", ENTER_DIR)?,
            leave_dir: compile("leave-directory", LEAVE_DIR)?,
            make_dir: compile("make-directory", MAKE_DIR)?,
            cd: compile("cd", CD)?,
            checking: compile("configure-check", CHECKING)?,
        })
    }
}

fn compile(
    name: &'static str,
    pattern: &str,
) -> Result<Regex, PatternError>
{
    Regex::new(pattern).map_err(|source| PatternError::Invalid { name, source })
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn defaults() -> Patterns
    {
        Patterns::new(&ParseOptions::with_base_dir("/src")).unwrap()
    }

    #[test]
    fn test_invalid_user_pattern_is_reported_by_name()
    {
        let mut opts = ParseOptions::with_base_dir("/src");
        opts.regex_file = "(unclosed".to_string();

        let err = Patterns::new(&opts).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("invalid regex-file regex"));
    }

    #[test]
    fn test_invalid_exclude_is_fatal()
    {
        let mut opts = ParseOptions::with_base_dir("/src");
        opts.exclude = Some("[".to_string());
        assert!(Patterns::new(&opts).is_err());
    }

    #[test]
    fn test_empty_exclude_is_ignored()
    {
        let mut opts = ParseOptions::with_base_dir("/src");
        opts.exclude = Some(String::new());
        assert!(Patterns::new(&opts)
            .unwrap()
            .exclude
            .is_none());
    }

    #[test]
    fn test_directory_markers()
    {
        let p = defaults();

        let caps = p
            .enter_dir
            .captures("make[1]: Entering directory '/src/sub'")
            .unwrap();
        assert_eq!(&caps[1], "/src/sub");

        let caps = p
            .enter_dir
            .captures("make[2]: Entering directory `/src/sub`")
            .unwrap();
        assert_eq!(&caps[1], "/src/sub");

        assert!(p
            .leave_dir
            .is_match("make[1]: Leaving directory '/src/sub'"));
        assert!(p
            .leave_dir
            .is_match("make[1]: Leaving directory `/src/sub`"));
        assert!(!p
            .enter_dir
            .is_match("gcc -c -o a.o a.c"));
    }

    #[test]
    fn test_make_dir_and_cd()
    {
        let p = defaults();

        let caps = p
            .make_dir
            .captures("make -j4 -C lib all")
            .unwrap();
        assert_eq!(&caps[1], "lib");

        let caps = p
            .cd
            .captures("cd build/out")
            .unwrap();
        assert_eq!(&caps[1], "build/out");
        assert!(!p
            .cd
            .is_match("gcc -c cd.c"));
    }

    #[test]
    fn test_configure_probe()
    {
        let p = defaults();
        assert!(p
            .checking
            .is_match("checking whether the C compiler works... yes"));
        assert!(!p
            .checking
            .is_match("gcc -c a.c"));
    }

    #[test]
    fn test_default_compile_and_file_patterns()
    {
        let p = defaults();
        assert!(p
            .compile
            .is_match("arm-none-eabi-gcc"));
        assert!(p
            .compile
            .is_match("clang++"));
        assert!(!p
            .compile
            .is_match("ld"));

        let caps = p
            .file
            .captures("gcc -c -o a.o a.c")
            .unwrap();
        assert_eq!(&caps[1], "a.c");

        let caps = p
            .file
            .captures("gcc -c src/b.cpp -o b.o")
            .unwrap();
        assert_eq!(&caps[1], "src/b.cpp");

        // Link step: no -c
        assert!(p
            .file
            .captures("gcc -o app a.o b.o")
            .is_none());
    }
}

//! Build log interpreter: one pass over the log, producing compile records.
//!
//! Per line, in order: blank skip, directory markers, configure probe skip,
//! compiler pre-filter, backtick expansion, quote unescaping, segmentation,
//! then `cd` handling or compile matching for each sub-command.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::cli::AppContext;
use crate::core::dirstack::DirectoryTracker;
use crate::core::expand::{SubShell, SystemShell, expand_nested};
use crate::core::matcher::CompileMatcher;
use crate::core::options::ParseOptions;
use crate::core::patterns::{PatternError, Patterns};
use crate::core::record::{CompileRecord, ResultSet};
use crate::core::segment::split_commands;
use crate::infra::io::read_lines;

pub struct Interpreter<'a> {
    options: &'a ParseOptions,
    patterns: Patterns,
    shell: &'a dyn SubShell,
}

impl<'a> Interpreter<'a> {
    /// Compile every pattern up front; an invalid one aborts before any line is read
    pub fn new(options: &'a ParseOptions, shell: &'a dyn SubShell) -> Result<Self, PatternError> {
        Ok(Self {
            options,
            patterns: Patterns::new(options)?,
            shell,
        })
    }

    /// Interpret `lines` from a fresh directory state
    pub fn run<S: AsRef<str>>(&self, lines: &[S]) -> ResultSet {
        info!("workingDir: {}", self.options.base_dir);

        let mut tracker = DirectoryTracker::new(&self.options.base_dir);
        let mut results = ResultSet::default();

        for line in lines {
            self.process_line(line.as_ref(), &mut tracker, &mut results);
        }

        results
    }

    fn process_line(&self, raw: &str, tracker: &mut DirectoryTracker, results: &mut ResultSet) {
        tracker.begin_line();

        let line = raw.trim();
        if line.is_empty() {
            return;
        }
        debug!("New command: {}", line);

        if tracker.observe(line, &self.patterns) {
            return;
        }

        if self.patterns.checking.is_match(line) {
            return;
        }

        // Cheap reject before spawning anything for backticks
        if !self.patterns.compile.is_match(line) {
            return;
        }

        let expanded = expand_nested(line, Some(Path::new(tracker.working_dir())), self.shell);

        // Leave quoting to the JSON encoder
        let unescaped = expanded.replace("\\\"", "\"");

        let matcher = CompileMatcher::new(&self.patterns, self.options);

        for command in split_commands(&unescaped) {
            if let Some(caps) = self.patterns.cd.captures(command) {
                tracker.cd(&caps[1]);
                continue;
            }

            if !self.patterns.compile.is_match(command) {
                continue;
            }

            let Ok(m) = matcher.match_command(command, tracker.working_dir()) else {
                continue;
            };

            let record = CompileRecord::new(
                tracker.working_dir(),
                m.arguments,
                m.file,
                self.options.command_style,
            );
            info!("Adding command {}: {}", results.len(), record.command_line());
            results.push(record);
        }
    }
}

/// Parse mode: read the configured log and write the database
#[instrument(skip_all)]
pub fn generate(ctx: &AppContext) -> Result<i32> {
    let interpreter = Interpreter::new(&ctx.options, &SystemShell)?;
    let lines = read_lines(&ctx.options.input)?;

    let results = interpreter.run(&lines);
    results.write_to(&ctx.output)?;

    debug!("Done");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expand::ExpansionError;
    use crate::core::record::Invocation;
    use proptest::prelude::*;

    /// Never expected to run
    struct NoShell;

    impl SubShell for NoShell {
        fn capture(&self, command: &str, _dir: Option<&Path>) -> Result<String, ExpansionError> {
            panic!("unexpected nested command: {command}");
        }
    }

    fn options(base: &str) -> ParseOptions {
        let mut o = ParseOptions::with_base_dir(base);
        o.no_strict = true;
        o
    }

    fn run(opts: &ParseOptions, lines: &[&str]) -> ResultSet {
        Interpreter::new(opts, &NoShell).unwrap().run(lines)
    }

    fn dirs(set: &ResultSet) -> Vec<&str> {
        set.records().iter().map(|r| r.directory.as_str()).collect()
    }

    fn files(set: &ResultSet) -> Vec<&str> {
        set.records().iter().map(|r| r.file.as_str()).collect()
    }

    #[test]
    fn enter_compile_leave() {
        let set = run(
            &options("/root"),
            &[
                "make[1]: Entering directory `/src/sub`",
                "gcc -c -o a.o a.c",
                "make[1]: Leaving directory `/src/sub`",
            ],
        );
        assert_eq!(set.len(), 1);
        assert_eq!(dirs(&set), vec!["/src/sub"]);
        assert_eq!(files(&set), vec!["a.c"]);
    }

    #[test]
    fn inline_cd_applies_to_rest_of_line_only() {
        let set = run(
            &options("/root"),
            &["cd build && gcc -c -o a.o a.c", "gcc -c -o b.o b.c"],
        );
        assert_eq!(dirs(&set), vec!["/root/build", "/root"]);
    }

    #[test]
    fn chained_invocations_keep_order() {
        let set = run(&options("/root"), &["gcc -c a.c -o a.o ; gcc -c b.c -o b.o"]);
        assert_eq!(files(&set), vec!["a.c", "b.c"]);
    }

    #[test]
    fn excluded_file_yields_nothing() {
        let mut o = options("/root");
        o.exclude = Some(".*generated.*".to_string());
        let set = run(&o, &["gcc -c -o x.o generated/x.c"]);
        assert!(set.is_empty());
    }

    #[test]
    fn configure_probes_are_skipped() {
        let set = run(
            &options("/root"),
            &["checking whether gcc -c conftest.c works... yes"],
        );
        assert!(set.is_empty());
    }

    #[test]
    fn marker_lines_are_never_matched() {
        // The path mentions gcc but the line is a marker
        let set = run(&options("/root"), &["make: Entering directory '/opt/gcc -c x.c'"]);
        assert!(set.is_empty());
    }

    #[test]
    fn make_dash_c_pushes_directory_for_following_lines() {
        let set = run(&options("/root"), &["make -C lib", "cc -c -o u.o util.c"]);
        assert_eq!(dirs(&set), vec!["/root/lib"]);
    }

    #[test]
    fn escaped_quotes_are_unescaped() {
        let set = run(&options("/root"), &[r#"gcc -DNAME=\"x\" -c -o a.o a.c"#]);
        match &set.records()[0].invocation {
            Invocation::Arguments(args) => assert_eq!(args[1], "-DNAME=\"x\""),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn command_style_records() {
        let mut o = options("/root");
        o.command_style = true;
        let set = run(&o, &["gcc -c -o a.o a.c"]);
        assert_eq!(
            set.records()[0].invocation,
            Invocation::Command("gcc -c -o a.o a.c".to_string())
        );
    }

    #[test]
    fn invalid_pattern_fails_init() {
        let mut o = options("/root");
        o.regex_compile = "(".to_string();
        assert!(Interpreter::new(&o, &NoShell).is_err());
    }

    #[test]
    fn nested_commands_are_expanded_before_segmentation() {
        struct Flags;
        impl SubShell for Flags {
            fn capture(&self, _c: &str, _d: Option<&Path>) -> Result<String, ExpansionError> {
                Ok("-O2 && gcc -c b.c\n".to_string())
            }
        }

        let o = options("/root");
        let set = Interpreter::new(&o, &Flags).unwrap().run(&["gcc -c a.c `flags`"]);
        assert_eq!(files(&set), vec!["a.c", "b.c"]);
    }

    #[test]
    fn interpreting_twice_is_byte_identical() {
        let o = options("/root");
        let lines = [
            "make[1]: Entering directory '/src'",
            "cd lib && gcc -c -o a.o a.c; g++ -c b.cpp -o b.o",
            "make[1]: Leaving directory '/src'",
        ];
        let interp = Interpreter::new(&o, &NoShell).unwrap();
        let first = interp.run(&lines).to_json().unwrap();
        let second = interp.run(&lines).to_json().unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn lines_without_compiler_never_produce_records(
            lines in proptest::collection::vec("[a-bd-z ;&|-]{0,30}", 0..8)
        ) {
            let o = options("/root");
            let set = Interpreter::new(&o, &NoShell).unwrap().run(&lines);
            prop_assert!(set.is_empty());
        }
    }
}

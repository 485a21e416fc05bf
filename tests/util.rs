//! Shared test utilities for integration tests
//!
//! Provides build log fixtures and a preconfigured binary handle
//! used across multiple test files.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::prelude::*;

/// A recursive make transcript with absolute directories, so the
/// records do not depend on where the fixture lives
pub const RECURSIVE_LOG: &str = "\
make[1]: Entering directory '/src/lib'
gcc -c -o util.o util.c
ar rcs libutil.a util.o
make[1]: Leaving directory '/src/lib'
make[1]: Entering directory '/src/app'
checking whether gcc -c conftest.c works... yes
cd gen && g++ -O2 -c -o parser.o parser.cpp; gcc -c main.c -o main.o
gcc -o app main.o gen/parser.o -L../lib -lutil
make[1]: Leaving directory '/src/app'
";

/// Binary handle running inside `dir`, isolated from caller config
pub fn compiledb(dir: &assert_fs::TempDir) -> Command
{
    let mut cmd = Command::cargo_bin("compiledb").expect("bin");
    cmd.current_dir(dir.path());

    // Keep the developer's environment out of the layered config
    for (key, _) in std::env::vars()
    {
        if key.starts_with("COMPILEDB_")
        {
            cmd.env_remove(key);
        }
    }
    cmd
}

/// Temp dir holding `build.log` with the given content
pub fn log_fixture(content: &str) -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("build.log")
        .write_str(content)
        .expect("write log");
    tmp
}

/// Temp dir with real sources for strict-mode runs
pub fn source_tree() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    for file in ["src/a.c", "src/b.cpp"]
    {
        tmp.child(file)
            .write_str("int x;\n")
            .expect("write source");
    }
    tmp
}

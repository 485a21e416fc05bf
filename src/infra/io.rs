use anyhow::{Context, Result};
use bstr::ByteSlice;
use memmap2::Mmap;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

/// Where build log lines come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `stdin` is the sentinel the CLI uses for standard input
    pub fn from_arg(arg: &str) -> Self {
        if arg == "stdin" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(arg))
        }
    }
}

/// Where the compilation database goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `-` means stdout; relative paths are anchored at `cwd`
    pub fn from_arg(arg: &str, cwd: &Path) -> Self {
        if arg == "-" {
            return OutputTarget::Stdout;
        }

        let path = PathBuf::from(arg);
        if path.is_absolute() {
            OutputTarget::File(path)
        } else {
            OutputTarget::File(cwd.join(path))
        }
    }
}

pub enum FileContent {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl AsRef<[u8]> for FileContent {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileContent::Mapped(mmap) => &mmap[..],
            FileContent::Buffered(buf) => buf.as_slice(),
        }
    }
}

pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("open {} failed", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        // Use memory mapping for large logs
        let file = File::open(path).with_context(|| format!("open {} failed", path.display()))?;

        // Safety: We're only reading the file, not modifying it
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        Ok(FileContent::Mapped(mmap))
    } else {
        let content =
            std::fs::read(path).with_context(|| format!("open {} failed", path.display()))?;

        Ok(FileContent::Buffered(content))
    }
}

/// Split raw bytes into lines, dropping `\n` / `\r\n` and
/// decoding invalid UTF-8 lossily. No line length ceiling.
pub fn split_lines(bytes: &[u8]) -> Vec<String> {
    bytes
        .lines()
        .map(|l| l.to_str_lossy().into_owned())
        .collect()
}

/// Read every line from the configured source
pub fn read_lines(source: &InputSource) -> Result<Vec<String>> {
    match source {
        InputSource::Stdin => {
            tracing::debug!("Build from stdin");
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("read stdin failed")?;
            Ok(split_lines(&buf))
        }
        InputSource::File(path) => {
            tracing::debug!("Build from file");
            let content = read_file_smart(path)?;
            Ok(split_lines(content.as_ref()))
        }
    }
}

/// Pretty formatter that additionally escapes `<`, `>`, `&`, U+2028 and
/// U+2029 as `\uXXXX`, matching databases produced by existing tooling.
struct HtmlSafeFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl HtmlSafeFormatter<'_> {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for HtmlSafeFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let esc = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(esc.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Render `value` as 2-space indented JSON
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4096);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, HtmlSafeFormatter::new());
    value
        .serialize(&mut ser)
        .context("Error encoding JSON")?;
    Ok(out)
}

/// Write rendered JSON to the target. Files get the bytes as-is,
/// stdout gets a trailing newline.
pub fn write_output(target: &OutputTarget, json: &[u8]) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json).context("write stdout failed")?;
            stdout.write_all(b"\n").context("write stdout failed")?;
            stdout.flush().context("write stdout failed")?;
        }
        OutputTarget::File(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("write {} failed", path.display()))?;
        }
    }
    Ok(())
}

//! Source-file table and the pluggable file reader.
//!
//! `.file`/`.cv_file` directives register a numbered path here; the listing
//! analyzer then asks the [`SourceReader`] for that file's lines so that
//! `.loc`/`.cv_loc` directives can be rendered as the quoted source line.
//! Reading is best-effort: a path that cannot be read is remembered with its
//! lines absent and rendering falls back to a bare header.

use std::collections::HashMap;

use crate::{AsmToken, AsmTokenKind};

/// External dependency that loads a source file as lines.
///
/// Implementations must not panic into the analyzer; any failure is reported
/// as `None`.
pub trait SourceReader: Send + Sync {
    /// All lines of `path`, or `None` if the file cannot be read.
    fn read_lines(&self, path: &str) -> Option<Vec<String>>;
}

/// Default reader backed by the local filesystem.
#[derive(Debug, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read_lines(&self, path: &str) -> Option<Vec<String>> {
        std::fs::read_to_string(path)
            .ok()
            .map(|text| text.lines().map(str::to_owned).collect())
    }
}

/// Reader that knows no files; used where source text is irrelevant.
#[derive(Debug, Default)]
pub struct NullSourceReader;

impl SourceReader for NullSourceReader {
    fn read_lines(&self, _path: &str) -> Option<Vec<String>> {
        None
    }
}

/// One registered source file.
#[derive(Debug, Clone)]
pub struct SourceFileEntry {
    /// Path with backslashes normalized to forward slashes.
    pub path: String,
    /// The file's lines, or `None` when the reader could not load it.
    pub lines: Option<Vec<String>>,
}

impl SourceFileEntry {
    /// Final path component, used in rendered location headers.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(self.path.as_str())
    }
}

/// `fileno → source file` map built from `.file`/`.cv_file` directives.
#[derive(Debug, Default)]
pub struct FileTable {
    entries: HashMap<u32, SourceFileEntry>,
}

impl FileTable {
    /// Look up a registered file number.
    pub fn get(&self, fileno: u32) -> Option<&SourceFileEntry> {
        self.entries.get(&fileno)
    }

    /// Number of registered files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no `.file` directive has been seen.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume a `.file N "path"` / `.cv_file funcid N "path"` token run.
    ///
    /// The file number is the last number before the quoted path; `.cv_file`
    /// carries a leading function id that is skipped that way. Reader
    /// failures are swallowed: the entry is stored with absent lines.
    pub(crate) fn register_from_directive(
        &mut self,
        input: &str,
        tokens: &[AsmToken],
        reader: &dyn SourceReader,
    ) {
        let mut fileno = 0u32;
        let mut path = None;
        for token in tokens {
            match token.kind {
                AsmTokenKind::Number => {
                    fileno = parse_number(token.text(input));
                }
                AsmTokenKind::String => {
                    path = Some(unescape_path(token.text(input)));
                    break;
                }
                _ => {}
            }
        }
        let Some(path) = path else {
            log::debug!("file directive without a quoted path");
            return;
        };

        let lines = reader.read_lines(&path);
        if lines.is_none() {
            log::debug!("source file `{}` could not be read", path);
        }
        self.entries.insert(fileno, SourceFileEntry { path, lines });
    }
}

/// Extract `(fileno, lineno, colno)` from a `.loc`/`.cv_loc` token run.
///
/// `.cv_loc` carries a leading function id which is skipped. Missing or
/// unparsable numbers default to 0; trailing options (`prologue_end`,
/// `is_stmt 0`, ...) are ignored.
pub(crate) fn parse_location(input: &str, tokens: &[AsmToken]) -> (u32, u32, u32) {
    let mut numbers = [0u32; 3];
    let mut seen = 0usize;

    let mut skip = tokens
        .iter()
        .find(|t| t.kind == AsmTokenKind::SourceLocation)
        .map(|t| t.text(input) == ".cv_loc")
        .unwrap_or(false);

    for token in tokens {
        if token.kind != AsmTokenKind::Number {
            // Options after the numbers end the positional part.
            if seen > 0 && token.kind == AsmTokenKind::Identifier {
                break;
            }
            continue;
        }
        if skip {
            skip = false;
            continue;
        }
        numbers[seen] = parse_number(token.text(input));
        seen += 1;
        if seen == numbers.len() {
            break;
        }
    }

    (numbers[0], numbers[1], numbers[2])
}

fn parse_number(text: &str) -> u32 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).unwrap_or(0);
    }
    text.parse().unwrap_or(0)
}

/// Strip the quotes and turn backslashed path separators into `/`.
fn unescape_path(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(quoted);
    inner.replace("\\\\", "/").replace('\\', "/")
}

/// In-memory reader used by tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::SourceReader;
    use std::collections::HashMap;

    pub(crate) struct MapSourceReader {
        files: HashMap<String, Vec<String>>,
    }

    impl MapSourceReader {
        pub(crate) fn new(files: &[(&str, &str)]) -> Self {
            MapSourceReader {
                files: files
                    .iter()
                    .map(|(path, text)| {
                        (path.to_string(), text.lines().map(str::to_owned).collect())
                    })
                    .collect(),
            }
        }
    }

    impl SourceReader for MapSourceReader {
        fn read_lines(&self, path: &str) -> Option<Vec<String>> {
            self.files.get(path).cloned()
        }
    }
}

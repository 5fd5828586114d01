use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use serde::Serialize;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "asciidoc", "adoc",
    "rs", "py", "js", "ts", "jsx", "tsx", "java", "c", "cpp", "cxx", "cc", "h", "hpp", "hxx",
    "go", "rb", "php", "swift", "kt", "kts", "scala", "clj", "cljs", "hs", "ml", "fs", "fsx",
    "html", "htm", "xml", "xhtml", "css", "scss", "sass", "less", "svg", "vue", "svelte",
    "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "config", "properties",
    "sql", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd", "dockerfile", "makefile", "cmake",
    "gradle", "tex", "bib", "r", "pl", "lua", "vim", "el", "lisp",
    "dart", "elm", "ex", "exs", "erl", "hrl", "nim", "cr", "zig",
    "log", "diff", "patch", "gitignore", "gitattributes", "editorconfig",
    "env", "example", "sample", "template",
    "lock", "sum", "mod", "ron", "mjs", "cjs", "graphql", "gql", "prisma", "proto",
    "jsonl", "ndjson", "csv", "tsv", "org", "jl", "ipynb", "pyi", "nix", "just",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "webp",
    "tiff", "tif", "raw", "cr2", "nef", "orf", "dng",
    "heic", "heif", "avif", "jfif",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "app", "deb", "rpm", "msi",
    "zip", "tar", "gz", "bz2", "7z", "rar", "jar", "war",
    "mp3", "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm",
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "bin", "dat", "db", "sqlite", "sqlite3",
    "rlib", "rmeta", "pdb", "ilk", "exp", "lib", "a",
    "obj", "o", "class", "pyc", "pyo", "wasm",
    "crate", "gem", "whl", "egg",
];

/// Files above this size are not sniffed and count as binary.
const MAX_SNIFF_FILE_SIZE: u64 = 20 * 1024 * 1024;
const SNIFF_LEN: usize = 1024;

/// Outcome of the text/binary heuristic for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextDetection {
    pub is_text: bool,
    /// What decided a binary verdict.
    pub detail: Option<String>,
}

impl TextDetection {
    fn text() -> Self {
        Self {
            is_text: true,
            detail: None,
        }
    }

    fn binary(detail: impl Into<String>) -> Self {
        Self {
            is_text: false,
            detail: Some(detail.into()),
        }
    }
}

/// Determines if a file is likely to be a text file.
///
/// Known extensions decide immediately; anything else is judged by its first
/// bytes.
pub fn detect_text(path: &Path) -> io::Result<TextDetection> {
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        let ext_lower = extension.to_lowercase();

        if TEXT_EXTENSIONS.contains(&ext_lower.as_str()) {
            return Ok(TextDetection::text());
        }
        if BINARY_EXTENSIONS.contains(&ext_lower.as_str())
            || IMAGE_EXTENSIONS.contains(&ext_lower.as_str())
        {
            return Ok(TextDetection::binary(format!("extension .{ext_lower}")));
        }
    }

    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_SNIFF_FILE_SIZE {
        return Ok(TextDetection::binary("too large to inspect"));
    }

    check_file_content(path)
}

/// Checks file content to determine if it's text or binary.
fn check_file_content(path: &Path) -> io::Result<TextDetection> {
    let start = std::time::Instant::now();
    let mut reader = BufReader::new(File::open(path)?);
    let mut buffer = [0; SNIFF_LEN];
    let bytes_read = reader.read(&mut buffer)?;
    let sample = &buffer[..bytes_read];

    let detection = if sample.contains(&0) {
        TextDetection::binary("null byte")
    } else {
        match std::str::from_utf8(sample) {
            Ok(_) => TextDetection::text(),
            // A multi-byte character cut off by the sample boundary is fine.
            Err(e) if e.error_len().is_none() => TextDetection::text(),
            Err(_) => TextDetection::binary("not valid UTF-8"),
        }
    };

    tracing::debug!(
        "Content check for {:?}: {} bytes, text={} ({:?})",
        path,
        bytes_read,
        detection.is_text,
        start.elapsed()
    );
    Ok(detection)
}

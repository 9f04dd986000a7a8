//! Trace stream reader: extracts `@SYM_EXEC_EXTRACTOR_BEGIN`/`_END`
//! delimited XML blocks from mixed-content input files, transparently
//! decompressing by extension, and turns each top-level XML child into an
//! `ExecTree` (SPEC_FULL.md §4.1, §6).

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::{info, warn};
use xz2::read::XzDecoder;

use crate::error::TraceError;
use crate::tree::{self, contained_resolver, no_resolver, CodeResolver, ExecTree};
use crate::xmlnode::parse_xml_fragment;

const SIG_BEGIN: &str = "@SYM_EXEC_EXTRACTOR_BEGIN";
const SIG_END: &str = "@SYM_EXEC_EXTRACTOR_END";
const ONE_GB: usize = 1 << 30;

/// The input-file extensions this tool knows how to read, plain or
/// compressed (mirrors the distilled spec's `LOADERS` table).
pub fn supported_extensions() -> Vec<&'static str> {
    vec![".as", ".as.xz", ".as.lzma", ".as.bz2", ".as.gz", ".as.gzip"]
}

pub fn is_supported_file(path: &Path) -> bool {
    let name = path.to_string_lossy();
    supported_extensions().iter().any(|ext| name.ends_with(ext))
}

/// Opens `path` for reading, transparently decompressing based on its
/// extension. Plain files and unrecognized extensions fall through to a
/// direct file open.
fn open_transparent(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let name = path.to_string_lossy();
    let reader: Box<dyn Read> = if name.ends_with(".xz") || name.ends_with(".lzma") {
        Box::new(XzDecoder::new(file))
    } else if name.ends_with(".bz2") {
        Box::new(BzDecoder::new(file))
    } else if name.ends_with(".gz") || name.ends_with(".gzip") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Strips a known compressed suffix and `.as` to guess the path to the
/// original source file this trace names in its `CODE` payloads, mirroring
/// the distilled spec's `FilenameResolver`.
fn guess_container_name(path: &Path, db_root: &Path) -> String {
    let relative = path.strip_prefix(db_root).unwrap_or(path);
    let mut name = relative.to_string_lossy().to_string();
    loop {
        let stripped = Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().to_string());
        match stripped.as_deref() {
            Some("as") => {
                name.truncate(name.len() - 3);
                break;
            }
            Some(ext) if !ext.is_empty() => {
                name.truncate(name.len() - ext.len() - 1);
            }
            _ => break,
        }
    }
    name
}

fn make_resolver(path: &Path, db_root: Option<&Path>) -> CodeResolver {
    match db_root {
        Some(root) if path.starts_with(root) => {
            contained_resolver(guess_container_name(path, root))
        }
        _ => no_resolver(),
    }
}

/// Extracts `@SYM_EXEC_EXTRACTOR_BEGIN`/`_END` block bodies from `reader`,
/// one `String` per block. Never fails: an unreadable line is simply not
/// produced, matching the "a stuck file is bounded, not fatal" policy.
fn extract_blocks(reader: impl BufRead) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.starts_with(SIG_BEGIN) {
            current = Some(String::new());
        } else if let Some(body) = current.as_mut() {
            if line.starts_with(SIG_END) {
                blocks.push(std::mem::take(body));
                current = None;
            } else {
                body.push_str(&line);
                body.push('\n');
            }
        }
    }
    blocks
}

/// Parses one input file into its execution trees. XML parse errors abort
/// only this file (an empty iterator); an oversized body is skipped with a
/// warning. `db_root`, when given, enables resolving `CODE` payloads to
/// `container:logical:line` via the distilled spec's filename heuristic.
pub fn parse_file(
    path: &Path,
    parse_constraints: bool,
    db_root: Option<&Path>,
) -> Result<Vec<ExecTree>, TraceError> {
    let reader = open_transparent(path).map_err(|source| TraceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let resolver = make_resolver(path, db_root);

    let mut trees = Vec::new();
    for body in extract_blocks(reader) {
        if body.len() > ONE_GB {
            warn!(path = %path.display(), "trace body exceeds 1 GB cap, skipping block");
            continue;
        }
        let dom = match parse_xml_fragment(&body) {
            Ok(dom) => dom,
            Err(source) => {
                info!(path = %path.display(), error = %source, "malformed XML, skipping file");
                return Ok(Vec::new());
            }
        };
        let mut tree_xmls = Vec::new();
        for child in &dom.children {
            if child.tag == "ROOT" {
                tree_xmls.extend(child.children.iter());
            } else {
                tree_xmls.push(child);
            }
        }
        for tree_xml in tree_xmls {
            match tree::build_exec_node(tree_xml, &resolver, parse_constraints) {
                Ok(root) => trees.push(ExecTree { root }),
                Err(message) => {
                    // An unknown event kind is fatal for this tree only
                    // (SPEC_FULL.md §7 item 5); other trees in this file
                    // and other files are unaffected.
                    tracing::error!(path = %path.display(), %message, "unknown event kind");
                }
            }
        }
    }
    Ok(trees)
}

/// Recursively walks `dir`, returning every file with a supported
/// extension (plain or compressed).
pub fn walk_supported_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk_into(dir, &mut out);
    out
}

fn walk_into(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_into(&path, out);
        } else if is_supported_file(&path) {
            out.push(path);
        }
    }
}

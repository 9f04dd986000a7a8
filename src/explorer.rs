//! Schedules per-file work across a `rayon` pool and merges the resulting
//! per-file `Context`s (SPEC_FULL.md §4.9, §5), grounded on the teacher's
//! rayon `par_iter` + per-item isolated-result pattern.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::checker::Checker;
use crate::context::{BugReport, Context};
use crate::trace;

pub struct Explorer<'a> {
    checker: &'a dyn Checker,
    skip_cache: bool,
}

impl<'a> Explorer<'a> {
    pub fn new(checker: &'a dyn Checker, skip_cache: bool) -> Self {
        Self {
            checker,
            skip_cache,
        }
    }

    /// Processes every supported file under `dir` sequentially. `dir` also
    /// serves as the resolver's db root, so reported `code` sites are
    /// container-resolved the same way `explore_parallel` resolves them.
    pub fn explore(&self, dir: &Path) -> Vec<BugReport> {
        let files = trace::walk_supported_files(dir);
        let contexts: Vec<Context> = files
            .iter()
            .map(|f| self.context_for_file(f, dir))
            .collect();
        self.merge(contexts)
    }

    /// Same as `explore`, but distributes files across a `rayon` thread
    /// pool. Each worker owns its file exclusively and returns a
    /// serializable `Context`; no `ExecTree`/`ConstraintMgr` crosses the
    /// pool boundary by reference (SPEC_FULL.md §5).
    pub fn explore_parallel(&self, dir: &Path) -> Vec<BugReport> {
        let files = trace::walk_supported_files(dir);
        let contexts: Vec<Context> = files
            .par_iter()
            .map(|f| self.context_for_file(f, dir))
            .collect();
        self.merge(contexts)
    }

    /// Primes the on-disk cache for a single file without producing a
    /// report. `db_root` is the containing database directory the resolver
    /// treats `path` as relative to.
    pub fn explore_single_file(&self, path: &Path, db_root: &Path) {
        let _ = self.context_for_file(path, db_root);
    }

    fn merge(&self, contexts: Vec<Context>) -> Vec<BugReport> {
        if contexts.is_empty() {
            return Vec::new();
        }
        self.checker.merge(contexts)
    }

    fn context_for_file(&self, path: &Path, db_root: &Path) -> Context {
        let cache_path = cache_path_for(path, self.checker.name());

        if !self.skip_cache {
            if let Some(context) = read_cache(&cache_path) {
                return context;
            }
        }

        let trees = match trace::parse_file(path, self.checker.parse_constraints(), Some(db_root)) {
            Ok(trees) => trees,
            Err(error) => {
                info!(path = %path.display(), %error, "skipping file");
                Vec::new()
            }
        };

        let mut context = Context::new();
        for tree in &trees {
            context.merge(&self.checker.process(tree));
        }

        if !self.skip_cache {
            write_cache(&cache_path, &context);
        }

        context
    }
}

fn cache_path_for(input: &Path, checker_name: &str) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(checker_name);
    PathBuf::from(name)
}

/// Opportunistic cache read: any failure at all falls through to
/// recomputation (SPEC_FULL.md §4.9).
fn read_cache(path: &Path) -> Option<Context> {
    let bytes = fs::read(path).ok()?;
    bincode::deserialize(&bytes).ok()
}

/// Opportunistic cache write: failures are logged, never propagated.
fn write_cache(path: &Path, context: &Context) {
    let bytes = match bincode::serialize(context) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(path = %path.display(), %error, "could not serialize cache entry");
            return;
        }
    };
    if let Err(error) = fs::write(path, bytes) {
        warn!(path = %path.display(), %error, "could not write cache entry");
    }
}

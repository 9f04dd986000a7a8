//! The `Context` aggregator and `BugReport` (SPEC_FULL.md §3, §4.8).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::store::{Store1, Store2};

/// One scored, deviating call site.
#[derive(Clone, Debug)]
pub struct BugReport {
    pub score: f64,
    pub code: String,
    pub key: String,
    pub ctx: String,
    pub references: Option<BTreeSet<String>>,
}

impl BugReport {
    pub fn new(score: f64, code: String, key: String, ctx: String) -> Self {
        Self {
            score,
            code,
            key,
            ctx,
            references: None,
        }
    }

    pub fn with_references(mut self, references: BTreeSet<String>) -> Self {
        self.references = Some(references);
        self
    }

    /// Renders up to `size` references as `{a, b, c}`, without mutating the
    /// underlying set. The distilled spec's equivalent method pops from the
    /// set as a side effect when there is exactly one reference left; this
    /// implementation only ever reads (SPEC_FULL.md §9, Open Questions).
    pub fn render_references(&self, size: usize) -> String {
        let Some(references) = &self.references else {
            return String::new();
        };
        let shown: Vec<&String> = references.iter().take(size).collect();
        format!(
            "{{{}}}",
            shown
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Per-checker aggregator: every call site an API was used at
/// (`total_uses`), and every call site observed under a given context
/// (`ctx_uses`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Context {
    total_uses: Store1<String, String>,
    ctx_uses: Store2<String, String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call-site observation. `value` is `None` when no
    /// context could be determined for this site; it's still counted in
    /// `total_uses`, but does not contribute a context bucket.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        value: Option<impl Into<String>>,
        code: impl Into<String>,
    ) {
        let key = key.into();
        let code = code.into();
        if let Some(value) = value {
            self.ctx_uses
                .insert(key.clone(), value.into(), code.clone());
        }
        self.total_uses.insert(key, code);
    }

    pub fn merge(&mut self, other: &Self) {
        self.total_uses.merge(&other.total_uses);
        self.ctx_uses.merge(&other.ctx_uses);
    }

    /// Merges a list of per-file `Context`s into one, associatively and
    /// commutatively (Store merge is set union at the leaves).
    pub fn merge_all(contexts: Vec<Self>) -> Option<Self> {
        let mut iter = contexts.into_iter();
        let mut acc = iter.next()?;
        for other in iter {
            acc.merge(&other);
        }
        Some(acc)
    }

    /// The `MissingCheck` scoring rule (SPEC_FULL.md §4.8): every context
    /// value scoring in `[threshold, 1)` reports the non-conforming sites,
    /// deduplicated within this call.
    pub fn get_bugs(&self, threshold: f64) -> Vec<BugReport> {
        let mut added = BTreeSet::new();
        let mut bugs = Vec::new();
        for (key, value_to_codes) in self.ctx_uses.iter() {
            let total = self.total_uses.get(key);
            for (ctx, codes) in value_to_codes.iter() {
                let score = codes.len() as f64 / total.len() as f64;
                if score >= threshold && score != 1.0 {
                    let diff: BTreeSet<String> = total.difference(codes).cloned().collect();
                    for bug in diff {
                        if added.insert(bug.clone()) {
                            bugs.push(BugReport::new(score, bug, key.clone(), ctx.clone()));
                        }
                    }
                }
            }
        }
        bugs
    }

    /// The `ThreadSafety` scoring rule: only truthy contexts (`"true"`)
    /// enter scoring, so "unlocked-only" APIs don't produce mirror reports
    /// (SPEC_FULL.md §4.8, §9 Open Questions).
    pub fn get_bugs_thread_safety(&self, threshold: f64) -> Vec<BugReport> {
        let mut bugs = Vec::new();
        for (key, value_to_codes) in self.ctx_uses.iter() {
            let total = self.total_uses.get(key);
            let mut diff = total.clone();
            let mut scores = std::collections::BTreeMap::new();
            let mut winning_ctx = String::new();

            for (ctx, codes) in value_to_codes.iter() {
                if ctx != "true" {
                    continue;
                }
                let score = codes.len() as f64 / total.len() as f64;
                if score >= threshold && score != 1.0 {
                    diff = diff.difference(codes).cloned().collect();
                    winning_ctx = ctx.clone();
                    for bug in &diff {
                        scores.insert(bug.clone(), score);
                    }
                }
            }

            if diff.len() != total.len() {
                let mut added = BTreeSet::new();
                for bug in &diff {
                    if added.insert(bug.clone()) {
                        bugs.push(BugReport::new(
                            scores[bug],
                            bug.clone(),
                            key.clone(),
                            winning_ctx.clone(),
                        ));
                    }
                }
            }
        }
        bugs
    }
}

pub fn rank(mut reports: Vec<BugReport>) -> Vec<BugReport> {
    reports.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    reports
}

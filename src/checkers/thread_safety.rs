//! Detects calls usually made under a held mutex, at a site where none is
//! held (SPEC_FULL.md §4.7, grounded on `thread.py`'s
//! `ThreadSafetyChecker`/`ThreadSafetyContext`).

use crate::checker::Checker;
use crate::context::{BugReport, Context};
use crate::tree::{match_call, CallType, ExecTree};

pub struct ThreadSafety {
    pub threshold: f64,
}

impl ThreadSafety {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Checker for ThreadSafety {
    fn name(&self) -> &'static str {
        "thread_safety"
    }

    fn parse_constraints(&self) -> bool {
        false
    }

    fn process(&self, tree: &ExecTree) -> Context {
        let mut context = Context::new();
        for path in tree.paths() {
            let mut mutex_held = false;
            for node in &path {
                let Some(call_type) = match_call(node) else {
                    continue;
                };
                match call_type {
                    CallType::Lock => mutex_held = true,
                    CallType::Unlock => mutex_held = false,
                    CallType::Other => {
                        let Some(call_name) = node.event.call_name() else {
                            continue;
                        };
                        let Some(code) = node.event.code() else {
                            continue;
                        };
                        context.add(call_name, Some(mutex_held.to_string()), code);
                    }
                }
            }
        }
        context
    }

    fn merge(&self, contexts: Vec<Context>) -> Vec<BugReport> {
        let Some(merged) = Context::merge_all(contexts) else {
            return Vec::new();
        };
        crate::context::rank(merged.get_bugs_thread_safety(self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_exec_node, no_resolver};
    use crate::xmlnode::parse_xml_fragment;

    fn tree_from(xml: &str) -> ExecTree {
        let dom = parse_xml_fragment(xml).unwrap();
        ExecTree {
            root: build_exec_node(&dom.children[0].children[0], &no_resolver(), false).unwrap(),
        }
    }

    #[test]
    fn records_lock_state_at_each_call_site() {
        let checker = ThreadSafety::new(0.5);
        let xml = r#"<ROOT><NODE>
            <EVENT><KIND>@LOG_CALL</KIND><CALL>pthread_mutex_lock(m)</CALL><CODE>a.c:a.c:1</CODE></EVENT>
            <NODE>
                <EVENT><KIND>@LOG_CALL</KIND><CALL>shared_write(x)</CALL><CODE>a.c:a.c:2</CODE></EVENT>
                <NODE><EVENT><KIND>@LOG_EOP</KIND></EVENT></NODE>
            </NODE>
        </NODE></ROOT>"#;
        let ctx = checker.process(&tree_from(xml));
        let bugs = ctx.get_bugs_thread_safety(0.5);
        assert!(
            bugs.is_empty(),
            "single conforming locked site alone scores 1.0"
        );
    }

    #[test]
    fn unlocked_call_among_mostly_locked_ones_is_flagged() {
        let checker = ThreadSafety::new(0.8);
        let mut context = Context::new();
        for i in 0..9 {
            context.add(
                "shared_write",
                Some("true".to_string()),
                format!("a.c:a.c:{i}"),
            );
        }
        context.add("shared_write", Some("false".to_string()), "a.c:a.c:9");
        let bugs = checker.merge(vec![context]);
        assert_eq!(bugs.len(), 1);
        assert_eq!(bugs[0].code, "a.c:a.c:9");
    }
}

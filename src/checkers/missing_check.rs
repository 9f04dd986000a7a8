//! Detects calls whose return value usually feeds a check that a given
//! call site skips (SPEC_FULL.md §4.6).

use crate::checker::Checker;
use crate::context::{BugReport, Context};
use crate::render::encode_intervals;
use crate::tree::ExecTree;

pub struct MissingCheck {
    pub threshold: f64,
}

impl MissingCheck {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Checker for MissingCheck {
    fn name(&self) -> &'static str {
        "missing_check"
    }

    fn process(&self, tree: &ExecTree) -> Context {
        let mut context = Context::new();
        for path in tree.paths() {
            let leaf_cmgr = &path.last().expect("path always has at least a root").cmgr;

            for (i, node) in path.iter().enumerate() {
                let Some(call_name) = (node.event.is_call())
                    .then(|| node.event.call_name())
                    .flatten()
                else {
                    continue;
                };
                let Some(code) = node.event.code() else {
                    continue;
                };

                let bound_symbol = path[i + 1..]
                    .iter()
                    .find(|n| n.event.is_return())
                    .and_then(|n| n.event.bound_symbol());

                let ctx_value =
                    bound_symbol.and_then(|symbol| leaf_cmgr.get(&symbol).map(encode_intervals));

                context.add(call_name, ctx_value, code);
            }
        }
        context
    }

    fn merge(&self, contexts: Vec<Context>) -> Vec<BugReport> {
        let Some(merged) = Context::merge_all(contexts) else {
            return Vec::new();
        };
        crate::context::rank(merged.get_bugs(self.threshold))
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
            root: build_exec_node(&dom.children[0].children[0], &no_resolver(), true).unwrap(),
        }
    }

    #[test]
    fn records_constrained_and_unconstrained_call_sites() {
        let checker = MissingCheck::new(0.8);
        let xml = r#"<ROOT><NODE>
            <EVENT><KIND>@LOG_CALL</KIND><CALL>foo(x)</CALL><CODE>a.c:a.c:1</CODE></EVENT>
            <NODE>
                <EVENT><KIND>@LOG_RETURN</KIND><RETURN>ret1 = foo(x)</RETURN><CODE>a.c:a.c:1</CODE></EVENT>
                <NODE>
                    <EVENT><KIND>@LOG_ASSUME</KIND><COND>ret1 == 0</COND></EVENT>
                    <NODE><EVENT><KIND>@LOG_EOP</KIND></EVENT></NODE>
                </NODE>
            </NODE>
        </NODE></ROOT>"#;
        let ctx = checker.process(&tree_from(xml));
        let bugs = ctx.get_bugs(0.5);
        assert!(bugs.is_empty(), "single conforming site alone scores 1.0");
    }
}

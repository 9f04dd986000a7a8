//! Execution trees: XML-derived node/tree types, the copy-on-write
//! `ConstraintMgr`, and the bounded-memory path iterator (SPEC_FULL.md
//! §3, §4.3, §4.4).

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::event::{Event, LazySymbol};
use crate::symbol::{Interval, SymbolKind};
use crate::xmlnode::XmlNode;

/// A shared, immutable view of "which symbols are constrained, and how"
/// along the path from the tree's root to a given node. Structural sharing:
/// a child only clones the map when it introduces a binding its ancestors
/// didn't already have (first-Assume-wins, SPEC_FULL.md §4.3).
#[derive(Clone, Debug)]
pub struct ConstraintMgr(Rc<BTreeMap<String, Vec<Interval>>>);

impl ConstraintMgr {
    pub fn empty() -> Self {
        Self(Rc::new(BTreeMap::new()))
    }

    pub fn get(&self, symbol: &str) -> Option<&[Interval]> {
        self.0.get(symbol).map(|v| v.as_slice())
    }

    fn with_binding(&self, symbol: String, intervals: Vec<Interval>) -> Self {
        if self.0.contains_key(&symbol) {
            return self.clone();
        }
        let mut map = (*self.0).clone();
        map.insert(symbol, intervals);
        Self(Rc::new(map))
    }

    /// Computes the effective `ConstraintMgr` a child inherits, given its
    /// parent's map and the parent node's event.
    fn child_of(&self, parent_event: &Event) -> Self {
        if let Event::Assume { .. } = parent_event {
            if let Some(cond) = parent_event.cond() {
                if cond.kind() == SymbolKind::Constraint {
                    if let (Some(symbol), Some(intervals)) = (cond.symbol(), cond.constraints()) {
                        return self.with_binding(symbol.to_string(), intervals.to_vec());
                    }
                }
            }
        }
        self.clone()
    }
}

impl Default for ConstraintMgr {
    fn default() -> Self {
        Self::empty()
    }
}

pub struct ExecNode {
    pub event: Event,
    pub children: Vec<ExecNode>,
    pub cmgr: ConstraintMgr,
}

pub struct ExecTree {
    pub root: ExecNode,
}

impl ExecTree {
    /// Yields the lazy, restartable sequence of root-to-leaf paths.
    pub fn paths(&self) -> PathIter<'_> {
        PathIter::new(&self.root)
    }
}

/// Explicit-stack DFS holding `(node, child_cursor)` at each level; emits a
/// path whenever the top node's event is `EOP`. Mirrors the distilled
/// spec's `ExecTree.__iter__` / `Checker._do_dfs` exactly (SPEC_FULL.md
/// §4.4).
pub struct PathIter<'a> {
    nodes: Vec<&'a ExecNode>,
    cursors: Vec<usize>,
}

impl<'a> PathIter<'a> {
    fn new(root: &'a ExecNode) -> Self {
        Self {
            nodes: vec![root],
            cursors: vec![0],
        }
    }
}

impl<'a> Iterator for PathIter<'a> {
    type Item = Vec<&'a ExecNode>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = *self.nodes.last()?;
            if node.event.is_eop() {
                let path = self.nodes.clone();
                self.nodes.pop();
                self.cursors.pop();
                return Some(path);
            }
            let cursor = *self.cursors.last().unwrap();
            if cursor < node.children.len() {
                *self.cursors.last_mut().unwrap() += 1;
                self.nodes.push(&node.children[cursor]);
                self.cursors.push(0);
            } else {
                self.nodes.pop();
                self.cursors.pop();
                if self.nodes.is_empty() {
                    return None;
                }
            }
        }
    }
}

pub type CodeResolver = Rc<dyn Fn(&str) -> String>;

pub fn no_resolver() -> CodeResolver {
    Rc::new(|text: &str| text.to_string())
}

/// Prefixes a `CODE` payload with the trace's originating container file,
/// reproducing the distilled spec's `ContainedResolver`.
pub fn contained_resolver(container: impl Into<String>) -> CodeResolver {
    let container = container.into();
    Rc::new(move |text: &str| format!("{container}:{text}"))
}

fn text_of(xml: &XmlNode, tag: &str) -> Option<String> {
    xml.children.iter().find(|c| c.tag == tag)?.text.clone()
}

fn find_event_xml(node_xml: &XmlNode) -> Option<&XmlNode> {
    node_xml.children.iter().find(|c| c.tag == "EVENT")
}

/// Builds one `Event` from an `<EVENT>` element. An unrecognized `<KIND>`
/// is a fatal error for the containing tree (SPEC_FULL.md §4.3, §7 item 5).
fn parse_event(event_xml: &XmlNode, resolver: &CodeResolver) -> Result<Event, String> {
    let kind = text_of(event_xml, "KIND").ok_or_else(|| "EVENT missing KIND".to_string())?;
    let code = || {
        text_of(event_xml, "CODE")
            .map(|c| resolver(&c))
            .unwrap_or_default()
    };

    match kind.as_str() {
        "@LOG_CALL" => {
            let call_text = text_of(event_xml, "CALL").unwrap_or_default();
            Ok(Event::Call {
                call: LazySymbol::new(call_text.clone()),
                call_text,
                code: code(),
            })
        }
        "@LOG_RETURN" => {
            let call_text = text_of(event_xml, "RETURN").unwrap_or_default();
            Ok(Event::Return {
                call: LazySymbol::new(call_text.clone()),
                call_text,
                code: code(),
            })
        }
        "@LOG_LOCATION" => {
            let loc_text = text_of(event_xml, "LOC").unwrap_or_default();
            Ok(Event::Location {
                loc: LazySymbol::new(loc_text.clone()),
                loc_text,
                kind: text_of(event_xml, "TYPE").unwrap_or_default(),
                code: code(),
            })
        }
        "@LOG_EOP" => Ok(Event::Eop),
        "@LOG_ASSUME" => {
            let cond_text = text_of(event_xml, "COND").unwrap_or_default();
            Ok(Event::Assume {
                cond: LazySymbol::new(cond_text.clone()),
                cond_text,
            })
        }
        other => Err(format!("unknown event kind {other:?}")),
    }
}

struct BuildFrame<'a> {
    event: Event,
    cmgr: ConstraintMgr,
    child_xmls: Vec<&'a XmlNode>,
    child_idx: usize,
    built_children: Vec<ExecNode>,
}

/// Builds an `ExecNode` tree from a `<NODE>` XML element, iteratively (an
/// explicit stack stands in for recursion so a pathologically deep trace
/// doesn't blow the native stack, SPEC_FULL.md §4.3).
pub fn build_exec_node(
    root_xml: &XmlNode,
    resolver: &CodeResolver,
    parse_constraints: bool,
) -> Result<ExecNode, String> {
    let root_event = parse_event(
        find_event_xml(root_xml).ok_or_else(|| "NODE missing EVENT".to_string())?,
        resolver,
    )?;
    let mut stack = vec![BuildFrame {
        event: root_event,
        cmgr: ConstraintMgr::empty(),
        child_xmls: root_xml
            .children
            .iter()
            .filter(|c| c.tag == "NODE")
            .collect(),
        child_idx: 0,
        built_children: Vec::new(),
    }];

    loop {
        let top = stack.last_mut().unwrap();
        if top.child_idx < top.child_xmls.len() {
            let child_xml = top.child_xmls[top.child_idx];
            top.child_idx += 1;
            let child_cmgr = if parse_constraints {
                top.cmgr.child_of(&top.event)
            } else {
                ConstraintMgr::empty()
            };
            let child_event = parse_event(
                find_event_xml(child_xml).ok_or_else(|| "NODE missing EVENT".to_string())?,
                resolver,
            )?;
            stack.push(BuildFrame {
                event: child_event,
                cmgr: child_cmgr,
                child_xmls: child_xml
                    .children
                    .iter()
                    .filter(|c| c.tag == "NODE")
                    .collect(),
                child_idx: 0,
                built_children: Vec::new(),
            });
        } else {
            let frame = stack.pop().unwrap();
            let node = ExecNode {
                event: frame.event,
                children: frame.built_children,
                cmgr: frame.cmgr,
            };
            match stack.last_mut() {
                Some(parent) => parent.built_children.push(node),
                None => return Ok(node),
            }
        }
    }
}

pub fn is_call(node: &ExecNode) -> bool {
    node.event.is_call() && node.event.call_name().is_some()
}

pub fn is_return(node: &ExecNode) -> bool {
    node.event.is_return() && node.event.call_name().is_some()
}

pub fn is_lock(node: &ExecNode) -> bool {
    is_call(node)
        && node
            .event
            .call_name()
            .is_some_and(|name| name.starts_with("pthread_mutex_lock"))
}

pub fn is_unlock(node: &ExecNode) -> bool {
    is_call(node)
        && node
            .event
            .call_name()
            .is_some_and(|name| name.starts_with("pthread_mutex_unlock"))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallType {
    Lock,
    Unlock,
    Other,
}

pub fn match_call(node: &ExecNode) -> Option<CallType> {
    if !is_call(node) {
        return None;
    }
    Some(if is_lock(node) {
        CallType::Lock
    } else if is_unlock(node) {
        CallType::Unlock
    } else {
        CallType::Other
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlnode::parse_xml_fragment;

    fn build_tree(xml: &str, parse_constraints: bool) -> ExecTree {
        let dom = parse_xml_fragment(xml).unwrap();
        let tree_xml = &dom.children[0].children[0];
        ExecTree {
            root: build_exec_node(tree_xml, &no_resolver(), parse_constraints).unwrap(),
        }
    }

    fn linear_trace() -> &'static str {
        r#"<ROOT><NODE>
            <EVENT><KIND>@LOG_CALL</KIND><CALL>foo(x)</CALL><CODE>a.c:a.c:10</CODE></EVENT>
            <NODE>
                <EVENT><KIND>@LOG_RETURN</KIND><RETURN>ret1 = foo(x)</RETURN><CODE>a.c:a.c:10</CODE></EVENT>
                <NODE>
                    <EVENT><KIND>@LOG_ASSUME</KIND><COND>ret1 == 0</COND></EVENT>
                    <NODE><EVENT><KIND>@LOG_EOP</KIND></EVENT></NODE>
                </NODE>
            </NODE>
        </NODE></ROOT>"#
    }

    #[test]
    fn single_path_ends_in_eop() {
        let tree = build_tree(linear_trace(), true);
        let paths: Vec<_> = tree.paths().collect();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].last().unwrap().event.is_eop());
        assert_eq!(paths[0].len(), 4);
    }

    #[test]
    fn constraint_propagates_to_leaf() {
        let tree = build_tree(linear_trace(), true);
        let path = tree.paths().next().unwrap();
        let leaf = path.last().unwrap();
        assert_eq!(leaf.cmgr.get("ret1"), Some(&[(0i128, 0i128)][..]));
    }

    #[test]
    fn branching_tree_yields_two_paths() {
        let xml = r#"<ROOT><NODE>
            <EVENT><KIND>@LOG_CALL</KIND><CALL>foo(x)</CALL><CODE>a.c:a.c:1</CODE></EVENT>
            <NODE><EVENT><KIND>@LOG_EOP</KIND></EVENT></NODE>
            <NODE><EVENT><KIND>@LOG_EOP</KIND></EVENT></NODE>
        </NODE></ROOT>"#;
        let tree = build_tree(xml, true);
        assert_eq!(tree.paths().count(), 2);
    }

    #[test]
    fn first_assume_wins_over_later_assume() {
        let xml = r#"<ROOT><NODE>
            <EVENT><KIND>@LOG_ASSUME</KIND><COND>x == 1</COND></EVENT>
            <NODE>
                <EVENT><KIND>@LOG_ASSUME</KIND><COND>x == 2</COND></EVENT>
                <NODE><EVENT><KIND>@LOG_EOP</KIND></EVENT></NODE>
            </NODE>
        </NODE></ROOT>"#;
        let tree = build_tree(xml, true);
        let path = tree.paths().next().unwrap();
        let leaf = path.last().unwrap();
        assert_eq!(leaf.cmgr.get("x"), Some(&[(1i128, 1i128)][..]));
    }

    #[test]
    fn unknown_event_kind_is_fatal_for_the_tree() {
        let xml = r#"<ROOT><NODE><EVENT><KIND>@LOG_BOGUS</KIND></EVENT></NODE></ROOT>"#;
        let dom = parse_xml_fragment(xml).unwrap();
        let result = build_exec_node(&dom.children[0].children[0], &no_resolver(), true);
        assert!(result.is_err());
    }

    #[test]
    fn lock_unlock_prefix_matching() {
        let locked = ExecNode {
            event: Event::Call {
                call_text: "pthread_mutex_lock_np(m)".to_string(),
                call: LazySymbol::new("pthread_mutex_lock_np(m)"),
                code: "a.c:a.c:1".to_string(),
            },
            children: Vec::new(),
            cmgr: ConstraintMgr::empty(),
        };
        assert!(is_lock(&locked));
        assert!(!is_unlock(&locked));
    }
}

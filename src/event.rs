//! Tagged event variants, immutable after construction (SPEC_FULL.md §3).
//!
//! Each event's symbol payload is parsed lazily: the raw text is kept until
//! first access, at which point it is parsed once, cached, and the text
//! copy used for that parse is dropped. `call_text`/`cond_text` proper stay
//! on the event for as long as the event lives, since `call_name()` needs
//! them and is cheap to recompute without a full symbolic parse.

use std::cell::RefCell;

use once_cell::unsync::OnceCell;

use crate::symbol::{self, Symbol};

/// A one-shot memoizing cell: holds raw text until `get()` is first called,
/// then parses, caches, and drops the text (SPEC_FULL.md §4.2, §9).
#[derive(Debug)]
pub struct LazySymbol {
    text: RefCell<Option<String>>,
    parsed: OnceCell<Symbol>,
}

impl LazySymbol {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RefCell::new(Some(text.into())),
            parsed: OnceCell::new(),
        }
    }

    pub fn get(&self) -> &Symbol {
        self.parsed.get_or_init(|| {
            let text = self.text.borrow_mut().take().unwrap_or_default();
            symbol::parse(&text)
        })
    }
}

impl Clone for LazySymbol {
    fn clone(&self) -> Self {
        match self.parsed.get() {
            Some(sym) => Self {
                text: RefCell::new(None),
                parsed: OnceCell::with_value(sym.clone()),
            },
            None => Self {
                text: RefCell::new(self.text.borrow().clone()),
                parsed: OnceCell::new(),
            },
        }
    }
}

/// Returns the portion of call/return text before the first `(`, or `None`
/// if the text has no call shape at all.
pub fn call_name(text: &str) -> Option<String> {
    let (name, rest) = text.split_once('(')?;
    let _ = rest;
    Some(name.to_string())
}

#[derive(Clone, Debug)]
pub enum Event {
    Call {
        call_text: String,
        call: LazySymbol,
        code: String,
    },
    Return {
        call_text: String,
        call: LazySymbol,
        code: String,
    },
    Location {
        loc_text: String,
        loc: LazySymbol,
        kind: String,
        code: String,
    },
    Assume {
        cond_text: String,
        cond: LazySymbol,
    },
    Eop,
}

impl Event {
    pub fn is_eop(&self) -> bool {
        matches!(self, Event::Eop)
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Event::Call { .. })
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Event::Return { .. })
    }

    pub fn call_name(&self) -> Option<String> {
        match self {
            Event::Call { call_text, .. } | Event::Return { call_text, .. } => call_name(call_text),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Event::Call { code, .. }
            | Event::Return { code, .. }
            | Event::Location { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn cond(&self) -> Option<&Symbol> {
        match self {
            Event::Assume { cond, .. } => Some(cond.get()),
            _ => None,
        }
    }

    /// The symbolic name a `Return` event binds the call's result to, read
    /// off the leading `name =` of its text (e.g. `"ret1 = foo(x)"`). Traces
    /// whose return text doesn't carry an assignment yield `None`.
    pub fn bound_symbol(&self) -> Option<String> {
        match self {
            Event::Return { call_text, .. } => {
                let (lhs, _) = call_text.split_once('=')?;
                let lhs = lhs.trim();
                if lhs.is_empty() || lhs.contains('(') {
                    return None;
                }
                Some(lhs.to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_name_splits_at_paren() {
        assert_eq!(call_name("foo(x, y)"), Some("foo".to_string()));
        assert_eq!(call_name("not_a_call"), None);
    }

    #[test]
    fn lazy_symbol_memoizes_and_frees_text() {
        let lazy = LazySymbol::new("foo(x)");
        let first = lazy.get();
        assert!(matches!(first, Symbol::Call(..)));
        assert!(lazy.text.borrow().is_none());
        // second access reuses the cached value
        assert_eq!(lazy.get(), first);
    }

    #[test]
    fn bound_symbol_reads_assignment_lhs() {
        let ret = Event::Return {
            call_text: "ret1 = foo(x)".to_string(),
            call: LazySymbol::new("ret1 = foo(x)"),
            code: "a.c:a.c:1".to_string(),
        };
        assert_eq!(ret.bound_symbol(), Some("ret1".to_string()));
    }

    #[test]
    fn bound_symbol_is_none_without_assignment() {
        let ret = Event::Return {
            call_text: "foo(x)".to_string(),
            call: LazySymbol::new("foo(x)"),
            code: "a.c:a.c:1".to_string(),
        };
        assert_eq!(ret.bound_symbol(), None);
    }
}

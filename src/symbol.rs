//! A small recursive-descent parser over the symbolic-expression grammar
//! event payloads are written in (SPEC_FULL.md §6). Parse failures never
//! propagate: callers always get `Symbol::Unknown` back instead of a
//! `Result`, matching the "lazy, never-fails" contract of the distilled
//! Python implementation's `Event._parse_symbol`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// One interval `[lo, hi]`, inclusive on both ends.
pub type Interval = (i128, i128);

pub const INT8_MIN: i128 = i8::MIN as i128;
pub const INT8_MAX: i128 = i8::MAX as i128;
pub const UINT8_MAX: i128 = u8::MAX as i128;
pub const INT16_MIN: i128 = i16::MIN as i128;
pub const INT16_MAX: i128 = i16::MAX as i128;
pub const UINT16_MAX: i128 = u16::MAX as i128;
pub const INT32_MIN: i128 = i32::MIN as i128;
pub const INT32_MAX: i128 = i32::MAX as i128;
pub const UINT32_MAX: i128 = u32::MAX as i128;
pub const INT64_MIN: i128 = i64::MIN as i128;
pub const INT64_MAX: i128 = i64::MAX as i128;
pub const UINT64_MAX: i128 = u64::MAX as i128;

/// Named limit constants recognized both while parsing a constraint clause
/// and while humanizing one back for display.
pub const NAMED_LIMITS: &[(&str, i128)] = &[
    ("INT8_MIN", INT8_MIN),
    ("INT8_MAX", INT8_MAX),
    ("UINT8_MAX", UINT8_MAX),
    ("INT16_MIN", INT16_MIN),
    ("INT16_MAX", INT16_MAX),
    ("UINT16_MAX", UINT16_MAX),
    ("INT32_MIN", INT32_MIN),
    ("INT32_MAX", INT32_MAX),
    ("UINT32_MAX", UINT32_MAX),
    ("INT64_MIN", INT64_MIN),
    ("INT64_MAX", INT64_MAX),
    ("UINT64_MAX", UINT64_MAX),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolKind {
    Call,
    Id,
    Constraint,
    Unknown,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Symbol {
    Call(String, Vec<Symbol>),
    Id(String),
    Constraint {
        symbol: String,
        intervals: Vec<Interval>,
    },
    Unknown,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Call(..) => SymbolKind::Call,
            Symbol::Id(_) => SymbolKind::Id,
            Symbol::Constraint { .. } => SymbolKind::Constraint,
            Symbol::Unknown => SymbolKind::Unknown,
        }
    }

    /// The constrained symbol's name, if this is a `Constraint`.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Symbol::Constraint { symbol, .. } => Some(symbol),
            _ => None,
        }
    }

    pub fn constraints(&self) -> Option<&[Interval]> {
        match self {
            Symbol::Constraint { intervals, .. } => Some(intervals),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Symbol::Id(name) => write!(f, "{name}"),
            Symbol::Constraint { symbol, intervals } => {
                write!(f, "{symbol} in {intervals:?}")
            }
            Symbol::Unknown => write!(f, "<unknown>"),
        }
    }
}

static CLAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(==|!=|<=|>=|<|>)\s*(-?\d+|[A-Za-z_][A-Za-z0-9_]*)\s*(?:\.\.\s*(-?\d+|[A-Za-z_][A-Za-z0-9_]*)\s*)?$",
    )
    .unwrap()
});

static CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)\s*$").unwrap());

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

fn literal_value(text: &str) -> Option<i128> {
    if let Ok(n) = text.parse::<i128>() {
        return Some(n);
    }
    NAMED_LIMITS
        .iter()
        .find(|(name, _)| *name == text)
        .map(|(_, value)| *value)
}

/// Parses one `sym OP literal` or `sym == lo..hi` clause into its interval
/// form. Comparisons default to INT32 bounds on the open side, since the
/// trace format does not otherwise communicate the operand width.
fn parse_clause(text: &str) -> Option<(String, Interval)> {
    let caps = CLAUSE_RE.captures(text.trim())?;
    let symbol = caps.get(1)?.as_str().to_string();
    let op = caps.get(2)?.as_str();
    let lhs = literal_value(caps.get(3)?.as_str())?;

    if let Some(rhs_match) = caps.get(4) {
        let rhs = literal_value(rhs_match.as_str())?;
        if op != "==" {
            return None;
        }
        return Some((symbol, (lhs, rhs)));
    }

    let interval = match op {
        "==" => (lhs, lhs),
        "<" => (INT32_MIN, lhs - 1),
        "<=" => (INT32_MIN, lhs),
        ">" => (lhs + 1, INT32_MAX),
        ">=" => (lhs, INT32_MAX),
        "!=" => return None, // handled by caller as a two-interval split
        _ => return None,
    };
    Some((symbol, interval))
}

fn parse_ne_clause(text: &str) -> Option<(String, Vec<Interval>)> {
    let re = Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*!=\s*(-?\d+|[A-Za-z_][A-Za-z0-9_]*)\s*$")
        .unwrap();
    let caps = re.captures(text.trim())?;
    let symbol = caps.get(1)?.as_str().to_string();
    let n = literal_value(caps.get(2)?.as_str())?;
    Some((symbol, vec![(INT32_MIN, n - 1), (n + 1, INT32_MAX)]))
}

/// Parses a constraint expression of one or more `||`-separated clauses,
/// all constraining the same symbol (SPEC_FULL.md §6).
fn parse_constraint(text: &str) -> Option<Symbol> {
    let mut symbol_name: Option<String> = None;
    let mut intervals = Vec::new();

    for clause in text.split("||") {
        let clause = clause.trim();
        if clause.is_empty() {
            return None;
        }
        let (sym, clause_intervals) = if let Some((sym, interval)) = parse_clause(clause) {
            (sym, vec![interval])
        } else if let Some((sym, ivs)) = parse_ne_clause(clause) {
            (sym, ivs)
        } else {
            return None;
        };
        match &symbol_name {
            None => symbol_name = Some(sym),
            Some(existing) if existing != &sym => return None,
            _ => {}
        }
        intervals.extend(clause_intervals);
    }

    intervals.sort_unstable();
    Some(Symbol::Constraint {
        symbol: symbol_name?,
        intervals,
    })
}

fn parse_call(text: &str) -> Option<Symbol> {
    let caps = CALL_RE.captures(text.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let args_text = caps.get(2)?.as_str().trim();
    if args_text.is_empty() {
        return Some(Symbol::Call(name, Vec::new()));
    }
    let args = split_args(args_text).iter().map(|arg| parse(arg)).collect();
    Some(Symbol::Call(name, args))
}

/// Splits a call's argument list on top-level commas, respecting nested
/// parens so `f(g(a, b), c)` yields `["g(a, b)", "c"]`.
fn split_args(text: &str) -> Vec<String> {
    let mut depth = 0i32;
    let mut args = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

/// Parses raw event text into a `Symbol`. Never fails: any shape that
/// doesn't match the grammar becomes `Symbol::Unknown`.
pub fn parse(text: &str) -> Symbol {
    if let Some(constraint) = parse_constraint(text) {
        return constraint;
    }
    if let Some(call) = parse_call(text) {
        return call;
    }
    if IDENT_RE.is_match(text.trim()) {
        return Symbol::Id(text.trim().to_string());
    }
    Symbol::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_identifier() {
        assert_eq!(parse("ret"), Symbol::Id("ret".to_string()));
    }

    #[test]
    fn parses_simple_call() {
        assert_eq!(
            parse("foo(x, y)"),
            Symbol::Call(
                "foo".to_string(),
                vec![Symbol::Id("x".to_string()), Symbol::Id("y".to_string())]
            )
        );
    }

    #[test]
    fn parses_nested_call_args() {
        match parse("foo(bar(x), y)") {
            Symbol::Call(name, args) => {
                assert_eq!(name, "foo");
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0], Symbol::Call(n, _) if n == "bar"));
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parses_equality_constraint() {
        let sym = parse("ret == 0");
        assert_eq!(sym.kind(), SymbolKind::Constraint);
        assert_eq!(sym.symbol(), Some("ret"));
        assert_eq!(sym.constraints(), Some(&[(0i128, 0i128)][..]));
    }

    #[test]
    fn parses_disjunction_of_clauses() {
        let sym = parse("ret == 0 || ret < 0");
        assert_eq!(sym.symbol(), Some("ret"));
        assert_eq!(sym.constraints(), Some(&[(INT32_MIN, -1), (0, 0)][..]));
    }

    #[test]
    fn disjunction_with_mismatched_symbols_is_unknown() {
        assert_eq!(parse("ret == 0 || other < 0"), Symbol::Unknown);
    }

    #[test]
    fn not_equal_splits_into_two_intervals() {
        let sym = parse("ret != 0");
        assert_eq!(
            sym.constraints(),
            Some(&[(INT32_MIN, -1), (1, INT32_MAX)][..])
        );
    }

    #[test]
    fn named_limits_resolve_by_name() {
        let sym = parse("ret == INT32_MIN..INT32_MAX");
        assert_eq!(sym.constraints(), Some(&[(INT32_MIN, INT32_MAX)][..]));
    }

    #[test]
    fn garbage_is_unknown() {
        assert_eq!(parse("@#$%"), Symbol::Unknown);
        assert_eq!(parse(""), Symbol::Unknown);
    }
}

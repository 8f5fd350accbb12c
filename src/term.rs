//! Parsed Erlang term representation.
//!
//! A dump document parses into a tree of `Term` values. The enum is closed:
//! the process-info dump format only ever produces these shapes (no floats,
//! no maps, no bignums, no refs).

use std::fmt;

/// One parsed Erlang term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Bare or single-quoted atom, e.g. `ok` or `'busy wait'`.
    Atom(String),
    /// Double-quoted string, escapes decoded.
    Str(String),
    /// Payload of a `<<"...">>` binary literal, escapes decoded.
    Binary(String),
    /// Signed decimal integer.
    Int(i64),
    Tuple(Vec<Term>),
    List(Vec<Term>),
    /// Pid or port token such as `<0.123.0>` or `#Port<0.45>`, kept verbatim
    /// and never interpreted numerically.
    OpaqueRef(String),
}

impl Term {
    /// Short variant name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Atom(_) => "atom",
            Term::Str(_) => "string",
            Term::Binary(_) => "binary",
            Term::Int(_) => "integer",
            Term::Tuple(_) => "tuple",
            Term::List(_) => "list",
            Term::OpaqueRef(_) => "pid/port",
        }
    }

    /// True when an atom spelled `text` needs no quotes.
    fn is_bare_atom(text: &str) -> bool {
        let mut chars = text.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str, quote: char) -> fmt::Result {
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            c if c == quote => write!(f, "\\{}", quote)?,
            c => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Term], open: char, close: char) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

/// Renders the term in the surface syntax it was parsed from. The output
/// parses back into a structurally equal term.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) if Term::is_bare_atom(name) => f.write_str(name),
            Term::Atom(name) => {
                write!(f, "'")?;
                write_escaped(f, name, '\'')?;
                write!(f, "'")
            }
            Term::Str(s) => {
                write!(f, "\"")?;
                write_escaped(f, s, '"')?;
                write!(f, "\"")
            }
            Term::Binary(s) => {
                write!(f, "<<\"")?;
                write_escaped(f, s, '"')?;
                write!(f, "\">>")
            }
            Term::Int(n) => write!(f, "{}", n),
            Term::Tuple(items) => write_seq(f, items, '{', '}'),
            Term::List(items) => write_seq(f, items, '[', ']'),
            Term::OpaqueRef(raw) => f.write_str(raw),
        }
    }
}

//! Backtracking parser for Erlang external term syntax.
//!
//! Dumps carry one top-level term per document, written in plain external
//! syntax: atoms, quoted atoms, strings, `<<"...">>` binaries, integers,
//! tuples, lists and raw pid/port tokens. The parser is a hand-rolled
//! recursive descent over a byte cursor with transactional rollback: every
//! alternative either consumes a whole production or leaves the cursor where
//! it found it, and only committed productions (an opening delimiter already
//! consumed) can fail fatally.

use tracing::{debug, trace};

use crate::term::Term;

/// Nesting depth accepted before a document is rejected.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Hard limits applied while parsing.
#[derive(Debug, Clone)]
pub struct ParseLimits {
    /// Maximum tuple/list nesting depth. Each level costs one stack frame
    /// chain, so this bounds recursion on hostile input.
    pub max_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Fatal syntax error: a committed production could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("expected {expected} near {excerpt:?}")]
    Expected {
        expected: &'static str,
        excerpt: String,
    },

    #[error("integer literal {literal:?} does not fit in 64 bits")]
    IntegerOverflow { literal: String },

    #[error("terms nested deeper than {max} levels")]
    TooDeep { max: usize },
}

/// Parses the single top-level term of a dump document.
///
/// Content after the first complete term is ignored; dump sections often
/// carry trailing noise. An input with no leading term at all is an error.
pub fn parse_document(input: &str, limits: &ParseLimits) -> Result<Term, GrammarError> {
    debug!(bytes = input.len(), "parsing dump document");
    let mut parser = TermParser::new(input, limits);
    match parser.parse_term()? {
        Some(term) => {
            trace!(kind = term.kind(), "parsed top-level term");
            Ok(term)
        }
        None => Err(parser.expected("a term")),
    }
}

/// Recursive-descent parser over a single in-memory document.
pub struct TermParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> TermParser<'a> {
    pub fn new(src: &'a str, limits: &ParseLimits) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
            max_depth: limits.max_depth,
        }
    }

    /// One term, any variant. Alternatives are tried in a fixed order and the
    /// first match wins; the grammar is ambiguous enough that reordering
    /// changes meaning (an integer would match inside a pid token).
    pub fn parse_term(&mut self) -> Result<Option<Term>, GrammarError> {
        self.skip_whitespace();
        if let Some(term) = self.parse_atom() {
            return Ok(Some(term));
        }
        if let Some(body) = self.parse_string()? {
            return Ok(Some(Term::Str(body)));
        }
        if let Some(term) = self.parse_tuple()? {
            return Ok(Some(term));
        }
        if let Some(term) = self.parse_list()? {
            return Ok(Some(term));
        }
        if let Some(term) = self.parse_quoted_atom()? {
            return Ok(Some(term));
        }
        if let Some(term) = self.parse_opaque_ref() {
            return Ok(Some(term));
        }
        if let Some(term) = self.parse_integer()? {
            return Ok(Some(term));
        }
        if let Some(term) = self.parse_binary()? {
            return Ok(Some(term));
        }
        Ok(None)
    }

    // ---- grammar rules ----

    /// `/[a-zA-Z_][a-zA-Z_0-9]*/`
    fn parse_atom(&mut self) -> Option<Term> {
        let first = self.peek()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let name = self.try_run(|c| c.is_ascii_alphanumeric() || c == '_')?;
        Some(Term::Atom(name.to_string()))
    }

    /// `'...'` with the same escape rules as strings.
    fn parse_quoted_atom(&mut self) -> Result<Option<Term>, GrammarError> {
        if !self.try_lit("'") {
            return Ok(None);
        }
        let name = self.string_body('\'')?;
        self.must_lit("'", "closing `'`")?;
        Ok(Some(Term::Atom(name)))
    }

    /// `"..."`. Tolerates leading whitespace so a binary can be written as
    /// `<< "payload">>`.
    fn parse_string(&mut self) -> Result<Option<String>, GrammarError> {
        self.skip_whitespace();
        if !self.try_lit("\"") {
            return Ok(None);
        }
        let body = self.string_body('"')?;
        self.must_lit("\"", "closing `\"`")?;
        Ok(Some(body))
    }

    /// `<<" ... ">>`. Once `<<` is consumed the production is committed and
    /// the quoted payload is mandatory.
    fn parse_binary(&mut self) -> Result<Option<Term>, GrammarError> {
        if !self.try_lit("<<") {
            return Ok(None);
        }
        let payload = match self.parse_string()? {
            Some(body) => body,
            None => return Err(self.expected("a quoted binary payload")),
        };
        self.must_lit(">>", "closing `>>`")?;
        Ok(Some(Term::Binary(payload)))
    }

    fn parse_tuple(&mut self) -> Result<Option<Term>, GrammarError> {
        Ok(self.parse_seq("{", "}", "closing `}`")?.map(Term::Tuple))
    }

    fn parse_list(&mut self) -> Result<Option<Term>, GrammarError> {
        Ok(self.parse_seq("[", "]", "closing `]`")?.map(Term::List))
    }

    /// `/(#Port)?<[0-9.]+>/`, kept as an uninterpreted token.
    fn parse_opaque_ref(&mut self) -> Option<Term> {
        let start = self.mark();
        self.try_lit("#Port");
        if !self.try_lit("<") {
            self.restore(start);
            return None;
        }
        if self.try_run(|c| c.is_ascii_digit() || c == '.').is_none() {
            self.restore(start);
            return None;
        }
        if !self.try_lit(">") {
            self.restore(start);
            return None;
        }
        Some(Term::OpaqueRef(self.src[start..self.pos].to_string()))
    }

    /// `/-?[0-9]+/`
    fn parse_integer(&mut self) -> Result<Option<Term>, GrammarError> {
        let start = self.mark();
        self.try_lit("-");
        if self.try_run(|c| c.is_ascii_digit()).is_none() {
            self.restore(start);
            return Ok(None);
        }
        let literal = &self.src[start..self.pos];
        match literal.parse::<i64>() {
            Ok(value) => Ok(Some(Term::Int(value))),
            Err(_) => Err(GrammarError::IntegerOverflow {
                literal: literal.to_string(),
            }),
        }
    }

    /// Delimited, comma-separated term sequence. The first element is
    /// optional (empty collections), every element after a comma is
    /// mandatory, and so is the closer once the opener matched. A trailing
    /// comma is therefore fatal, not a silent stop.
    fn parse_seq(
        &mut self,
        open: &'static str,
        close: &'static str,
        close_expected: &'static str,
    ) -> Result<Option<Vec<Term>>, GrammarError> {
        self.skip_whitespace();
        if !self.try_lit(open) {
            return Ok(None);
        }
        if self.depth >= self.max_depth {
            return Err(GrammarError::TooDeep {
                max: self.max_depth,
            });
        }
        self.depth += 1;

        let mut items = Vec::new();
        if let Some(first) = self.parse_term()? {
            items.push(first);
            loop {
                self.skip_whitespace();
                if !self.try_lit(",") {
                    break;
                }
                match self.parse_term()? {
                    Some(item) => items.push(item),
                    None => return Err(self.expected("a term")),
                }
            }
        }
        self.must_lit(close, close_expected)?;

        self.depth -= 1;
        Ok(Some(items))
    }

    /// Decodes characters up to, but not consuming, `terminator`.
    ///
    /// Escapes decode as the dumps write them: `\n` and `\r` become the
    /// control characters, `\\` a backslash, and any other escaped character
    /// stands for itself. A backslash at end of input or directly before a
    /// newline cannot be decoded and is fatal. Reaching end of input without
    /// the terminator returns what was accumulated; the caller's `must_lit`
    /// on the terminator then reports the unterminated literal.
    fn string_body(&mut self, terminator: char) -> Result<String, GrammarError> {
        let mut out = String::new();
        loop {
            if let Some(fragment) = self.try_run(|c| c != '\\' && c != terminator) {
                out.push_str(fragment);
            }
            if !self.try_lit("\\") {
                return Ok(out);
            }
            let escaped = match self.peek() {
                Some(c) if c != '\n' => c,
                _ => return Err(self.expected("an escaped character")),
            };
            self.pos += escaped.len_utf8();
            out.push(match escaped {
                'n' => '\n',
                'r' => '\r',
                c => c,
            });
        }
    }

    // ---- cursor primitives ----

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn restore(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// Next character, not consumed.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consumes `lit` if the input starts with it.
    fn try_lit(&mut self, lit: &str) -> bool {
        if self.rest().starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    /// Consumes the longest nonempty run of characters satisfying `pred`.
    fn try_run(&mut self, pred: impl Fn(char) -> bool) -> Option<&'a str> {
        let rest = self.rest();
        let end = rest.find(|c| !pred(c)).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(&rest[..end])
    }

    /// Like `try_lit` but failure is fatal.
    fn must_lit(&mut self, lit: &str, expected: &'static str) -> Result<(), GrammarError> {
        if self.try_lit(lit) {
            Ok(())
        } else {
            Err(self.expected(expected))
        }
    }

    fn expected(&self, expected: &'static str) -> GrammarError {
        GrammarError::Expected {
            expected,
            excerpt: self.excerpt(),
        }
    }

    /// Short prefix of the unconsumed input for diagnostics.
    fn excerpt(&self) -> String {
        self.rest().chars().take(17).collect()
    }

    fn skip_whitespace(&mut self) {
        let _ = self.try_run(|c| c.is_ascii_whitespace());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Term {
        parse_document(input, &ParseLimits::default()).unwrap()
    }

    fn parse_err(input: &str) -> GrammarError {
        parse_document(input, &ParseLimits::default()).unwrap_err()
    }

    fn atom(name: &str) -> Term {
        Term::Atom(name.into())
    }

    // -------------------------------------------------------------------------
    // Tests for the term alternatives
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_mixed_structure() {
        let term = parse(r#"{a,[1,2,3],'b c',<<"x\ny">>}"#);
        assert_eq!(
            term,
            Term::Tuple(vec![
                atom("a"),
                Term::List(vec![Term::Int(1), Term::Int(2), Term::Int(3)]),
                atom("b c"),
                Term::Binary("x\ny".into()),
            ])
        );
    }

    #[test]
    fn test_parse_atoms() {
        assert_eq!(parse("ok"), atom("ok"));
        assert_eq!(parse("_private9"), atom("_private9"));
        assert_eq!(parse("'quoted atom'"), atom("quoted atom"));
        assert_eq!(parse(r"'it\'s'"), atom("it's"));
    }

    #[test]
    fn test_parse_string_escapes() {
        // A literal backslash-n in the input decodes to a newline.
        assert_eq!(parse(r#""a\nb""#), Term::Str("a\nb".into()));
        assert_eq!(parse(r#""a\rb""#), Term::Str("a\rb".into()));
        assert_eq!(parse(r#""a\\b""#), Term::Str(r"a\b".into()));
        // Unknown escapes stand for the escaped character itself.
        assert_eq!(parse(r#""a\tb""#), Term::Str("atb".into()));
        assert_eq!(parse(r#""say \"hi\"""#), Term::Str("say \"hi\"".into()));
    }

    #[test]
    fn test_parse_empty_collections() {
        assert_eq!(parse("{}"), Term::Tuple(vec![]));
        assert_eq!(parse("[]"), Term::List(vec![]));
        assert_eq!(parse("{ }"), Term::Tuple(vec![]));
        assert_eq!(parse("[\n]"), Term::List(vec![]));
    }

    #[test]
    fn test_whitespace_between_elements() {
        assert_eq!(parse("{ 1 , 2 }"), parse("{1,2}"));
        assert_eq!(parse("[\n  a,\n  b\n]"), parse("[a,b]"));
    }

    #[test]
    fn test_parse_opaque_refs_verbatim() {
        assert_eq!(parse("<0.123.0>"), Term::OpaqueRef("<0.123.0>".into()));
        assert_eq!(parse("#Port<0.45>"), Term::OpaqueRef("#Port<0.45>".into()));
    }

    #[test]
    fn test_parse_integers() {
        assert_eq!(parse("0"), Term::Int(0));
        assert_eq!(parse("-42"), Term::Int(-42));
        assert_eq!(parse("9223372036854775807"), Term::Int(i64::MAX));
        assert_eq!(parse("-9223372036854775808"), Term::Int(i64::MIN));
    }

    #[test]
    fn test_parse_binary_with_leading_whitespace() {
        assert_eq!(parse(r#"<< "x">>"#), Term::Binary("x".into()));
    }

    #[test]
    fn test_nested_structure() {
        let term = parse("[{a,{b,[c]}},[[]]]");
        assert_eq!(
            term,
            Term::List(vec![
                Term::Tuple(vec![
                    atom("a"),
                    Term::Tuple(vec![atom("b"), Term::List(vec![atom("c")])]),
                ]),
                Term::List(vec![Term::List(vec![])]),
            ])
        );
    }

    #[test]
    fn test_trailing_input_is_ignored() {
        assert_eq!(parse("ok garbage after the term"), atom("ok"));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let input = r#"[{<0.1.0>,[{reductions,5}]},{<0.2.0>,[{reductions,9}]}]"#;
        assert_eq!(parse(input), parse(input));
    }

    // -------------------------------------------------------------------------
    // Tests for fatal grammar errors
    // -------------------------------------------------------------------------

    #[test]
    fn test_unterminated_tuple_is_fatal() {
        let err = parse_err("{1,2");
        assert!(matches!(
            err,
            GrammarError::Expected {
                expected: "closing `}`",
                ..
            }
        ));
    }

    #[test]
    fn test_trailing_comma_is_fatal() {
        let err = parse_err("{1,}");
        assert!(matches!(
            err,
            GrammarError::Expected {
                expected: "a term",
                ..
            }
        ));
    }

    #[test]
    fn test_unterminated_string_is_fatal() {
        let err = parse_err(r#""abc"#);
        assert!(matches!(
            err,
            GrammarError::Expected {
                expected: "closing `\"`",
                ..
            }
        ));
    }

    #[test]
    fn test_escape_at_end_of_input_is_fatal() {
        let err = parse_err(r#""abc\"#);
        assert!(matches!(
            err,
            GrammarError::Expected {
                expected: "an escaped character",
                ..
            }
        ));
    }

    #[test]
    fn test_escape_before_newline_is_fatal() {
        let err = parse_err("\"abc\\\ndef\"");
        assert!(matches!(
            err,
            GrammarError::Expected {
                expected: "an escaped character",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_binary_is_fatal() {
        let err = parse_err("<<>>");
        assert!(matches!(
            err,
            GrammarError::Expected {
                expected: "a quoted binary payload",
                ..
            }
        ));
    }

    #[test]
    fn test_unclosed_binary_is_fatal() {
        let err = parse_err(r#"<<"x""#);
        assert!(matches!(
            err,
            GrammarError::Expected {
                expected: "closing `>>`",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_input_is_fatal() {
        assert!(matches!(parse_err(""), GrammarError::Expected { .. }));
        assert!(matches!(parse_err("   \n "), GrammarError::Expected { .. }));
    }

    #[test]
    fn test_error_carries_input_excerpt() {
        let err = parse_err("{1,2 what is this");
        match err {
            GrammarError::Expected { excerpt, .. } => {
                assert!(excerpt.starts_with("what is"), "excerpt: {excerpt:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_integer_overflow_is_fatal() {
        let err = parse_err("9223372036854775808");
        assert_eq!(
            err,
            GrammarError::IntegerOverflow {
                literal: "9223372036854775808".into()
            }
        );
    }

    #[test]
    fn test_depth_limit() {
        let limits = ParseLimits { max_depth: 4 };
        assert!(parse_document("[[[[]]]]", &limits).is_ok());
        assert_eq!(
            parse_document("[[[[[]]]]]", &limits).unwrap_err(),
            GrammarError::TooDeep { max: 4 }
        );
    }

    #[test]
    fn test_deeply_nested_within_default_limit() {
        let input = format!("{}{}", "[".repeat(150), "]".repeat(150));
        assert!(parse_document(&input, &ParseLimits::default()).is_ok());
    }

    // -------------------------------------------------------------------------
    // Tests for alternative ordering
    // -------------------------------------------------------------------------

    #[test]
    fn test_atom_wins_over_opaque_ref_prefix() {
        // `Port` alone is an atom; only `#Port<...>`/`<...>` are refs.
        assert_eq!(parse("Port"), atom("Port"));
    }

    #[test]
    fn test_opaque_ref_wins_over_integer() {
        // Tried before integer, so the digits stay inside the token.
        assert_eq!(parse("<0.9.0>"), Term::OpaqueRef("<0.9.0>".into()));
    }

    #[test]
    fn test_display_output_reparses_equal() {
        let inputs = [
            r#"{a,[1,2,3],'b c',<<"x\ny">>}"#,
            r#"[{<0.1.0>,[{registered_name,[]},{reductions,5}]}]"#,
            r#"{'odd atom',"str\\with\nescapes",-7}"#,
        ];
        for input in inputs {
            let term = parse(input);
            assert_eq!(parse(&term.to_string()), term, "round trip of {input}");
        }
    }
}

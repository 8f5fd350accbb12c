//! Fixed-format text report rendering.
//!
//! One block per process record, in the order the extractor produced them:
//! a summary line, the links and initial call, then the backtrace between
//! two horizontal rules. The layout is consumed by humans grepping for a
//! stuck process, nothing parses it back.

use std::borrow::Cow;
use std::fmt::Write;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::extract::ProcessRecord;
use crate::term::Term;

/// Width of the rule separating a record from its backtrace.
const RULE_WIDTH: usize = 100;

/// Longest backtrace line kept in the report.
const BACKTRACE_LINE_MAX: usize = 160;

static RULE: Lazy<String> = Lazy::new(|| "-".repeat(RULE_WIDTH));

/// Renders the report for an ordered set of records.
pub fn render_report(records: &[ProcessRecord]) -> String {
    debug!(processes = records.len(), "rendering report");
    let mut out = String::new();
    for record in records {
        render_record(&mut out, record);
    }
    out
}

fn render_record(out: &mut String, record: &ProcessRecord) {
    writeln!(
        out,
        "name: '{}' ({}), status: {}, qlen: {}, reductions: {}",
        record
            .registered_name
            .as_ref()
            .map(name_text)
            .unwrap_or_default(),
        record.pid,
        record.status,
        record.message_queue_len,
        record.reductions
    )
    .ok();
    writeln!(out, "links: {}", render_seq(&record.links, '[', ']')).ok();
    writeln!(
        out,
        "initcall: {}",
        render_seq(&record.initial_call, '{', '}')
    )
    .ok();
    writeln!(out, "{}", *RULE).ok();
    for line in backtrace_text(&record.backtrace).split('\n') {
        writeln!(out, "{}", clip_line(line)).ok();
    }
    // Trailing blank line pads consecutive records apart.
    writeln!(out, "{}\n", *RULE).ok();
}

/// The name slot shows an atom's identifier text bare; anything else is
/// rendered in its term syntax.
fn name_text(term: &Term) -> String {
    match term {
        Term::Atom(name) => name.clone(),
        other => other.to_string(),
    }
}

fn render_seq(items: &[Term], open: char, close: char) -> String {
    let mut out = String::new();
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write!(out, "{}", item).ok();
    }
    out.push(close);
    out
}

/// Backtraces are stored as strings or binaries; any other variant falls
/// back to term syntax.
fn backtrace_text(term: &Term) -> Cow<'_, str> {
    match term {
        Term::Str(text) | Term::Binary(text) => Cow::Borrowed(text.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// First `BACKTRACE_LINE_MAX` characters of a line.
fn clip_line(line: &str) -> &str {
    match line.char_indices().nth(BACKTRACE_LINE_MAX) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

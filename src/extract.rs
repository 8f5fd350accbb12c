//! Process records extracted from a parsed dump.
//!
//! The top-level term of a dump must be a list of `{Pid, PropList}` tuples,
//! one per process. Extraction folds each property list into a record,
//! checking shapes as it goes, then orders the records busiest first.

use std::collections::BTreeMap;

use tracing::debug;

use crate::term::Term;

/// A term had the wrong shape at an extraction point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("expected a list, found {found}")]
    ExpectedList { found: String },

    #[error("expected a tuple, found {found}")]
    ExpectedTuple { found: String },

    #[error("expected a {{key, value}} pair, found a tuple of {arity} elements")]
    PairArity { arity: usize },

    #[error("property key is not an atom: {found}")]
    KeyNotAtom { found: String },

    #[error("process entry has no {key:?} property")]
    MissingProperty { key: &'static str },

    #[error("reductions is not an integer: {found}")]
    ReductionsNotInteger { found: String },
}

/// Diagnostic facts for one process entry of a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: Term,
    /// `None` when the process is unregistered: the dump either omits the
    /// property or writes it as the empty list.
    pub registered_name: Option<Term>,
    pub status: Term,
    pub message_queue_len: Term,
    /// Sort key. The only property required to be numeric.
    pub reductions: i64,
    pub links: Vec<Term>,
    pub initial_call: Vec<Term>,
    pub backtrace: Term,
    /// Every property without a dedicated field, keyed by atom name.
    /// `garbage_collection` usually lands here.
    pub extra: BTreeMap<String, Term>,
}

/// Extracts every process record from a parsed dump document and orders
/// them busiest first: descending reductions, ties keep document order.
pub fn extract_processes(document: Term) -> Result<Vec<ProcessRecord>, ShapeError> {
    let entries = unpack_list(document)?;
    let mut records = entries
        .into_iter()
        .map(build_record)
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by_key(|r| std::cmp::Reverse(r.reductions));
    debug!(processes = records.len(), "extracted process records");
    Ok(records)
}

/// Unwraps a `List`, by value.
pub fn unpack_list(term: Term) -> Result<Vec<Term>, ShapeError> {
    match term {
        Term::List(items) => Ok(items),
        other => Err(ShapeError::ExpectedList {
            found: describe(&other),
        }),
    }
}

/// Unwraps a `Tuple`, by value.
pub fn unpack_tuple(term: Term) -> Result<Vec<Term>, ShapeError> {
    match term {
        Term::Tuple(items) => Ok(items),
        other => Err(ShapeError::ExpectedTuple {
            found: describe(&other),
        }),
    }
}

/// Splits a `{Key, Value}` tuple.
fn unpack_pair(term: Term) -> Result<(Term, Term), ShapeError> {
    let items = unpack_tuple(term)?;
    let arity = items.len();
    let mut items = items.into_iter();
    match (items.next(), items.next(), items.next()) {
        (Some(first), Some(second), None) => Ok((first, second)),
        _ => Err(ShapeError::PairArity { arity }),
    }
}

/// Folds a property list into a map. A repeated key silently overwrites the
/// earlier occurrence.
pub fn fold_properties(plist: Term) -> Result<BTreeMap<String, Term>, ShapeError> {
    let mut props = BTreeMap::new();
    for pair in unpack_list(plist)? {
        let (key, value) = unpack_pair(pair)?;
        match key {
            Term::Atom(name) => {
                props.insert(name, value);
            }
            other => {
                return Err(ShapeError::KeyNotAtom {
                    found: describe(&other),
                })
            }
        }
    }
    Ok(props)
}

fn take_required(
    props: &mut BTreeMap<String, Term>,
    key: &'static str,
) -> Result<Term, ShapeError> {
    props.remove(key).ok_or(ShapeError::MissingProperty { key })
}

/// Builds one record from a `{Pid, PropList}` entry. Records are all or
/// nothing: any shape violation aborts the whole extraction.
fn build_record(entry: Term) -> Result<ProcessRecord, ShapeError> {
    let (pid, plist) = unpack_pair(entry)?;
    let mut props = fold_properties(plist)?;

    let registered_name = match props.remove("registered_name") {
        Some(Term::List(items)) if items.is_empty() => None,
        Some(name) => Some(name),
        None => None,
    };

    let status = take_required(&mut props, "status")?;
    let message_queue_len = take_required(&mut props, "message_queue_len")?;
    let backtrace = take_required(&mut props, "backtrace")?;

    let reductions = match take_required(&mut props, "reductions")? {
        Term::Int(n) => n,
        other => {
            return Err(ShapeError::ReductionsNotInteger {
                found: describe(&other),
            })
        }
    };

    let links = unpack_list(take_required(&mut props, "links")?)?;
    let initial_call = unpack_tuple(take_required(&mut props, "initial_call")?)?;

    Ok(ProcessRecord {
        pid,
        registered_name,
        status,
        message_queue_len,
        reductions,
        links,
        initial_call,
        backtrace,
        extra: props,
    })
}

/// Kind plus a clipped literal of the offending term, for error messages.
fn describe(term: &Term) -> String {
    let text = term.to_string();
    let clipped: String = text.chars().take(40).collect();
    if clipped.len() < text.len() {
        format!("{} `{}...`", term.kind(), clipped)
    } else {
        format!("{} `{}`", term.kind(), clipped)
    }
}

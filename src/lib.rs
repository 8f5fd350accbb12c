//! beamscope library
//!
//! Parses Erlang process-info dumps written in external term syntax and
//! derives a triage view: one record per process, ordered by descending
//! reduction count. The library is I/O-free; the `beamscope` binary adds
//! file/stdin handling, configuration and the CLI on top of it.
//!
//! # Features
//!
//! - **Term parser**: backtracking recursive descent over the dump text,
//!   producing a [`Term`] tree (atoms, strings, binaries, integers, tuples,
//!   lists, opaque pid/port tokens)
//! - **Shape checking**: validates the `{Pid, PropList}` layout of every
//!   entry and fails fast on malformed dumps
//! - **Report rendering**: fixed-format text blocks, busiest process first
//!
//! # Usage
//!
//! ```rust
//! use beamscope::{extract_processes, parse_document, render_report, ParseLimits};
//!
//! let dump = r#"[{<0.1.0>, [{registered_name,init},
//!                           {status,waiting},
//!                           {message_queue_len,0},
//!                           {reductions,3284},
//!                           {links,[<0.2.0>]},
//!                           {initial_call,{otp_ring0,start,2}},
//!                           {backtrace,<<"Program counter: 0x0">>}]}]"#;
//!
//! let term = parse_document(dump, &ParseLimits::default())?;
//! let records = extract_processes(term)?;
//! print!("{}", render_report(&records));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod extract;
pub mod parser;
pub mod report;
pub mod term;

// Re-export main types for convenience
pub use extract::{extract_processes, ProcessRecord, ShapeError};
pub use parser::{parse_document, GrammarError, ParseLimits};
pub use report::render_report;
pub use term::Term;

//! Extended binder notation elaborator. See the README for overall documentation.
//!
//! ```text
//! USAGE:
//! eb-rs [OPTIONS] <INPUT> [OUTPUT]
//!
//! ARGS:
//!     <INPUT>     Sets the input file (.eb)
//!     <OUTPUT>    Sets the output file, or stdout if `-`. The input is only
//!                 checked if this argument is omitted
//!
//! OPTIONS:
//!     -h, --help       Print help information
//!     -v, --verbose    Print elaboration progress to stderr (repeat for more detail)
//!     -V, --version    Print version information
//! ```

// rust lints we want
#![warn(bare_trait_objects, elided_lifetimes_in_paths,
  missing_copy_implementations, missing_debug_implementations, future_incompatible,
  rust_2018_idioms, trivial_numeric_casts, variant_size_differences, unreachable_pub,
  unused, missing_docs)]
// all the clippy
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
// all the clippy::restriction lints we want
#![warn(clippy::float_arithmetic,
  clippy::get_unwrap, clippy::inline_asm_x86_att_syntax, clippy::integer_division,
  clippy::rc_buffer, clippy::rest_pat_in_fully_bound_structs,
  clippy::string_add, clippy::unwrap_used)]
// all the clippy lints we don't want
#![allow(clippy::cognitive_complexity, clippy::comparison_chain,
  clippy::default_trait_access, clippy::enum_glob_use, clippy::inline_always,
  clippy::manual_map, clippy::map_err_ignore, clippy::missing_const_for_fn,
  clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions,
  clippy::multiple_crate_versions, clippy::option_if_let_else, clippy::redundant_pub_crate,
  clippy::semicolon_if_nothing_returned, clippy::shadow_unrelated, clippy::too_many_lines,
  clippy::use_self)]

pub mod util;
pub mod lined_string;
pub mod parser;
pub mod elab;
pub mod export;
pub mod compiler;
#[cfg(test)] mod test;

pub use elab::{environment::*, print::{EnvDisplay, FormatEnv}, ElabError, Elaborator};
pub use lined_string::LinedString;
pub use parser::{ast, ErrorLevel};
pub use util::*;

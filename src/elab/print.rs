//! Environment-aware display plumbing. Most things that need printing refer
//! to interned atoms, so [`Display`] alone is not enough; [`EnvDisplay`] is
//! the same interface with a [`FormatEnv`] passed along.

use crate::elab::environment::{Environment, Term};
use crate::elab::Elaborator;
use crate::lined_string::LinedString;
use crate::util::AtomId;
use std::fmt::{self, Display};
use std::ops::Deref;

/// The context for printing environment-dependent values: the source text and
/// the environment.
#[derive(Copy, Clone)]
pub struct FormatEnv<'a> {
  /// The source text of the file being elaborated.
  pub source: &'a LinedString,
  /// The environment.
  pub env: &'a Environment,
}

/// A handle that pairs a value with a [`FormatEnv`], so that it can be used
/// with the standard formatting machinery.
pub struct Print<'a, D: ?Sized> {
  /// The format context.
  pub fe: FormatEnv<'a>,
  /// The value to print.
  pub e: &'a D,
}

impl<'a> FormatEnv<'a> {
  /// Attach this context to a value, producing a [`Display`]-able handle.
  pub fn to<D: ?Sized>(self, e: &'a D) -> Print<'a, D> { Print { fe: self, e } }
}

impl Deref for FormatEnv<'_> {
  type Target = Environment;
  fn deref(&self) -> &Environment { self.env }
}

/// [`Display`] with an environment for resolving atom names.
pub trait EnvDisplay {
  /// Print the value in the given context.
  fn fmt(&self, fe: FormatEnv<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl Elaborator {
  /// Build a [`FormatEnv`] from the elaborator state.
  #[must_use]
  pub fn format_env(&self) -> FormatEnv<'_> { FormatEnv { source: &self.ast.source, env: self } }

  /// Print a value in the context of the elaborator state.
  pub fn print<'a, D: ?Sized>(&'a self, e: &'a D) -> Print<'a, D> { self.format_env().to(e) }
}

impl<D: EnvDisplay + ?Sized> fmt::Display for Print<'_, D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.e.fmt(self.fe, f) }
}

impl EnvDisplay for AtomId {
  fn fmt(&self, fe: FormatEnv<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fe.data[*self].name.fmt(f)
  }
}

impl EnvDisplay for Term {
  fn fmt(&self, fe: FormatEnv<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fe.pretty(|p| p.term(self).render_fmt(80, f))
  }
}

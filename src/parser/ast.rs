//! Implements the `.eb` file AST components.
//!
//! An [`AST`] is the result of parsing an `.eb` file. The core of the AST is a
//! `Vec<Stmt>`, where a [`Stmt`] holds both the element's "data" as a [`StmtKind`],
//! and the element's [`Span`]. The actual [`AST`] type also contains the source
//! file and any errors encountered during parsing.

use super::ParseError;
use crate::lined_string::LinedString;
use crate::util::Span;
use std::fmt;
use std::sync::Arc;

/// User-supplied delimiter characters.
///
/// A delimiter-stmt with only one math string is parsed as `Delimiter::Both(..)`,
/// and the contents are put in the environment as both left and right delimiters.
/// delimiter-stmts with two math strings are parsed as `LeftRight(s1, s2)`.
#[derive(Clone, Debug)]
pub enum Delimiter {
  /// A delimiter command `delimiter $ ( , $;` becomes `Both(b"(,")`.
  Both(Box<[u8]>),
  /// A delimiter command `delimiter $ ( $ $ ) $;` becomes `LeftRight(b"(", b")")`.
  LeftRight(Box<[u8]>, Box<[u8]>),
}

/// A dollar-delimited formula: $ .. $.
/// `f.0` is the span of the entire formula including the delimiters, and
/// `f.inner()` is the span of the interior (excluding `$` but including any inner whitespace).
#[derive(Copy, Clone, Debug)]
pub struct Formula(pub Span);

impl Formula {
  /// Get the span of the interior of the formula.
  #[must_use]
  pub fn inner(&self) -> Span { (self.0.start + 1..self.0.end - 1).into() }
}

/// A constant literal, used in operator and binder predicate declarations.
/// `fmla` is the underlying formula, and `trim` is the span with whitespace
/// trimmed (which should contain no embedded whitespace).
#[derive(Clone, Copy, Debug)]
pub struct Const {
  /// The underlying formula.
  pub fmla: Formula,
  /// The span of the constant token itself.
  pub trim: Span,
}

/// A precedence literal, such as `prec 25;` or `prec max;`. `Max` is the
/// precedence given to religiously parenthesized expressions.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Prec {
  /// A finite precedence, an unsigned integer like `23`.
  Prec(u32),
  /// The maximum precedence, the precedence class containing atomic literals
  /// and parenthesized expressions.
  Max,
}

impl fmt::Display for Prec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Prec::Prec(p) => p.fmt(f),
      Prec::Max => "max".fmt(f),
    }
  }
}
impl fmt::Debug for Prec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

/// The precedence of application, `1024`. Tokens declared at this precedence
/// or above can appear in the head position of an application.
pub const APP_PREC: Prec = Prec::Prec(1024);

/// Distinguishes the `prefix`, `infixl` and `infixr` keywords.
#[derive(Clone, Copy, Debug)]
pub enum SimpleNotaKind {
  /// A `prefix` declaration.
  Prefix,
  /// An `infixl` or `infixr` declaration.
  Infix {
    /// True for `infixr`.
    right: bool,
  },
}

/// A notation item declared with the `prefix`, `infixl`, or `infixr` keywords,
/// such as `infixl and: $∧$ prec 35;`.
#[derive(Clone, Debug)]
pub struct SimpleNota {
  /// The initial keyword.
  pub k: SimpleNotaKind,
  /// The span of the constant name being given notation.
  pub id: Span,
  /// The constant token.
  pub c: Const,
  /// The precedence of the notation.
  pub prec: Prec,
}

/// A binder predicate declaration, such as
/// `binder_predicate gt: x $>$ y prec 50 => $ x > y $;`.
///
/// The name before the colon is optional; if it is omitted the registry entry
/// is named after the pattern token. `var` and `operand` are the two
/// metavariables of the template: `var` stands for the bound variable and
/// `operand` for the expression to the right of the token at a use site.
#[derive(Clone, Debug)]
pub struct BinderPred {
  /// The span of the registry name, if given.
  pub id: Option<Span>,
  /// The bound variable metavariable.
  pub var: Span,
  /// The pattern token.
  pub c: Const,
  /// The operand metavariable.
  pub operand: Span,
  /// The priority of this pattern.
  pub prec: Prec,
  /// The template formula, mentioning `var` and `operand`.
  pub val: Formula,
}

/// A definition `def foo: $ expr $;`, recording the elaboration of `expr`.
#[derive(Clone, Debug)]
pub struct Def {
  /// The span of the definition name.
  pub id: Span,
  /// The definition body.
  pub val: Formula,
}

/// The data portion of a statement.
#[derive(Clone, Debug)]
pub enum StmtKind {
  /// A `delimiter` statement.
  Delimiter(Delimiter),
  /// A `prefix`, `infixl` or `infixr` statement.
  SimpleNota(SimpleNota),
  /// A `binder_predicate` statement.
  BinderPred(BinderPred),
  /// A `def` statement.
  Def(Def),
  /// A `show` statement, which reports the expansion of its formula.
  Show(Formula),
}

/// The elements of a parsed AST. `StmtKind` is the "data", with `span` providing
/// information about the item's location in the source file.
#[derive(Clone, Debug)]
pub struct Stmt {
  /// The span of the statement, from the first keyword to the closing `;`.
  pub span: Span,
  /// The data of the statement.
  pub k: StmtKind,
}

/// Contains the actual AST as a sequence of [`Stmt`]s, as well as source and parse info.
#[derive(Debug)]
pub struct AST {
  /// The source text.
  pub source: Arc<LinedString>,
  /// The parsed statements.
  pub stmts: Vec<Stmt>,
  /// Any parse errors that were encountered.
  pub errors: Vec<ParseError>,
}

impl AST {
  /// Index into the source text with a span.
  #[must_use]
  pub fn span(&self, s: Span) -> &str { self.source.str_at(s) }
}

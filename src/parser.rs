//! Parser for `.eb` files: the statement level grammar.
//!
//! The parser is a standard recursive descent scanner over the source bytes.
//! Formulas `$ ... $` are stored as uninterpreted spans at this stage; they are
//! parsed by the math parser during elaboration, once the notations declared by
//! earlier statements are available. On a statement parse error, recovery skips
//! to the next `;` and continues, so a single pass reports every malformed
//! statement in the file.

pub mod ast;

use crate::lined_string::LinedString;
use crate::util::{BoxError, Span};
use annotate_snippets::snippet::AnnotationType;
use ast::{BinderPred, Const, Def, Delimiter, Formula, Prec, SimpleNota, SimpleNotaKind, Stmt, StmtKind, AST};
use num::cast::ToPrimitive;
use num::BigUint;
use std::mem;
use std::sync::Arc;

/// The severity of a diagnostic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorLevel {
  /// An informational message, such as the expansion reported by `show`.
  Info,
  /// A warning. Does not fail the compilation.
  Warning,
  /// An error. The compilation fails if any of these are reported.
  Error,
}

impl ErrorLevel {
  /// Convert this error level to the corresponding [`AnnotationType`]
  /// for snippet rendering.
  #[must_use]
  pub fn to_annotation_type(self) -> AnnotationType {
    match self {
      ErrorLevel::Info => AnnotationType::Info,
      ErrorLevel::Warning => AnnotationType::Warning,
      ErrorLevel::Error => AnnotationType::Error,
    }
  }
}

/// An error during parsing, with a position, a severity, and a message.
#[derive(Debug)]
pub struct ParseError {
  /// The location of the error.
  pub pos: Span,
  /// The severity of the error.
  pub level: ErrorLevel,
  /// The error message.
  pub msg: BoxError,
}

type Result<T> = std::result::Result<T, ParseError>;

impl ParseError {
  /// Construct a new error-level parse error.
  pub fn new(pos: impl Into<Span>, msg: BoxError) -> ParseError {
    ParseError { pos: pos.into(), level: ErrorLevel::Error, msg }
  }
}

/// Holds the state of the parser: the source bytes, the accumulated
/// (recoverable) errors, and the current byte index.
pub struct Parser<'a> {
  /// The source bytes.
  pub source: &'a [u8],
  /// The errors accumulated so far.
  pub errors: Vec<ParseError>,
  /// The current byte index.
  pub idx: usize,
}

/// Determine whether a given character is a valid identifier starting character.
#[must_use]
pub fn ident_start(c: u8) -> bool { c.is_ascii_alphabetic() || c == b'_' }

/// Determine whether a given character is a valid identifier character.
#[must_use]
pub fn ident_rest(c: u8) -> bool { ident_start(c) || c.is_ascii_digit() }

impl<'a> Parser<'a> {
  /// Get the character at the parser's index. Does not check for EOF.
  #[must_use]
  pub fn cur(&self) -> u8 { self.source[self.idx] }
  /// Get the character at the parser's index, or `None` at EOF.
  #[must_use]
  pub fn cur_opt(&self) -> Option<u8> { self.source.get(self.idx).copied() }

  /// Create a parse error at the current location.
  pub fn err(&self, msg: BoxError) -> ParseError { ParseError::new(self.idx..self.idx, msg) }

  /// Fail with a parse error at the current location.
  pub fn err_str<T>(&self, msg: &'static str) -> Result<T> { Err(self.err(msg.into())) }

  fn push_err(&mut self, r: Result<()>) { r.unwrap_or_else(|e| self.errors.push(e)) }

  /// Advance past whitespace and `--` line comments.
  pub fn ws(&mut self) {
    while self.idx < self.source.len() {
      let c = self.cur();
      if c == b' ' || c == b'\n' {
        self.idx += 1;
        continue
      }
      if c == b'-' && self.source.get(self.idx + 1) == Some(&b'-') {
        self.idx += 1;
        while self.idx < self.source.len() {
          let c = self.cur();
          self.idx += 1;
          if c == b'\n' {
            break
          }
        }
      } else {
        break
      }
    }
  }

  /// Get the string corresponding to a span in the source.
  #[must_use]
  pub fn span(&self, s: Span) -> &'a str {
    // Safety: the parser only constructs spans at character boundaries
    unsafe { std::str::from_utf8_unchecked(&self.source[s.start..s.end]) }
  }

  /// If the next character is `c`, advance past it (also consuming trailing
  /// whitespace) and return the index just after it.
  pub fn chr(&mut self, c: u8) -> Option<usize> {
    if self.cur_opt()? != c {
      return None
    }
    self.idx += 1;
    (Some(self.idx), self.ws()).0
  }

  /// Like [`chr`](Self::chr), but returns a parse error on failure.
  pub fn chr_err(&mut self, c: u8) -> Result<usize> {
    self.chr(c).ok_or_else(|| self.err(format!("expecting '{}'", c as char).into()))
  }

  /// Parse an identifier, permitting `_`.
  pub fn ident_(&mut self) -> Option<Span> {
    let c = self.cur_opt()?;
    if !ident_start(c) {
      return None
    }
    let start = self.idx;
    loop {
      self.idx += 1;
      if !self.cur_opt().map_or(false, ident_rest) {
        return (Some((start..self.idx).into()), self.ws()).0
      }
    }
  }

  /// Parse an identifier, rejecting `_`.
  pub fn ident(&mut self) -> Option<Span> {
    self.ident_().filter(|&s| self.span(s) != "_")
  }

  fn ident_err(&mut self) -> Result<Span> {
    self.ident().ok_or_else(|| self.err("expecting identifier".into()))
  }

  /// Parse a math formula `$ ... $`, returning `None` if the next character
  /// is not `$`.
  pub fn formula(&mut self) -> Result<Option<Formula>> {
    if self.cur_opt() != Some(b'$') {
      return Ok(None)
    }
    let start = self.idx;
    self.idx += 1;
    while self.idx < self.source.len() {
      let c = self.cur();
      self.idx += 1;
      if c == b'$' {
        let end = self.idx;
        self.ws();
        return Ok(Some(Formula((start..end).into())))
      }
    }
    Err(ParseError::new(start..mem::replace(&mut self.idx, start), "unclosed formula literal".into()))
  }

  fn formula_err(&mut self) -> Result<Formula> {
    self.formula()?.ok_or_else(|| self.err("expected formula".into()))
  }

  /// Parse a constant token: a formula whose interior, after trimming
  /// whitespace, contains a single whitespace-free token.
  fn cnst(&mut self) -> Result<Const> {
    let fmla = self.formula()?.ok_or_else(|| self.err("expected a constant".into()))?;
    let mut trim = fmla.inner();
    for i in trim.into_iter().rev() {
      if b" \n".contains(&self.source[i]) {
        trim.end -= 1
      } else {
        break
      }
    }
    for i in trim {
      if b" \n".contains(&self.source[i]) {
        trim.start += 1
      } else {
        break
      }
    }
    if trim.into_iter().any(|i| b" \n".contains(&self.source[i])) {
      return Err(ParseError::new(trim, "constant contains embedded whitespace".into()))
    }
    if trim.start == trim.end {
      return Err(ParseError::new(trim, "constant is empty".into()))
    }
    Ok(Const { fmla, trim })
  }

  fn number(&mut self) -> Result<(Span, BigUint)> {
    let start = self.idx;
    let mut val: BigUint = 0u8.into();
    while self.idx < self.source.len() {
      let c = self.cur();
      if !c.is_ascii_digit() {
        break
      }
      self.idx += 1;
      val = 10u8 * val + (c - b'0');
    }
    if self.idx == start {
      return self.err_str("expected a number")
    }
    (Ok(((start..self.idx).into(), val)), self.ws()).0
  }

  fn prec(&mut self) -> Result<Prec> {
    match self.cur_opt() {
      Some(c) if c.is_ascii_digit() => {
        let (span, n) = self.number()?;
        Ok(Prec::Prec(
          n.to_u32()
            .filter(|&n| n < 2048)
            .ok_or_else(|| ParseError::new(span, "precedence out of range".into()))?,
        ))
      }
      _ => {
        self
          .ident_()
          .filter(|&id| self.span(id) == "max")
          .ok_or_else(|| self.err("expected number or 'max'".into()))?;
        Ok(Prec::Max)
      }
    }
  }

  fn keyword(&mut self, k: &'static str) -> Result<()> {
    self
      .ident_()
      .filter(|&id| self.span(id) == k)
      .map(|_| ())
      .ok_or_else(|| self.err(format!("expected '{k}'").into()))
  }

  /// Parse the `=>` token (as two adjacent characters).
  fn arrow(&mut self) -> Result<()> {
    if self.cur_opt() == Some(b'=') && self.source.get(self.idx + 1) == Some(&b'>') {
      self.idx += 2;
      self.ws();
      Ok(())
    } else {
      self.err_str("expecting '=>'")
    }
  }

  /// Extract the delimiter characters from a formula: single ASCII characters
  /// separated by whitespace. Bad characters are reported as recoverable
  /// errors and skipped.
  fn delim_chars(&mut self, f: Formula) -> Box<[u8]> {
    let mut delims = Vec::new();
    let mut i = f.inner().start;
    let end = f.inner().end;
    while i < end {
      let c = self.source[i];
      if c == b' ' || c == b'\n' {
        i += 1;
        continue
      }
      let start = i;
      while i < end && !b" \n".contains(&self.source[i]) {
        i += 1
      }
      if i - start > 1 || !c.is_ascii() {
        self.push_err(Err(ParseError::new(start..i, "delimiter must be a single ASCII character".into())))
      } else {
        delims.push(c)
      }
    }
    delims.into_boxed_slice()
  }

  fn simple_nota(&mut self, k: SimpleNotaKind) -> Result<(usize, SimpleNota)> {
    let id = self.ident_err()?;
    self.chr_err(b':')?;
    let c = self.cnst()?;
    self.keyword("prec")?;
    let prec = self.prec()?;
    Ok((self.chr_err(b';')?, SimpleNota { k, id, c, prec }))
  }

  /// Parse the body of a `binder_predicate` statement:
  /// `[name:] x $tok$ y prec n => $ template $;`.
  fn binder_pred(&mut self) -> Result<(usize, BinderPred)> {
    let mut id = None;
    let mut var = self.ident_err()?;
    if self.chr(b':').is_some() {
      id = Some(var);
      var = self.ident_err()?;
    }
    let c = self.cnst()?;
    let operand = self.ident_err()?;
    self.keyword("prec")?;
    let prec = self.prec()?;
    self.arrow()?;
    let val = self.formula_err()?;
    Ok((self.chr_err(b';')?, BinderPred { id, var, c, operand, prec, val }))
  }

  fn stmt(&mut self) -> Result<Option<Stmt>> {
    let start = self.idx;
    match self.ident_() {
      None =>
        if self.idx == self.source.len() {
          Ok(None)
        } else {
          self.err_str("expected command keyword")
        },
      Some(id) => match self.span(id) {
        "delimiter" => {
          let f1 = self.formula_err()?;
          let cs1 = self.delim_chars(f1);
          let delim = match self.formula()? {
            None => Delimiter::Both(cs1),
            Some(f2) => Delimiter::LeftRight(cs1, self.delim_chars(f2)),
          };
          let end = self.chr_err(b';')?;
          Ok(Some(Stmt { span: (start..end).into(), k: StmtKind::Delimiter(delim) }))
        }
        "prefix" => self.simple_nota_stmt(start, SimpleNotaKind::Prefix),
        "infixl" => self.simple_nota_stmt(start, SimpleNotaKind::Infix { right: false }),
        "infixr" => self.simple_nota_stmt(start, SimpleNotaKind::Infix { right: true }),
        "binder_predicate" => {
          let (end, bp) = self.binder_pred()?;
          Ok(Some(Stmt { span: (start..end).into(), k: StmtKind::BinderPred(bp) }))
        }
        "def" => {
          let id = self.ident_err()?;
          self.chr_err(b':')?;
          let val = self.formula_err()?;
          let end = self.chr_err(b';')?;
          Ok(Some(Stmt { span: (start..end).into(), k: StmtKind::Def(Def { id, val }) }))
        }
        "show" => {
          let f = self.formula_err()?;
          let end = self.chr_err(b';')?;
          Ok(Some(Stmt { span: (start..end).into(), k: StmtKind::Show(f) }))
        }
        k => {
          self.idx = start;
          Err(ParseError { pos: id, level: ErrorLevel::Error, msg: format!("unknown command '{k}'").into() })
        }
      },
    }
  }

  fn simple_nota_stmt(&mut self, start: usize, k: SimpleNotaKind) -> Result<Option<Stmt>> {
    let (end, n) = self.simple_nota(k)?;
    Ok(Some(Stmt { span: (start..end).into(), k: StmtKind::SimpleNota(n) }))
  }

  fn stmt_recover(&mut self) -> Option<Stmt> {
    loop {
      match self.stmt() {
        Ok(d) => return d,
        Err(e) => {
          self.errors.push(e);
          while self.idx < self.source.len() {
            let c = self.cur();
            self.idx += 1;
            if c == b';' {
              self.ws();
              break
            }
          }
        }
      }
    }
  }
}

/// Parse a source file into an [`AST`]. Errors are collected in
/// [`AST::errors`] rather than returned, so that a file with parse errors can
/// still be (partially) elaborated.
#[must_use]
pub fn parse(file: Arc<LinedString>) -> AST {
  let mut p = Parser { source: file.as_bytes(), errors: vec![], idx: 0 };
  p.ws();
  let mut stmts = Vec::new();
  while let Some(d) = p.stmt_recover() {
    stmts.push(d)
  }
  AST { errors: p.errors, source: file, stmts }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse_str(src: &str) -> AST { parse(Arc::new(src.to_owned().into())) }

  #[test]
  fn empty_file() {
    let ast = parse_str("  -- just a comment\n");
    assert!(ast.stmts.is_empty());
    assert!(ast.errors.is_empty());
  }

  #[test]
  fn basic_stmts() {
    let ast = parse_str(
      "delimiter $ ( ) , $;\n\
       infixl lt: $<$ prec 50;\n\
       def foo: $ a < b $;\n\
       show $ a $;\n",
    );
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    assert_eq!(ast.stmts.len(), 4);
    match &ast.stmts[0].k {
      StmtKind::Delimiter(Delimiter::Both(cs)) => assert_eq!(&**cs, b"(),"),
      k => panic!("expected delimiter, got {k:?}"),
    }
    match &ast.stmts[1].k {
      StmtKind::SimpleNota(n) => {
        assert!(matches!(n.k, SimpleNotaKind::Infix { right: false }));
        assert_eq!(ast.span(n.id), "lt");
        assert_eq!(ast.span(n.c.trim), "<");
        assert_eq!(n.prec, Prec::Prec(50));
      }
      k => panic!("expected notation, got {k:?}"),
    }
    assert!(matches!(&ast.stmts[2].k, StmtKind::Def(d) if ast.span(d.id) == "foo"));
    assert!(matches!(&ast.stmts[3].k, StmtKind::Show(_)));
  }

  #[test]
  fn binder_pred_stmt() {
    let ast = parse_str("binder_predicate gt: x $>$ y prec 50 => $ x > y $;");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    match &ast.stmts[0].k {
      StmtKind::BinderPred(bp) => {
        assert_eq!(ast.span(bp.id.expect("named")), "gt");
        assert_eq!(ast.span(bp.var), "x");
        assert_eq!(ast.span(bp.c.trim), ">");
        assert_eq!(ast.span(bp.operand), "y");
        assert_eq!(bp.prec, Prec::Prec(50));
      }
      k => panic!("expected binder_predicate, got {k:?}"),
    }
  }

  #[test]
  fn binder_pred_anonymous() {
    let ast = parse_str("binder_predicate x $∈$ s prec 100 => $ mem x s $;");
    assert!(ast.errors.is_empty(), "{:?}", ast.errors);
    match &ast.stmts[0].k {
      StmtKind::BinderPred(bp) => {
        assert!(bp.id.is_none());
        assert_eq!(ast.span(bp.c.trim), "∈");
      }
      k => panic!("expected binder_predicate, got {k:?}"),
    }
  }

  #[test]
  fn recovery_continues() {
    let ast = parse_str("garbage nonsense;\ndef ok: $ a $;");
    assert_eq!(ast.errors.len(), 1);
    assert_eq!(ast.stmts.len(), 1);
    assert!(matches!(&ast.stmts[0].k, StmtKind::Def(_)));
  }

  #[test]
  fn bad_const() {
    let ast = parse_str("infixl f: $a b$ prec 1;");
    assert_eq!(ast.errors.len(), 1);
    assert!(ast.errors[0].msg.to_string().contains("embedded whitespace"));
  }

  #[test]
  fn prec_out_of_range() {
    let ast = parse_str("infixl f: $+$ prec 99999999999999;");
    assert_eq!(ast.errors.len(), 1);
    assert!(ast.errors[0].msg.to_string().contains("out of range"));
    let ast = parse_str("infixl f: $+$ prec 2048;");
    assert_eq!(ast.errors.len(), 1);
  }

  #[test]
  fn unclosed_formula() {
    let ast = parse_str("def f: $ a b;");
    assert_eq!(ast.errors.len(), 1);
    assert!(ast.errors[0].msg.to_string().contains("unclosed formula"));
  }
}

//! The math parser, which parses `$ ... $` formulas into [`QExpr`]s, driven by
//! the notation tables of the current environment.
//!
//! This is a Pratt parser over the token stream produced by [`token`]
//! (maximal runs of non-whitespace characters, split by the declared delimiter
//! characters). The quantifier tokens, `∧`, `→`, parentheses and numerals are
//! built in; all other notation comes from the [`ParserEnv`]. Extended binders
//! after a quantifier token are parsed here into [`ExtBinder`]s, but not
//! expanded; expansion happens during elaboration of the resulting tree.
//!
//! [`token`]: MathParser::token

use crate::elab::environment::{ParserEnv, Quant};
use crate::elab::{ElabError, Elaborator};
use crate::parser::ast::{Formula, Prec, APP_PREC};
use crate::parser::{ident_rest, ident_start, ParseError, Parser};
use crate::util::{AtomId, Span};
use std::mem;
use std::ops::{Deref, DerefMut};

/// The precedence of the built-in conjunction `∧` (right associative).
pub const AND_PREC: Prec = Prec::Prec(35);
/// The precedence of the built-in implication `→` (right associative).
pub const IMP_PREC: Prec = Prec::Prec(25);

/// A parsed formula, before elaboration. Identifiers are stored as spans into
/// the source; they are interned during elaboration.
#[derive(Debug)]
pub struct QExpr {
  /// The span of the formula.
  pub span: Span,
  /// The data of the formula.
  pub k: QExprKind,
}

/// The data of a parsed formula.
#[derive(Debug)]
pub enum QExprKind {
  /// An identifier or numeral applied to zero or more arguments by
  /// juxtaposition, `f a b`.
  IdentApp(Span, Vec<QExpr>),
  /// An application of a constant which has notation, created by a prefix or
  /// infix token. The span is the token.
  App(Span, AtomId, Vec<QExpr>),
  /// A conjunction `e1 ∧ e2`.
  And(Box<QExpr>, Box<QExpr>),
  /// An implication `e1 → e2`.
  Imp(Box<QExpr>, Box<QExpr>),
  /// A quantifier applied to a list of extended binders. For the plain
  /// quantifier tokens `∃`/`∀` the list has exactly one element; for the
  /// collection tokens `∃ᵉ`/`∀ᵉ` it may have any length, including zero.
  Bind(Quant, Vec<ExtBinder>, Box<QExpr>),
}

/// An extended binder, the region between a quantifier token and the `,`
/// (or one parenthesized group after a collection quantifier).
#[derive(Debug)]
pub struct ExtBinder {
  /// The span of the whole binder.
  pub span: Span,
  /// The bound variable, or `None` if it was the wildcard `_`.
  pub var: Option<Span>,
  /// The annotation on the binder.
  pub kind: ExtBinderKind,
}

/// The annotation on an extended binder.
#[derive(Debug)]
pub enum ExtBinderKind {
  /// No annotation: `∃ x, p`.
  Plain,
  /// A type annotation: `∃ x : ty, p`.
  Typed(QExpr),
  /// A binder predicate application `∃ x < e, p`. The span is the predicate
  /// token (which was registered at parse time; the expander looks it up
  /// again by name).
  Pred(Span, QExpr),
}

impl Elaborator {
  /// Parse a formula with the math parser, in the current parser environment.
  pub fn parse_formula(&self, f: Formula) -> Result<QExpr, ElabError> {
    let mut p = MathParser {
      pe: &self.env.pe,
      p: Parser { source: self.ast.source.as_bytes(), errors: vec![], idx: f.0.start + 1 },
    };
    p.ws();
    let expr = p.expr(Prec::Prec(0))?;
    if let Some(tk) = p.token() {
      return Err(ElabError::new_e(tk, "expected '$'"))
    }
    debug_assert!(p.p.errors.is_empty());
    Ok(expr)
  }
}

fn bump(sp: Span, p: Prec) -> Result<Prec, ParseError> {
  if let Prec::Prec(n) = p {
    if let Some(i) = n.checked_add(1) {
      Ok(Prec::Prec(i))
    } else {
      Err(ParseError::new(sp, "precedence out of range".into()))
    }
  } else {
    Err(ParseError::new(sp, "max prec not allowed here".into()))
  }
}

struct MathParser<'a> {
  p: Parser<'a>,
  pe: &'a ParserEnv,
}
impl<'a> Deref for MathParser<'a> {
  type Target = Parser<'a>;
  fn deref(&self) -> &Parser<'a> { &self.p }
}
impl<'a> DerefMut for MathParser<'a> {
  fn deref_mut(&mut self) -> &mut Parser<'a> { &mut self.p }
}

impl<'a> MathParser<'a> {
  fn ws(&mut self) {
    loop {
      match self.cur() {
        b' ' | b'\n' => self.idx += 1,
        _ => return,
      }
    }
  }

  /// Scan the next math token: a maximal run of characters not containing
  /// whitespace or delimiters. Left delimiter characters form tokens by
  /// themselves; right delimiter characters additionally terminate the token
  /// before them. Returns `None` at the closing `$` of the formula.
  fn token(&mut self) -> Option<Span> {
    let start = self.idx;
    loop {
      match self.cur() {
        c if self.pe.delims_r.get(c) && self.idx != start =>
          return Some((start..(self.idx, self.ws()).0).into()),
        c if self.pe.delims_l.get(c) => {
          self.idx += 1;
          return Some((start..(self.idx, self.ws()).0).into())
        }
        b'$' if start == self.idx => return None,
        b'$' => return Some((start..self.idx).into()),
        b' ' | b'\n' => return Some((start..(self.idx, self.ws()).0).into()),
        _ => self.idx += 1,
      }
    }
  }

  fn peek_token(&mut self) -> (Option<Span>, usize) {
    let start = self.idx;
    let tk = self.token();
    (tk, mem::replace(&mut self.idx, start))
  }

  fn is_ident(&self, sp: Span) -> bool {
    let s = &self.source[sp.start..sp.end];
    s.first().map_or(false, |&c| ident_start(c)) && s[1..].iter().all(|&c| ident_rest(c))
  }

  fn is_numeral(&self, sp: Span) -> bool {
    let s = &self.source[sp.start..sp.end];
    !s.is_empty() && s.iter().all(u8::is_ascii_digit)
  }

  /// Parse one extended binder: a variable (or `_`), optionally followed by a
  /// type annotation `: ty` or a registered binder predicate token and its
  /// operand. A token in the annotation position that is neither of these is
  /// left for the caller (which will fail expecting `,` unless it is one).
  fn ext_binder(&mut self) -> Result<ExtBinder, ParseError> {
    let v = self.token().ok_or_else(|| self.err("expecting binder variable".into()))?;
    let var = if self.span(v) == "_" {
      None
    } else if self.is_ident(v) {
      Some(v)
    } else {
      return Err(ParseError::new(v, "expecting binder variable".into()))
    };
    let (tk, end) = self.peek_token();
    if let Some(tk) = tk {
      if self.span(tk) == ":" {
        self.idx = end;
        let ty = self.expr(Prec::Prec(0))?;
        return Ok(ExtBinder { span: (v.start..ty.span.end).into(), var, kind: ExtBinderKind::Typed(ty) })
      }
      if let Some(bp) = self.pe.binder_pred(&self.source[tk.start..tk.end]) {
        self.idx = end;
        let operand = self.expr(bump(tk, bp.prec)?)?;
        return Ok(ExtBinder {
          span: (v.start..operand.span.end).into(),
          var,
          kind: ExtBinderKind::Pred(tk, operand),
        })
      }
    }
    Ok(ExtBinder { span: v, var, kind: ExtBinderKind::Plain })
  }

  /// Parse the binder list of a collection quantifier: a sequence of
  /// parenthesized binder groups, or a single bare binder, or nothing (when
  /// the next token is the `,`).
  fn ext_binders(&mut self) -> Result<Vec<ExtBinder>, ParseError> {
    let mut bis = Vec::new();
    if self.cur() == b'(' {
      while self.cur() == b'(' {
        let start = self.idx;
        self.idx += 1;
        self.ws();
        let mut bi = self.ext_binder()?;
        bi.span = (start..self.chr_err(b')')?).into();
        bis.push(bi);
      }
    } else {
      match self.peek_token() {
        (Some(tk), _) if self.span(tk) == "," => {}
        _ => bis.push(self.ext_binder()?),
      }
    }
    Ok(bis)
  }

  fn quant_expr(&mut self, start: usize, q: Quant, coll: bool) -> Result<QExpr, ParseError> {
    let bis = if coll { self.ext_binders()? } else { vec![self.ext_binder()?] };
    let tk = self.token().ok_or_else(|| self.err("expecting ','".into()))?;
    if self.span(tk) != "," {
      return Err(ParseError::new(tk, "expecting ','".into()))
    }
    let body = self.expr(Prec::Prec(0))?;
    Ok(QExpr { span: (start..body.span.end).into(), k: QExprKind::Bind(q, bis, Box::new(body)) })
  }

  fn prefix(&mut self, p: Prec) -> Result<QExpr, ParseError> {
    let start = self.idx;
    if self.cur() == b'(' {
      self.idx += 1;
      self.ws();
      let mut e = self.expr(Prec::Prec(0))?;
      e.span = (start..self.chr_err(b')')?).into();
      return Ok(e)
    }
    let sp = self.token().ok_or_else(|| self.err("expecting expression".into()))?;
    let v = self.span(sp);
    match v {
      "∃" if p <= APP_PREC => return self.quant_expr(start, Quant::Exists, false),
      "∀" if p <= APP_PREC => return self.quant_expr(start, Quant::Forall, false),
      "∃ᵉ" if p <= APP_PREC => return self.quant_expr(start, Quant::Exists, true),
      "∀ᵉ" if p <= APP_PREC => return self.quant_expr(start, Quant::Forall, true),
      "_" => return Err(ParseError::new(sp, "wildcard not allowed in this position".into())),
      _ => {}
    }
    if let Some(&(_, q)) = self.pe.consts.get(v.as_bytes()) {
      if q >= p {
        if let Some(info) = self.pe.prefixes.get(v.as_bytes()) {
          let arg = self.expr(q)?;
          return Ok(QExpr {
            span: (start..arg.span.end).into(),
            k: QExprKind::App(sp, info.term, vec![arg]),
          })
        }
      }
    } else if self.is_ident(sp) {
      let mut args = Vec::new();
      let mut start = self.idx;
      let mut span = sp;
      if p <= APP_PREC {
        while let Ok(e) = self.expr(Prec::Max) {
          span.end = e.span.end;
          start = self.idx;
          args.push(e);
        }
      }
      self.idx = start;
      return Ok(QExpr { span, k: QExprKind::IdentApp(sp, args) })
    } else if self.is_numeral(sp) {
      return Ok(QExpr { span: sp, k: QExprKind::IdentApp(sp, vec![]) })
    }
    Err(ParseError::new(sp, format!("expecting prefix expression >= {p}").into()))
  }

  fn lhs(&mut self, p: Prec, mut lhs: QExpr) -> Result<QExpr, ParseError> {
    loop {
      let tok_end = self.peek_token();
      let tk = if let Some(tk) = tok_end.0 { tk } else { break };
      let s = self.span(tk);
      match s {
        "∧" if AND_PREC >= p => {
          self.idx = tok_end.1;
          let rhs = self.expr(AND_PREC)?;
          lhs = QExpr {
            span: (lhs.span.start..rhs.span.end).into(),
            k: QExprKind::And(Box::new(lhs), Box::new(rhs)),
          };
        }
        "→" if IMP_PREC >= p => {
          self.idx = tok_end.1;
          let rhs = self.expr(IMP_PREC)?;
          lhs = QExpr {
            span: (lhs.span.start..rhs.span.end).into(),
            k: QExprKind::Imp(Box::new(lhs), Box::new(rhs)),
          };
        }
        _ => {
          let q = if let Some(&(_, q)) = self.pe.consts.get(s.as_bytes()) { q } else { break };
          if q < p {
            break
          }
          let info = if let Some(i) = self.pe.infixes.get(s.as_bytes()) { i } else { break };
          let term = info.term;
          let rp = if info.rassoc == Some(true) { q } else { bump(tk, q)? };
          self.idx = tok_end.1;
          let rhs = self.expr(rp)?;
          lhs = QExpr {
            span: (lhs.span.start..rhs.span.end).into(),
            k: QExprKind::App(tk, term, vec![lhs, rhs]),
          };
        }
      }
    }
    Ok(lhs)
  }

  fn expr(&mut self, p: Prec) -> Result<QExpr, ParseError> {
    let lhs = self.prefix(p)?;
    self.lhs(p, lhs)
  }
}

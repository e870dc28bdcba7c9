//! A pretty printer for elaborated terms, used by `show` suggestions and the
//! exporter. The output is notation-aware: it prints through the declared
//! prefix/infix tokens and parenthesizes by precedence, so rendered text
//! parses back to the same term in the same environment.

use crate::elab::environment::{Quant, Term};
use crate::elab::math_parser::{AND_PREC, IMP_PREC};
use crate::elab::print::FormatEnv;
use crate::parser::ast::{Prec, APP_PREC};
use pretty::{Arena, Doc, DocAllocator, RefDoc};
use std::borrow::Cow;
use std::fmt;
use std::mem;

#[derive(Copy, Clone, Debug)]
struct PP<'a> {
  left: bool,
  right: bool,
  small: bool,
  doc: RefDoc<'a, ()>,
}

impl<'a> PP<'a> {
  fn token(alloc: &'a Arena<'a, ()>, fe: FormatEnv<'_>, tk: &'a str) -> PP<'a> {
    PP {
      // A right delimiter like ')' has a token boundary on its left side,
      // and vice versa. This ensures that `x ( y ) z` gets notated as `x (y) z`
      left: fe.pe.delims_r.get(*tk.as_bytes().first().expect("empty token")),
      right: fe.pe.delims_l.get(*tk.as_bytes().last().expect("empty token")),
      small: true,
      doc: alloc.alloc(Doc::text(tk)),
    }
  }

  fn word(alloc: &'a Arena<'a, ()>, data: impl Into<Cow<'a, str>>) -> PP<'a> {
    PP { left: false, right: false, small: true, doc: alloc.alloc(Doc::text(data)) }
  }
}

/// The pretty printer: a [`FormatEnv`] with a document arena.
pub struct Pretty<'a> {
  fe: FormatEnv<'a>,
  alloc: &'a Arena<'a, ()>,
  lparen: PP<'a>,
  rparen: PP<'a>,
}

const NIL: RefDoc<'static, ()> = RefDoc(&Doc::Nil);
const HARDLINE: RefDoc<'static, ()> = RefDoc(&Doc::Line);
const SPACE: RefDoc<'static, ()> = RefDoc(&Doc::BorrowedText(" "));
const LINE: RefDoc<'static, ()> = RefDoc(&Doc::FlatAlt(HARDLINE, SPACE));
const LINE_: RefDoc<'static, ()> = RefDoc(&Doc::FlatAlt(HARDLINE, NIL));
const SOFTLINE: RefDoc<'static, ()> = RefDoc(&Doc::Group(LINE));
const SOFTLINE_: RefDoc<'static, ()> = RefDoc(&Doc::Group(LINE_));

fn covariant<'a>(from: RefDoc<'static, ()>) -> RefDoc<'a, ()> {
  // Safety: RefDoc is covariant in its lifetime
  unsafe { mem::transmute(from) }
}

fn bump(p: Prec) -> Prec {
  match p {
    // precedences are below 2048, so this cannot overflow
    Prec::Prec(n) => Prec::Prec(n + 1),
    Prec::Max => Prec::Max,
  }
}

impl<'a> Pretty<'a> {
  fn line() -> RefDoc<'a, ()> { covariant(LINE) }
  fn softline() -> RefDoc<'a, ()> { covariant(SOFTLINE) }
  fn softline_() -> RefDoc<'a, ()> { covariant(SOFTLINE_) }

  fn new(fe: FormatEnv<'a>, alloc: &'a Arena<'a, ()>) -> Pretty<'a> {
    Pretty { lparen: PP::token(alloc, fe, "("), rparen: PP::token(alloc, fe, ")"), fe, alloc }
  }

  fn token(&'a self, tk: &'a str) -> PP<'a> { PP::token(self.alloc, self.fe, tk) }
  fn word(&'a self, data: impl Into<Cow<'a, str>>) -> PP<'a> { PP::word(self.alloc, data) }

  fn alloc(&'a self, doc: Doc<'a, RefDoc<'a, ()>, ()>) -> RefDoc<'a, ()> {
    self.alloc.alloc(doc)
  }

  fn append_doc(&'a self, a: RefDoc<'a, ()>, b: RefDoc<'a, ()>) -> RefDoc<'a, ()> {
    self.alloc(Doc::Append(a, b))
  }

  fn append_with(&'a self, a: PP<'a>, sp: RefDoc<'a, ()>, b: PP<'a>) -> PP<'a> {
    let doc = self.append_doc(self.append_doc(a.doc, sp), b.doc);
    PP { left: a.left, right: b.right, small: false, doc }
  }

  fn append(&'a self, a: PP<'a>, b: PP<'a>) -> PP<'a> {
    let sp = if a.right || b.left { Self::softline_() } else { Self::softline() };
    self.append_with(a, sp, b)
  }

  fn group(&'a self, PP { left, right, small, doc }: PP<'a>) -> PP<'a> {
    PP { left, right, small, doc: self.alloc(Doc::Group(doc)) }
  }

  fn nest(&'a self, i: isize, PP { left, right, small, doc }: PP<'a>) -> PP<'a> {
    PP { left, right, small, doc: self.alloc(Doc::Nest(i, doc)) }
  }

  fn expr_paren(&'a self, e: &Term, p: Prec) -> PP<'a> {
    let (q, doc) = self.pp_term(e);
    if p > q {
      self.append(self.append(self.lparen, doc), self.rparen)
    } else {
      doc
    }
  }

  fn app(&'a self, mut head: PP<'a>, mut es: impl Iterator<Item = PP<'a>>) -> PP<'a> {
    while let Some(mut doc) = es.next() {
      if doc.small {
        head = self.append_with(head, Self::softline(), doc);
      } else {
        loop {
          head = self.append_with(head, Self::line(), doc);
          doc = if let Some(doc) = es.next() { doc } else { return head }
        }
      }
    }
    head
  }

  fn infix(&'a self, tk: &'a str, q: Prec, rassoc: bool, e1: &Term, e2: &Term) -> PP<'a> {
    let (lp, rp) = if rassoc { (bump(q), q) } else { (q, bump(q)) };
    let doc = self.group(self.expr_paren(e1, lp));
    let doc = self.append_with(doc, Self::softline(), self.token(tk));
    let doc = self.append_with(doc, Self::line(), self.group(self.expr_paren(e2, rp)));
    self.group(self.nest(2, doc))
  }

  fn pp_term(&'a self, e: &Term) -> (Prec, PP<'a>) {
    match e {
      Term::App(a, args) => {
        let name = self.fe.data[*a].name.as_str();
        if args.is_empty() {
          return (Prec::Max, self.word(name))
        }
        if let Some((tk, infix)) = self.fe.pe.decl_nota.get(a).and_then(|v| v.first()) {
          let q = self.fe.pe.consts[tk].1;
          if *infix && args.len() == 2 {
            let rassoc = matches!(self.fe.pe.infixes[tk].rassoc, Some(true));
            return (q, self.infix(tk.as_str(), q, rassoc, &args[0], &args[1]))
          }
          if !*infix && args.len() == 1 {
            let doc = self.append(self.token(tk.as_str()), self.group(self.expr_paren(&args[0], q)));
            return (q, self.group(self.nest(2, doc)))
          }
        }
        let doc = self.app(self.word(name), args.iter().map(|e| self.expr_paren(e, Prec::Max)));
        (APP_PREC, self.group(self.nest(2, doc)))
      }
      Term::And(e1, e2) => (AND_PREC, self.infix("∧", AND_PREC, true, e1, e2)),
      Term::Imp(e1, e2) => (IMP_PREC, self.infix("→", IMP_PREC, true, e1, e2)),
      Term::Quant(q, v, ty, body) => {
        let mut doc = self.append(self.word(q.token()), self.word(self.fe.data[*v].name.as_str()));
        if let Some(ty) = ty {
          doc = self.append(doc, self.token(":"));
          doc = self.append(doc, self.group(self.expr_paren(ty, Prec::Prec(0))));
        }
        doc = self.append(doc, self.token(","));
        let doc = self.append_with(doc, Self::line(), self.group(self.expr_paren(body, Prec::Prec(0))));
        (Prec::Prec(0), self.group(self.nest(2, doc)))
      }
    }
  }

  /// Print a term at top level (no enclosing `$`).
  pub fn term(&'a self, e: &Term) -> RefDoc<'a, ()> {
    self.expr_paren(e, Prec::Prec(0)).doc
  }

  /// Print a term as a formula, `$ e $`.
  pub fn expr(&'a self, e: &Term) -> RefDoc<'a, ()> {
    let mut doc = self.expr_paren(e, Prec::Prec(0)).doc;
    if let Doc::Group(doc2) = *doc {
      doc = doc2
    }
    let doc =
      self.append_doc(self.alloc(Doc::text("$ ")), self.append_doc(doc, self.alloc(Doc::text(" $"))));
    self.alloc(Doc::Group(doc))
  }
}

/// A [`fmt::Display`] wrapper for a term rendered as a `$ ... $` formula at a
/// given width.
pub struct PpExpr<'a> {
  fe: FormatEnv<'a>,
  e: &'a Term,
  width: usize,
}

impl<'a> FormatEnv<'a> {
  /// Run a function with a [`Pretty`] printer for this environment.
  pub fn pretty<T>(self, f: impl for<'b> FnOnce(&'b Pretty<'b>) -> T) -> T {
    f(&Pretty::new(self, &Arena::new()))
  }

  /// Render `e` as a `$ ... $` formula at the given width.
  pub fn pp(self, e: &'a Term, width: usize) -> PpExpr<'a> { PpExpr { fe: self, e, width } }
}

impl fmt::Display for PpExpr<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.fe.pretty(|p| p.expr(self.e).render_fmt(self.width, f))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::elab::environment::{Environment, NotaInfo};
  use crate::lined_string::LinedString;
  use crate::util::FileSpan;

  fn test_env() -> Environment {
    let mut env = Environment::new();
    env.pe.add_delimiters(b"(),", b"(),");
    let lt = env.get_atom("lt");
    env.pe.add_const("<".into(), FileSpan::default(), Prec::Prec(50)).expect("const");
    env
      .pe
      .add_infix("<".into(), NotaInfo {
        span: FileSpan::default(),
        term: lt,
        prec: Prec::Prec(50),
        rassoc: Some(false),
      })
      .expect("infix");
    env
  }

  fn render(env: &Environment, e: &Term) -> String {
    let src = LinedString::from(String::new());
    let fe = FormatEnv { source: &src, env };
    format!("{}", fe.pp(e, 80))
  }

  #[test]
  fn applications() {
    let mut env = test_env();
    let (f, a, b) = (env.get_atom("f"), env.get_atom("a"), env.get_atom("b"));
    let e = Term::App(f, vec![Term::var(a), Term::var(b)]);
    assert_eq!(render(&env, &e), "$ f a b $");
    let e = Term::App(f, vec![Term::And(Box::new(Term::var(a)), Box::new(Term::var(b)))]);
    assert_eq!(render(&env, &e), "$ f (a ∧ b) $");
  }

  #[test]
  fn connective_precedence() {
    let mut env = test_env();
    let (a, b, c) = (env.get_atom("a"), env.get_atom("b"), env.get_atom("c"));
    // ∧ binds tighter than →, so the left side needs no parentheses
    let e = Term::Imp(
      Box::new(Term::And(Box::new(Term::var(a)), Box::new(Term::var(b)))),
      Box::new(Term::var(c)),
    );
    assert_eq!(render(&env, &e), "$ a ∧ b → c $");
    // → is right associative, so a nested implication on the left does
    let e = Term::Imp(
      Box::new(Term::Imp(Box::new(Term::var(a)), Box::new(Term::var(b)))),
      Box::new(Term::var(c)),
    );
    assert_eq!(render(&env, &e), "$ (a → b) → c $");
    let e = Term::Imp(
      Box::new(Term::var(a)),
      Box::new(Term::Imp(Box::new(Term::var(b)), Box::new(Term::var(c)))),
    );
    assert_eq!(render(&env, &e), "$ a → b → c $");
  }

  #[test]
  fn user_notation() {
    let mut env = test_env();
    let lt = env.get_atom("lt");
    let (x, zero) = (env.get_atom("x"), env.get_atom("0"));
    let e = Term::App(lt, vec![Term::var(x), Term::var(zero)]);
    assert_eq!(render(&env, &e), "$ x < 0 $");
  }

  #[test]
  fn quantifiers() {
    let mut env = test_env();
    let lt = env.get_atom("lt");
    let (x, nat, p, two) =
      (env.get_atom("x"), env.get_atom("Nat"), env.get_atom("P"), env.get_atom("2"));
    let lt_x2 = Term::App(lt, vec![Term::var(x), Term::var(two)]);
    let px = Term::App(p, vec![Term::var(x)]);
    let e = Term::quant(
      Quant::Exists,
      x,
      Term::And(Box::new(lt_x2), Box::new(px.clone())),
    );
    assert_eq!(render(&env, &e), "$ ∃ x, x < 2 ∧ P x $");
    let e = Term::Quant(Quant::Forall, x, Some(Box::new(Term::var(nat))), Box::new(px));
    assert_eq!(render(&env, &e), "$ ∀ x : Nat, P x $");
  }

  #[test]
  fn quantifier_in_operand_position() {
    let mut env = test_env();
    let (a, s, x) = (env.get_atom("a"), env.get_atom("S"), env.get_atom("x"));
    // a quantifier operand is parenthesized, since a bare body would absorb
    // the rest of the formula when reparsed
    let e = Term::And(
      Box::new(Term::quant(Quant::Exists, x, Term::var(s))),
      Box::new(Term::var(a)),
    );
    assert_eq!(render(&env, &e), "$ (∃ x, S) ∧ a $");
    let e = Term::And(
      Box::new(Term::var(a)),
      Box::new(Term::quant(Quant::Exists, x, Term::var(s))),
    );
    assert_eq!(render(&env, &e), "$ a ∧ (∃ x, S) $");
  }
}

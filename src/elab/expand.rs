//! Elaboration of parsed formulas into [`Term`]s, including the expansion of
//! extended binder notation into primitive quantifiers.
//!
//! The math parser leaves quantifier prefixes as [`Bind`](QExprKind::Bind)
//! nodes holding unexpanded [`ExtBinder`]s. This module resolves identifier
//! spans to atoms, looks up binder predicates in the registry, and rewrites
//! each binder list by a right-to-left fold of [`expand_one`]: the first
//! binder ends up outermost, and an empty list leaves the body untouched.
//!
//! [`expand_one`]: Elaborator::expand_one

use crate::elab::environment::{BinderPred, Quant, Term};
use crate::elab::math_parser::{ExtBinder, ExtBinderKind, QExpr, QExprKind};
use crate::elab::{ElabError, Elaborator};
use crate::util::AtomId;
use std::collections::HashSet;

/// An elaborated extended binder: atoms resolved and the predicate
/// registration selected, but the quantifier not yet built.
#[derive(Debug)]
pub struct Binder {
  /// The bound variable, or `None` for the wildcard `_` (a fresh variable is
  /// allocated at expansion time).
  pub var: Option<AtomId>,
  /// The annotation on the binder.
  pub kind: BinderKind,
}

/// The annotation on an elaborated extended binder.
#[derive(Debug)]
pub enum BinderKind {
  /// No annotation.
  Plain,
  /// A type annotation.
  Typed(Term),
  /// A binder predicate application: the selected registration and the
  /// elaborated operand.
  Pred(BinderPred, Term),
}

impl Elaborator {
  /// Elaborate a parsed formula to a [`Term`], interning identifiers and
  /// expanding all extended binder notation.
  pub fn elab_qexpr(&mut self, e: &QExpr) -> Result<Term, ElabError> {
    match &e.k {
      QExprKind::IdentApp(sp, args) => {
        let a = self.env.get_atom(self.ast.span(*sp));
        let args = args.iter().map(|e| self.elab_qexpr(e)).collect::<Result<Vec<_>, _>>()?;
        Ok(Term::App(a, args))
      }
      QExprKind::App(_, t, args) => {
        let args = args.iter().map(|e| self.elab_qexpr(e)).collect::<Result<Vec<_>, _>>()?;
        Ok(Term::App(*t, args))
      }
      QExprKind::And(e1, e2) =>
        Ok(Term::And(Box::new(self.elab_qexpr(e1)?), Box::new(self.elab_qexpr(e2)?))),
      QExprKind::Imp(e1, e2) =>
        Ok(Term::Imp(Box::new(self.elab_qexpr(e1)?), Box::new(self.elab_qexpr(e2)?))),
      QExprKind::Bind(q, bis, body) => {
        let bis = bis.iter().map(|bi| self.elab_ext_binder(bi)).collect::<Result<Vec<_>, _>>()?;
        let body = self.elab_qexpr(body)?;
        Ok(self.expand(*q, bis, body))
      }
    }
  }

  fn elab_ext_binder(&mut self, bi: &ExtBinder) -> Result<Binder, ElabError> {
    let var = match bi.var {
      Some(sp) => Some(self.env.get_atom(self.ast.span(sp))),
      None => None,
    };
    let kind = match &bi.kind {
      ExtBinderKind::Plain => BinderKind::Plain,
      ExtBinderKind::Typed(ty) => BinderKind::Typed(self.elab_qexpr(ty)?),
      ExtBinderKind::Pred(tk, e) => {
        let bp = match self.env.pe.binder_pred(self.ast.span(*tk).as_bytes()) {
          Some(bp) => bp.clone(),
          None => {
            return Err(ElabError::new_e(
              *tk,
              format!("binder predicate token '{}' is not registered", self.ast.span(*tk)),
            ))
          }
        };
        BinderKind::Pred(bp, self.elab_qexpr(e)?)
      }
    };
    Ok(Binder { var, kind })
  }

  /// Expand a binder list over `body`, folding right to left so that the
  /// first binder becomes the outermost quantifier. An empty list returns
  /// `body` unchanged.
  pub fn expand(&mut self, q: Quant, bis: Vec<Binder>, body: Term) -> Term {
    bis.into_iter().rev().fold(body, |body, bi| self.expand_one(q, bi, body))
  }

  /// Expand a single extended binder over `body`:
  ///
  /// * plain `x` produces a bare quantifier node;
  /// * typed `x : ty` produces a quantifier node carrying the annotation;
  /// * predicated `x tok e` instantiates the registered template `T` and
  ///   produces `∃ x, T[x, e] ∧ body` or `∀ x, T[x, e] → body`.
  ///
  /// A wildcard variable is replaced by a fresh name not free in the body,
  /// the type, the operand, or the template's constants.
  pub fn expand_one(&mut self, q: Quant, bi: Binder, body: Term) -> Term {
    let v = match bi.var {
      Some(v) => v,
      None => {
        let mut avoid = HashSet::new();
        body.free_vars(&mut avoid);
        match &bi.kind {
          BinderKind::Plain => {}
          BinderKind::Typed(ty) => ty.free_vars(&mut avoid),
          BinderKind::Pred(bp, e) => {
            e.free_vars(&mut avoid);
            bp.template.free_vars(&mut avoid);
            // the metavariables are substituted away
            avoid.remove(&bp.var);
            avoid.remove(&bp.operand);
          }
        }
        self.fresh_var(&avoid)
      }
    };
    match bi.kind {
      BinderKind::Plain => Term::quant(q, v, body),
      BinderKind::Typed(ty) => Term::Quant(q, v, Some(Box::new(ty)), Box::new(body)),
      BinderKind::Pred(bp, e) => {
        let pred = bp.template.subst(bp.var, &Term::var(v), bp.operand, &e);
        Term::quant(q, v, q.wrap(pred, body))
      }
    }
  }

  /// Allocate a variable name not in `avoid`: the first of `x`, `x1`, `x2`,
  /// ... that does not collide.
  fn fresh_var(&mut self, avoid: &HashSet<AtomId>) -> AtomId {
    let mut i = 0u32;
    loop {
      let name = if i == 0 { "x".to_owned() } else { format!("x{i}") };
      let a = self.env.get_atom(&name);
      if !avoid.contains(&a) {
        return a
      }
      i += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::{ast::Prec, parse};
  use crate::util::{FileRef, FileSpan};
  use std::path::PathBuf;
  use std::sync::Arc;

  fn test_elab() -> Elaborator {
    let ast = Arc::new(parse(Arc::new(String::new().into())));
    Elaborator::new(ast, FileRef::from(PathBuf::from("test.eb")))
  }

  fn gt_pred(e: &mut Elaborator) -> BinderPred {
    let (xm, ym) = (e.env.get_atom("xm"), e.env.get_atom("ym"));
    let gt = e.env.get_atom(">");
    BinderPred {
      span: FileSpan::default(),
      name: e.env.get_atom("gt_pred"),
      prec: Prec::Prec(50),
      var: xm,
      operand: ym,
      template: Term::App(gt, vec![Term::var(xm), Term::var(ym)]),
    }
  }

  #[test]
  fn empty_binder_list_is_identity() {
    let mut e = test_elab();
    let p = e.env.get_atom("P");
    let body = Term::var(p);
    assert_eq!(e.expand(Quant::Exists, vec![], body.clone()), body);
  }

  #[test]
  fn n_binders_nest_first_outermost() {
    let mut e = test_elab();
    let (a, b, c, p) =
      (e.env.get_atom("a"), e.env.get_atom("b"), e.env.get_atom("c"), e.env.get_atom("P"));
    let bis = [a, b, c]
      .into_iter()
      .map(|v| Binder { var: Some(v), kind: BinderKind::Plain })
      .collect::<Vec<_>>();
    let out = e.expand(Quant::Forall, bis, Term::var(p));
    let expected = Term::quant(
      Quant::Forall,
      a,
      Term::quant(Quant::Forall, b, Term::quant(Quant::Forall, c, Term::var(p))),
    );
    assert_eq!(out, expected);
  }

  #[test]
  fn predicated_exists_wraps_with_and() {
    let mut e = test_elab();
    let bp = gt_pred(&mut e);
    let (x, zero, p) = (e.env.get_atom("x"), e.env.get_atom("0"), e.env.get_atom("P"));
    let gt = e.env.get_atom(">");
    let body = Term::App(p, vec![Term::var(x)]);
    let bi = Binder { var: Some(x), kind: BinderKind::Pred(bp, Term::var(zero)) };
    let out = e.expand_one(Quant::Exists, bi, body.clone());
    let pred = Term::App(gt, vec![Term::var(x), Term::var(zero)]);
    assert_eq!(out, Term::quant(Quant::Exists, x, Term::And(Box::new(pred), Box::new(body))));
  }

  #[test]
  fn predicated_forall_wraps_with_imp() {
    let mut e = test_elab();
    let bp = gt_pred(&mut e);
    let (x, zero, p) = (e.env.get_atom("x"), e.env.get_atom("0"), e.env.get_atom("P"));
    let gt = e.env.get_atom(">");
    let body = Term::App(p, vec![Term::var(x)]);
    let bi = Binder { var: Some(x), kind: BinderKind::Pred(bp, Term::var(zero)) };
    let out = e.expand_one(Quant::Forall, bi, body.clone());
    let pred = Term::App(gt, vec![Term::var(x), Term::var(zero)]);
    assert_eq!(out, Term::quant(Quant::Forall, x, Term::Imp(Box::new(pred), Box::new(body))));
  }

  #[test]
  fn typed_binder_keeps_annotation() {
    let mut e = test_elab();
    let (x, nat, r) = (e.env.get_atom("x"), e.env.get_atom("Nat"), e.env.get_atom("R"));
    let bi = Binder { var: Some(x), kind: BinderKind::Typed(Term::var(nat)) };
    let out = e.expand_one(Quant::Exists, bi, Term::App(r, vec![Term::var(x)]));
    assert_eq!(
      out,
      Term::Quant(
        Quant::Exists,
        x,
        Some(Box::new(Term::var(nat))),
        Box::new(Term::App(r, vec![Term::var(x)])),
      )
    );
  }

  #[test]
  fn wildcard_gets_fresh_name() {
    let mut e = test_elab();
    let s = e.env.get_atom("S");
    let bi = Binder { var: None, kind: BinderKind::Plain };
    let out = e.expand_one(Quant::Forall, bi, Term::var(s));
    let x = e.env.get_atom("x");
    assert_eq!(out, Term::quant(Quant::Forall, x, Term::var(s)));
  }

  #[test]
  fn wildcard_shifts_past_collisions() {
    let mut e = test_elab();
    let (s, x) = (e.env.get_atom("S"), e.env.get_atom("x"));
    let body = Term::App(s, vec![Term::var(x)]);
    let bi = Binder { var: None, kind: BinderKind::Plain };
    let out = e.expand_one(Quant::Forall, bi, body.clone());
    let x1 = e.env.get_atom("x1");
    assert_eq!(out, Term::quant(Quant::Forall, x1, body));
  }

  #[test]
  fn wildcard_avoids_operand_vars() {
    // ∃ _ > x, P must not capture the x in the operand
    let mut e = test_elab();
    let bp = gt_pred(&mut e);
    let (x, p, gt) = (e.env.get_atom("x"), e.env.get_atom("P"), e.env.get_atom(">"));
    let bi = Binder { var: None, kind: BinderKind::Pred(bp, Term::var(x)) };
    let out = e.expand_one(Quant::Exists, bi, Term::var(p));
    let x1 = e.env.get_atom("x1");
    let pred = Term::App(gt, vec![Term::var(x1), Term::var(x)]);
    assert_eq!(
      out,
      Term::quant(Quant::Exists, x1, Term::And(Box::new(pred), Box::new(Term::var(p))))
    );
  }
}

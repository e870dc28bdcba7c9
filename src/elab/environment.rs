//! The elaboration environment: atom interning, the elaborated term language,
//! and the notation tables consulted by the math parser, including the binder
//! predicate registry.

use crate::parser::ast::Prec;
use crate::util::{ArcString, AtomId, AtomVec, DefId, DefVec, FileSpan, HashMapExt};
use std::collections::{HashMap, HashSet};

/// The two primitive quantifiers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Quant {
  /// The existential quantifier `∃`.
  Exists,
  /// The universal quantifier `∀`.
  Forall,
}

impl Quant {
  /// The surface token for this quantifier.
  #[must_use]
  pub fn token(self) -> &'static str {
    match self {
      Quant::Exists => "∃",
      Quant::Forall => "∀",
    }
  }

  /// The connective this quantifier uses to attach a binder predicate to the
  /// body: `∃ x > 0, p` becomes `∃ x, x > 0 ∧ p` while `∀ x > 0, p` becomes
  /// `∀ x, x > 0 → p`.
  #[must_use]
  pub fn wrap(self, pred: Term, body: Term) -> Term {
    match self {
      Quant::Exists => Term::And(Box::new(pred), Box::new(body)),
      Quant::Forall => Term::Imp(Box::new(pred), Box::new(body)),
    }
  }
}

/// An elaborated term. All extended binder notation has been expanded away at
/// this level; what remains is applications, the two primitive connectives,
/// and single-variable quantifiers.
///
/// There is no binding environment: an atom applied to no arguments is a
/// variable or constant reference, and which of the two it is depends only on
/// whether an enclosing [`Quant`] node binds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
  /// An application `f e1 ... en` of an atom to arguments. With no arguments
  /// this is a variable or constant reference.
  App(AtomId, Vec<Term>),
  /// A conjunction `e1 ∧ e2`.
  And(Box<Term>, Box<Term>),
  /// An implication `e1 → e2`.
  Imp(Box<Term>, Box<Term>),
  /// A quantifier `∃ x, e` or `∀ x, e`, with an optional type annotation
  /// `∃ x : ty, e` on the bound variable.
  Quant(Quant, AtomId, Option<Box<Term>>, Box<Term>),
}

impl Term {
  /// A variable or constant reference.
  #[must_use]
  pub fn var(a: AtomId) -> Term { Term::App(a, vec![]) }

  /// A quantifier node with no type annotation.
  #[must_use]
  pub fn quant(q: Quant, v: AtomId, body: Term) -> Term { Term::Quant(q, v, None, Box::new(body)) }

  /// Collect the free atoms of this term into `fvs`. Since constants and
  /// variables are not distinguished, this collects every atom that is not
  /// bound by an enclosing quantifier, including application heads.
  pub fn free_vars(&self, fvs: &mut HashSet<AtomId>) {
    fn go(t: &Term, bound: &mut Vec<AtomId>, fvs: &mut HashSet<AtomId>) {
      match t {
        Term::App(a, es) => {
          if !bound.contains(a) {
            fvs.insert(*a);
          }
          for e in es {
            go(e, bound, fvs)
          }
        }
        Term::And(e1, e2) | Term::Imp(e1, e2) => {
          go(e1, bound, fvs);
          go(e2, bound, fvs)
        }
        Term::Quant(_, v, ty, e) => {
          if let Some(ty) = ty {
            go(ty, bound, fvs)
          }
          bound.push(*v);
          go(e, bound, fvs);
          bound.pop();
        }
      }
    }
    go(self, &mut vec![], fvs)
  }

  /// Substitute the terms `e1` and `e2` for the atoms `x1` and `x2`. This is
  /// purely syntactic: it is used to instantiate binder predicate templates,
  /// whose metavariables are validated at declaration time to occur only as
  /// argumentless, unbound atoms.
  #[must_use]
  pub fn subst(&self, x1: AtomId, e1: &Term, x2: AtomId, e2: &Term) -> Term {
    match self {
      Term::App(a, es) if *a == x1 && es.is_empty() => e1.clone(),
      Term::App(a, es) if *a == x2 && es.is_empty() => e2.clone(),
      Term::App(a, es) => Term::App(*a, es.iter().map(|e| e.subst(x1, e1, x2, e2)).collect()),
      Term::And(l, r) =>
        Term::And(Box::new(l.subst(x1, e1, x2, e2)), Box::new(r.subst(x1, e1, x2, e2))),
      Term::Imp(l, r) =>
        Term::Imp(Box::new(l.subst(x1, e1, x2, e2)), Box::new(r.subst(x1, e1, x2, e2))),
      Term::Quant(q, v, ty, e) => Term::Quant(
        *q,
        *v,
        ty.as_ref().map(|ty| Box::new(ty.subst(x1, e1, x2, e2))),
        Box::new(e.subst(x1, e1, x2, e2)),
      ),
    }
  }
}

/// The data associated to an atom.
#[derive(Debug, Default, Clone)]
pub struct AtomData {
  /// The string form of the atom.
  pub name: ArcString,
  /// The definition with this name, if one exists.
  pub def: Option<DefId>,
}

impl AtomData {
  fn new(name: ArcString) -> AtomData { AtomData { name, def: None } }
}

/// The infix/prefix notation provided by a `prefix`, `infixl` or `infixr`
/// declaration.
#[derive(Clone, Debug)]
pub struct NotaInfo {
  /// The declaration site of the notation.
  pub span: FileSpan,
  /// The constant that the notation applies.
  pub term: AtomId,
  /// The precedence of the token.
  pub prec: Prec,
  /// `None` for prefix notation; `Some(right)` for infix notation, where
  /// `right` is true for right-associative operators.
  pub rassoc: Option<bool>,
}

/// A registered binder predicate: the elaboration-time information derived
/// from a `binder_predicate` declaration.
///
/// A use site `∃ x tok e, body` selects the highest-priority entry for `tok`
/// and rewrites to `∃ x, T[x, e] ∧ body` where `T` is the template with `var`
/// and `operand` as its metavariables.
#[derive(Clone, Debug)]
pub struct BinderPred {
  /// The declaration site.
  pub span: FileSpan,
  /// The registry name (from the declaration, or derived from the token).
  pub name: AtomId,
  /// The priority of this pattern. (Patterns on the same token with distinct
  /// priorities coexist; the highest priority wins at use sites.)
  pub prec: Prec,
  /// The bound variable metavariable of the template.
  pub var: AtomId,
  /// The operand metavariable of the template.
  pub operand: AtomId,
  /// The template, a term over the two metavariables.
  pub template: Term,
}

/// A bitset of delimiter characters, used to split tokens in formulas.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Delims([u8; 32]);

impl Delims {
  /// Check if the given character is in the delimiter set.
  #[must_use]
  pub fn get(&self, c: u8) -> bool { self.0[(c >> 3) as usize] & (1 << (c & 7)) != 0 }
  /// Add a character to the delimiter set.
  pub fn set(&mut self, c: u8) { self.0[(c >> 3) as usize] |= 1 << (c & 7) }
  /// Iterate over the characters in the delimiter set.
  pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
    (0..=255).filter(move |&c| self.get(c))
  }
  /// Is the delimiter set empty?
  #[must_use]
  pub fn is_empty(&self) -> bool { self.0.iter().all(|&b| b == 0) }
}

/// An error produced by a redeclaration: the caller builds the message, and
/// `decl1` points at the previous declaration for a related-location note.
#[derive(Debug)]
pub struct Redeclaration {
  /// The location of the earlier declaration.
  pub decl1: FileSpan,
}

/// The parser-facing part of the environment: the tables that drive
/// tokenization and precedence parsing of formulas.
#[derive(Default, Clone)]
pub struct ParserEnv {
  /// The left delimiter set. A token boundary follows each of these
  /// characters, so a left delimiter at the start of a token stands alone.
  pub delims_l: Delims,
  /// The right delimiter set. A token boundary precedes each of these
  /// characters.
  pub delims_r: Delims,
  /// The set of declared constant tokens with their precedences. A token has
  /// exactly one precedence; redeclaration at the same precedence is allowed
  /// (and ignored).
  pub consts: HashMap<ArcString, (FileSpan, Prec)>,
  /// The prefix notations, keyed on the token.
  pub prefixes: HashMap<ArcString, NotaInfo>,
  /// The infix notations, keyed on the token.
  pub infixes: HashMap<ArcString, NotaInfo>,
  /// The binder predicate registry: for each pattern token, the declared
  /// predicates sorted by descending priority. Append-only.
  pub binder_preds: HashMap<ArcString, Vec<BinderPred>>,
  /// Inverse notation table: for each constant, the tokens that notate it
  /// (with an infix flag), used when printing.
  pub decl_nota: HashMap<AtomId, Vec<(ArcString, bool)>>,
}

impl ParserEnv {
  /// Add the characters in `ls` and `rs` as left and right delimiters.
  pub fn add_delimiters(&mut self, ls: &[u8], rs: &[u8]) {
    for &c in ls {
      self.delims_l.set(c)
    }
    for &c in rs {
      self.delims_r.set(c)
    }
  }

  /// Declare the constant token `tk` at precedence `p`. Declaring the same
  /// token twice is fine as long as the precedences agree.
  pub fn add_const(&mut self, tk: ArcString, sp: FileSpan, p: Prec) -> Result<(), Redeclaration> {
    if let Some((_, e)) = self.consts.try_insert_ext(tk, (sp, p)) {
      let (sp1, p1) = e.get();
      if *p1 != p {
        return Err(Redeclaration { decl1: sp1.clone() })
      }
    }
    Ok(())
  }

  /// Install a prefix notation on the token `tk`.
  pub fn add_prefix(&mut self, tk: ArcString, n: NotaInfo) -> Result<(), Redeclaration> {
    let term = n.term;
    if let Some((_, e)) = self.prefixes.try_insert_ext(tk.clone(), n) {
      return Err(Redeclaration { decl1: e.get().span.clone() })
    }
    self.decl_nota.entry(term).or_default().push((tk, false));
    Ok(())
  }

  /// Install an infix notation on the token `tk`.
  pub fn add_infix(&mut self, tk: ArcString, n: NotaInfo) -> Result<(), Redeclaration> {
    let term = n.term;
    if let Some((_, e)) = self.infixes.try_insert_ext(tk.clone(), n) {
      return Err(Redeclaration { decl1: e.get().span.clone() })
    }
    self.decl_nota.entry(term).or_default().push((tk, true));
    Ok(())
  }

  /// Register a binder predicate on the pattern token `tk`. Multiple
  /// predicates on the same token may coexist if their priorities differ; a
  /// second registration at the same priority is an error.
  pub fn add_binder_pred(&mut self, tk: ArcString, bp: BinderPred) -> Result<(), Redeclaration> {
    let v = self.binder_preds.entry(tk).or_default();
    if let Some(old) = v.iter().find(|old| old.prec == bp.prec) {
      return Err(Redeclaration { decl1: old.span.clone() })
    }
    let i = v.partition_point(|old| old.prec > bp.prec);
    v.insert(i, bp);
    Ok(())
  }

  /// Look up the binder predicate for a pattern token. When more than one
  /// predicate is registered on the token, the one with the highest priority
  /// is returned.
  #[must_use]
  pub fn binder_pred(&self, tk: &[u8]) -> Option<&BinderPred> {
    self.binder_preds.get(tk)?.first()
  }
}

/// A statement trace entry, recording the order of declarations for the
/// exporter.
#[derive(Clone, Debug)]
pub enum StmtTrace {
  /// A `prefix`/`infixl`/`infixr` declaration on the given token; true if
  /// infix.
  Nota(ArcString, bool),
  /// A `def` declaration.
  Def(DefId),
}

/// An elaborated definition.
#[derive(Clone, Debug)]
pub struct Def {
  /// The name of the definition.
  pub atom: AtomId,
  /// The declaration site.
  pub span: FileSpan,
  /// The fully expanded value.
  pub val: Term,
}

/// The elaboration environment, the result of elaborating a file: the interned
/// atoms, the definitions, and the notation tables.
#[derive(Default)]
pub struct Environment {
  /// The atom table, mapping names to atoms.
  pub atoms: HashMap<ArcString, AtomId>,
  /// The atom data, indexed by atom.
  pub data: AtomVec<AtomData>,
  /// The definitions, in declaration order.
  pub defs: DefVec<Def>,
  /// The statement trace, recording declaration order for export.
  pub stmts: Vec<StmtTrace>,
  /// The notation tables.
  pub pe: ParserEnv,
}

impl Environment {
  /// Construct a fresh environment.
  #[must_use]
  pub fn new() -> Environment { Environment::default() }

  /// Intern a string, returning the atom it names. Creates a new atom if the
  /// string has not been seen before.
  pub fn get_atom(&mut self, s: &str) -> AtomId {
    match self.atoms.get(s.as_bytes()) {
      Some(&a) => a,
      None => {
        let id = AtomId(u32::try_from(self.data.len()).expect("too many atoms"));
        let s: ArcString = s.into();
        self.atoms.insert(s.clone(), id);
        self.data.push(AtomData::new(s));
        id
      }
    }
  }

  /// Add a definition for the atom `a`. Fails if `a` already has one.
  pub fn add_def(&mut self, atom: AtomId, span: FileSpan, val: Term) -> Result<DefId, Redeclaration> {
    if let Some(d) = self.data[atom].def {
      return Err(Redeclaration { decl1: self.defs[d].span.clone() })
    }
    let id = DefId(u32::try_from(self.defs.len()).expect("too many defs"));
    self.data[atom].def = Some(id);
    self.defs.push(Def { atom, span, val });
    self.stmts.push(StmtTrace::Def(id));
    Ok(id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bp(name: u32, prec: u32) -> BinderPred {
    BinderPred {
      span: FileSpan::default(),
      name: AtomId(name),
      prec: Prec::Prec(prec),
      var: AtomId(100),
      operand: AtomId(101),
      template: Term::var(AtomId(100)),
    }
  }

  #[test]
  fn binder_pred_priorities() {
    let mut pe = ParserEnv::default();
    pe.add_binder_pred("<".into(), bp(0, 50)).expect("first");
    pe.add_binder_pred("<".into(), bp(1, 60)).expect("distinct priority");
    assert_eq!(pe.binder_pred(b"<").expect("registered").name, AtomId(1));
    assert!(pe.add_binder_pred("<".into(), bp(2, 60)).is_err());
    assert!(pe.binder_pred(b">").is_none());
  }

  #[test]
  fn const_redeclaration() {
    let mut pe = ParserEnv::default();
    pe.add_const("+".into(), FileSpan::default(), Prec::Prec(65)).expect("new");
    pe.add_const("+".into(), FileSpan::default(), Prec::Prec(65)).expect("same prec is fine");
    assert!(pe.add_const("+".into(), FileSpan::default(), Prec::Prec(64)).is_err());
  }

  #[test]
  fn free_vars_scoping() {
    // ∀ x, P x y has free atoms {∀-bound x excluded} = {P, y}
    let (x, y, p) = (AtomId(0), AtomId(1), AtomId(2));
    let t = Term::quant(Quant::Forall, x, Term::App(p, vec![Term::var(x), Term::var(y)]));
    let mut fvs = HashSet::new();
    t.free_vars(&mut fvs);
    assert!(!fvs.contains(&x));
    assert!(fvs.contains(&y));
    assert!(fvs.contains(&p));
  }

  #[test]
  fn subst_metavars() {
    // (x > y)[x := a, y := f b] = a > f b
    let (x, y, gt, a, f, b) = (AtomId(0), AtomId(1), AtomId(2), AtomId(3), AtomId(4), AtomId(5));
    let template = Term::App(gt, vec![Term::var(x), Term::var(y)]);
    let e2 = Term::App(f, vec![Term::var(b)]);
    let out = template.subst(x, &Term::var(a), y, &e2);
    assert_eq!(out, Term::App(gt, vec![Term::var(a), e2]));
  }
}

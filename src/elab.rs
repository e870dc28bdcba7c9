//! The elaborator, which applies parsed statements to the environment in
//! order: installing delimiters and notations, registering binder predicates,
//! expanding extended binder notation in definitions, and reporting `show`
//! suggestions.

pub mod environment;
pub mod math_parser;
pub mod expand;
pub mod print;
pub mod pretty;

use crate::parser::ast::{
  BinderPred as ABinderPred, Def as ADef, Delimiter, Formula, Prec, SimpleNota, SimpleNotaKind,
  Stmt, StmtKind, AST,
};
use crate::parser::ParseError;
pub use crate::parser::ErrorLevel;
use crate::util::{ArcString, AtomId, BoxError, FileRef, FileSpan, Span};
use environment::{BinderPred, Environment, NotaInfo, StmtTrace, Term};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// The payload of an elaboration error.
#[derive(Debug)]
pub enum ElabErrorKind {
  /// A boxed error, with an optional list of related locations and messages.
  Boxed(BoxError, Option<Vec<(FileSpan, BoxError)>>),
}

impl ElabErrorKind {
  /// The main message of the error.
  #[must_use]
  pub fn msg(&self) -> String {
    match self {
      ElabErrorKind::Boxed(e, _) => format!("{e}"),
    }
  }
}

impl From<BoxError> for ElabErrorKind {
  fn from(e: BoxError) -> ElabErrorKind { ElabErrorKind::Boxed(e, None) }
}

/// An error during elaboration, with a position in the file being elaborated.
#[derive(Debug)]
pub struct ElabError {
  /// The location of the error.
  pub pos: Span,
  /// The severity of the error.
  pub level: ErrorLevel,
  /// The payload of the error.
  pub kind: ElabErrorKind,
}

/// The main result type used by the elaborator.
pub type Result<T> = std::result::Result<T, ElabError>;

impl ElabError {
  /// Construct an error-level elaboration error.
  pub fn new(pos: impl Into<Span>, kind: ElabErrorKind) -> ElabError {
    ElabError { pos: pos.into(), level: ErrorLevel::Error, kind }
  }

  /// Construct an elaboration error from a message.
  pub fn new_e(pos: impl Into<Span>, e: impl Into<BoxError>) -> ElabError {
    ElabError::new(pos, ElabErrorKind::Boxed(e.into(), None))
  }

  /// Construct an elaboration error from a message and a list of related
  /// locations and messages, shown as notes under the main diagnostic.
  pub fn with_info(pos: impl Into<Span>, msg: BoxError, v: Vec<(FileSpan, BoxError)>) -> ElabError {
    ElabError::new(pos, ElabErrorKind::Boxed(msg, Some(v)))
  }

  /// Construct a warning.
  pub fn warn(pos: impl Into<Span>, e: impl Into<BoxError>) -> ElabError {
    ElabError { pos: pos.into(), level: ErrorLevel::Warning, kind: ElabErrorKind::Boxed(e.into(), None) }
  }

  /// Construct an info message. (This is how `show` reports its expansions.)
  pub fn info(pos: impl Into<Span>, e: impl Into<BoxError>) -> ElabError {
    ElabError { pos: pos.into(), level: ErrorLevel::Info, kind: ElabErrorKind::Boxed(e.into(), None) }
  }
}

impl From<ParseError> for ElabError {
  fn from(e: ParseError) -> Self {
    ElabError { pos: e.pos, level: e.level, kind: ElabErrorKind::Boxed(e.msg, None) }
  }
}

/// Tokens with built-in meaning in formulas. Notations and binder predicates
/// cannot be declared on these.
const RESERVED_TOKENS: [&str; 12] =
  ["(", ")", ",", ":", "∃", "∀", "∃ᵉ", "∀ᵉ", "∧", "→", "_", "=>"];

const PP_WIDTH: usize = 80;

/// The elaborator, which holds the input [`AST`] and the [`Environment`]
/// under construction.
pub struct Elaborator {
  ast: Arc<AST>,
  path: FileRef,
  errors: Vec<ElabError>,
  env: Environment,
}

impl Deref for Elaborator {
  type Target = Environment;
  fn deref(&self) -> &Environment { &self.env }
}
impl DerefMut for Elaborator {
  fn deref_mut(&mut self) -> &mut Environment { &mut self.env }
}

impl Elaborator {
  /// Construct a new elaborator from a parsed [`AST`], with an empty
  /// environment.
  #[must_use]
  pub fn new(ast: Arc<AST>, path: FileRef) -> Elaborator {
    Elaborator { ast, path, errors: Vec::new(), env: Environment::new() }
  }

  fn span(&self, s: Span) -> &str { self.ast.span(s) }
  fn fspan(&self, span: Span) -> FileSpan { FileSpan { file: self.path.clone(), span } }
  fn report(&mut self, e: ElabError) { self.errors.push(e) }
  fn catch(&mut self, r: Result<()>) { r.unwrap_or_else(|e| self.report(e)) }

  fn check_token(&self, tk: Span) -> Result<ArcString> {
    let s = self.span(tk);
    if RESERVED_TOKENS.contains(&s) {
      return Err(ElabError::new_e(tk, format!("token '{s}' is reserved")))
    }
    Ok(s.into())
  }

  fn add_const(&mut self, tk: Span, s: ArcString, p: Prec) -> Result<()> {
    let fsp = self.fspan(tk);
    self.env.pe.add_const(s, fsp, p).map_err(|r| ElabError::with_info(tk,
      "constant already declared with a different precedence".into(),
      vec![(r.decl1, "declared here".into())]))
  }

  fn elab_simple_nota(&mut self, n: &SimpleNota) -> Result<()> {
    let a = self.env.get_atom(self.ast.span(n.id));
    let tk = self.check_token(n.c.trim)?;
    let (rassoc, infix) = match n.k {
      SimpleNotaKind::Prefix => (None, false),
      SimpleNotaKind::Infix { right } => {
        if n.prec == Prec::Max {
          return Err(ElabError::new_e(n.id, "max prec not allowed for infix"))
        }
        (Some(right), true)
      }
    };
    self.add_const(n.c.trim, tk.clone(), n.prec)?;
    let info = NotaInfo { span: self.fspan(n.id), term: a, prec: n.prec, rassoc };
    match n.k {
      SimpleNotaKind::Prefix => self.pe.add_prefix(tk.clone(), info),
      SimpleNotaKind::Infix { .. } => self.pe.add_infix(tk.clone(), info),
    }
    .map_err(|r| ElabError::with_info(n.id,
      format!("constant '{tk}' already declared").into(),
      vec![(r.decl1, "declared here".into())]))?;
    self.env.stmts.push(StmtTrace::Nota(tk, infix));
    Ok(())
  }

  /// Check that the metavariable `m` occurs in the template `t` only as an
  /// atom, applied to no arguments and not bound by any quantifier. `used` is
  /// set if at least one occurrence was found.
  fn check_metavar(&self, sp: Span, t: &Term, m: AtomId, used: &mut bool) -> Result<()> {
    match t {
      Term::App(a, es) => {
        if *a == m {
          *used = true;
          if !es.is_empty() {
            return Err(ElabError::new_e(sp, format!(
              "metavariable '{}' cannot be applied to arguments", self.data[m].name)))
          }
        }
        for e in es {
          self.check_metavar(sp, e, m, used)?
        }
        Ok(())
      }
      Term::And(e1, e2) | Term::Imp(e1, e2) => {
        self.check_metavar(sp, e1, m, used)?;
        self.check_metavar(sp, e2, m, used)
      }
      Term::Quant(_, v, ty, e) => {
        if *v == m {
          return Err(ElabError::new_e(sp, format!(
            "metavariable '{}' cannot be bound in the template", self.data[m].name)))
        }
        if let Some(ty) = ty {
          self.check_metavar(sp, ty, m, used)?
        }
        self.check_metavar(sp, e, m, used)
      }
    }
  }

  fn elab_binder_pred(&mut self, n: &ABinderPred) -> Result<()> {
    let tk = self.check_token(n.c.trim)?;
    if n.prec == Prec::Max {
      return Err(ElabError::new_e(n.c.trim, "max prec not allowed for binder predicates"))
    }
    let name = match n.id {
      Some(id) => self.env.get_atom(self.ast.span(id)),
      None => self.env.get_atom(self.ast.span(n.c.trim)),
    };
    let var = self.env.get_atom(self.ast.span(n.var));
    let operand = self.env.get_atom(self.ast.span(n.operand));
    if var == operand {
      return Err(ElabError::new_e(n.operand, "the two metavariables must be distinct"))
    }
    let qe = self.parse_formula(n.val)?;
    let template = self.elab_qexpr(&qe)?;
    for (sp, m) in [(n.var, var), (n.operand, operand)] {
      let mut used = false;
      self.check_metavar(sp, &template, m, &mut used)?;
      if !used {
        return Err(ElabError::new_e(sp, format!(
          "metavariable '{}' not used in the template", self.data[m].name)))
      }
    }
    let bp = BinderPred { span: self.fspan(n.c.trim), name, prec: n.prec, var, operand, template };
    self.pe.add_binder_pred(tk.clone(), bp).map_err(|r| ElabError::with_info(n.c.trim,
      format!("binder predicate '{tk}' already declared at this priority").into(),
      vec![(r.decl1, "declared here".into())]))
  }

  fn elab_def(&mut self, d: &ADef) -> Result<()> {
    let a = self.env.get_atom(self.ast.span(d.id));
    let qe = self.parse_formula(d.val)?;
    let val = self.elab_qexpr(&qe)?;
    let fsp = self.fspan(d.id);
    self.env.add_def(a, fsp, val).map_err(|r| ElabError::with_info(d.id,
      format!("definition '{}' already declared", self.data[a].name).into(),
      vec![(r.decl1, "declared here".into())]))?;
    Ok(())
  }

  fn elab_show(&mut self, f: Formula) -> Result<()> {
    let qe = self.parse_formula(f)?;
    let t = self.elab_qexpr(&qe)?;
    let msg = format!("Try this: {}", self.format_env().pp(&t, PP_WIDTH));
    self.report(ElabError::info(f.0, msg));
    Ok(())
  }

  fn elab_stmt(&mut self, stmt: &Stmt) -> Result<()> {
    match &stmt.k {
      StmtKind::Delimiter(Delimiter::Both(f)) => self.pe.add_delimiters(f, f),
      StmtKind::Delimiter(Delimiter::LeftRight(ls, rs)) => self.pe.add_delimiters(ls, rs),
      StmtKind::SimpleNota(n) => self.elab_simple_nota(n)?,
      StmtKind::BinderPred(n) => self.elab_binder_pred(n)?,
      StmtKind::Def(d) => self.elab_def(d)?,
      &StmtKind::Show(f) => self.elab_show(f)?,
    }
    Ok(())
  }
}

/// Elaborate a parsed file. Returns the accumulated diagnostics and the
/// resulting environment; an environment is produced even in the presence of
/// errors, containing the statements that did elaborate.
#[must_use]
pub fn elaborate(ast: &Arc<AST>, path: FileRef) -> (Vec<ElabError>, Environment) {
  let mut elab = Elaborator::new(ast.clone(), path);
  for s in &ast.stmts {
    let r = elab.elab_stmt(s);
    elab.catch(r)
  }
  (elab.errors, elab.env)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::util::DefId;
  use environment::Quant;
  use std::path::PathBuf;

  fn elab(src: &str) -> (Vec<ElabError>, Environment) {
    let ast = Arc::new(parse(Arc::new(src.to_owned().into())));
    assert!(ast.errors.is_empty(), "unexpected parse errors: {:?}", ast.errors);
    elaborate(&ast, FileRef::from(PathBuf::from("test.eb")))
  }

  fn elab_ok(src: &str) -> Environment {
    let (errors, env) = elab(src);
    let msgs: Vec<_> =
      errors.iter().filter(|e| e.level == ErrorLevel::Error).map(|e| e.kind.msg()).collect();
    assert!(msgs.is_empty(), "unexpected errors: {msgs:?}");
    env
  }

  fn errs(src: &str) -> Vec<String> {
    let (errors, _) = elab(src);
    errors.iter().filter(|e| e.level == ErrorLevel::Error).map(|e| e.kind.msg()).collect()
  }

  const PRELUDE: &str = "\
delimiter $ ( ) , $;
infixl lt: $<$ prec 50;
infixl gt: $>$ prec 50;
binder_predicate lt: x $<$ y prec 50 => $ x < y $;
binder_predicate gt: x $>$ y prec 50 => $ x > y $;
";

  /// Elaborate two `def`s after the standard prelude and check that they
  /// produce the same term.
  fn defs_eq(src: &str) {
    let env = elab_ok(&format!("{PRELUDE}{src}"));
    assert_eq!(env.defs.len(), 2);
    assert_eq!(env.defs[DefId(0)].val, env.defs[DefId(1)].val);
  }

  #[test]
  fn predicated_exists_matches_primitive_form() {
    defs_eq("def a: $ ∃ x > 0, P x $;\ndef b: $ ∃ x, x > 0 ∧ P x $;");
  }

  #[test]
  fn predicated_forall_matches_primitive_form() {
    defs_eq("def a: $ ∀ x > 0, P x $;\ndef b: $ ∀ x, x > 0 → P x $;");
  }

  #[test]
  fn collection_expands_to_nested_quantifiers() {
    defs_eq(
      "def a: $ ∃ᵉ (x < 2) (y : Nat) (z), Q x y z $;\n\
       def b: $ ∃ x, x < 2 ∧ ∃ y : Nat, ∃ z, Q x y z $;",
    );
  }

  #[test]
  fn empty_collection_is_identity() {
    defs_eq("def a: $ ∀ᵉ, S $;\ndef b: $ S $;");
  }

  #[test]
  fn typed_binder_survives_expansion() {
    let env = elab_ok(&format!("{PRELUDE}def a: $ ∃ x : Nat, P x $;"));
    match &env.defs[DefId(0)].val {
      Term::Quant(Quant::Exists, _, Some(ty), _) => {
        assert!(matches!(**ty, Term::App(a, ref es) if es.is_empty() && &*env.data[a].name == b"Nat"))
      }
      t => panic!("expected a typed quantifier, got {t:?}"),
    }
  }

  #[test]
  fn wildcard_picks_fresh_name() {
    defs_eq("def a: $ ∃ _ > 0, Q $;\ndef b: $ ∃ x, x > 0 ∧ Q $;");
  }

  #[test]
  fn wildcard_shifts_past_captured_name() {
    defs_eq("def a: $ ∀ _, P x $;\ndef b: $ ∀ x1, P x $;");
  }

  #[test]
  fn higher_priority_pattern_wins() {
    let env = elab_ok(
      "delimiter $ ( ) , $;\n\
       binder_predicate low: x $◁$ y prec 20 => $ lo x y $;\n\
       binder_predicate high: x $◁$ y prec 30 => $ hi x y $;\n\
       def a: $ ∃ x ◁ 2, P $;\n\
       def b: $ ∃ x, hi x 2 ∧ P $;",
    );
    assert_eq!(env.defs[DefId(0)].val, env.defs[DefId(1)].val);
  }

  #[test]
  fn duplicate_priority_rejected() {
    let es = errs(
      "delimiter $ ( ) , $;\n\
       binder_predicate a: x $◁$ y prec 20 => $ lo x y $;\n\
       binder_predicate b: x $◁$ y prec 20 => $ hi x y $;",
    );
    assert_eq!(es.len(), 1);
    assert!(es[0].contains("already declared at this priority"), "{}", es[0]);
  }

  #[test]
  fn reserved_token_rejected() {
    assert_eq!(errs("infixl and: $∧$ prec 35;"), ["token '∧' is reserved"]);
    assert_eq!(
      errs("binder_predicate p: x $:$ y prec 10 => $ mem x y $;"),
      ["token ':' is reserved"]
    );
  }

  #[test]
  fn metavariable_must_be_used() {
    let es = errs("binder_predicate p: x $◁$ y prec 10 => $ x $;");
    assert_eq!(es, ["metavariable 'y' not used in the template"]);
  }

  #[test]
  fn metavariable_cannot_be_bound() {
    let es = errs(
      "delimiter $ ( ) , $;\nbinder_predicate p: x $◁$ y prec 10 => $ ∃ x, mem x y $;",
    );
    assert_eq!(es, ["metavariable 'x' cannot be bound in the template"]);
  }

  #[test]
  fn metavariable_cannot_be_applied() {
    let es = errs("binder_predicate p: x $◁$ y prec 10 => $ x y $;");
    assert_eq!(es, ["metavariable 'x' cannot be applied to arguments"]);
  }

  #[test]
  fn metavariables_must_be_distinct() {
    let es = errs("binder_predicate p: x $◁$ x prec 10 => $ x $;");
    assert_eq!(es, ["the two metavariables must be distinct"]);
  }

  #[test]
  fn max_prec_rejected() {
    assert_eq!(errs("infixl f: $+$ prec max;"), ["max prec not allowed for infix"]);
    assert_eq!(
      errs("binder_predicate p: x $◁$ y prec max => $ mem x y $;"),
      ["max prec not allowed for binder predicates"]
    );
  }

  #[test]
  fn max_prec_prefix_allowed() {
    elab_ok("prefix f: $!$ prec max;");
  }

  #[test]
  fn duplicate_def_rejected() {
    let es = errs("def a: $ x $;\ndef a: $ y $;");
    assert_eq!(es, ["definition 'a' already declared"]);
  }

  #[test]
  fn duplicate_infix_rejected() {
    let es = errs("infixl a: $+$ prec 65;\ninfixl b: $+$ prec 65;");
    assert_eq!(es, ["constant '+' already declared"]);
  }

  #[test]
  fn const_prec_mismatch_rejected() {
    let es = errs("prefix neg: $-$ prec 100;\ninfixl sub: $-$ prec 64;");
    assert_eq!(es, ["constant already declared with a different precedence"]);
  }

  #[test]
  fn prefix_and_infix_share_token() {
    let env = elab_ok(
      "prefix neg: $-$ prec 64;\n\
       infixl sub: $-$ prec 64;\n\
       def a: $ - 1 $;\n\
       def b: $ 1 - 2 $;",
    );
    assert_eq!(env.defs.len(), 2);
  }

  #[test]
  fn unregistered_pattern_rejected() {
    let es = errs("delimiter $ ( ) , $;\ndef a: $ ∃ x ⊰ 2, P $;");
    assert_eq!(es.len(), 1);
  }

  #[test]
  fn elaboration_continues_after_errors() {
    let (errors, env) = elab("infixl f: $∧$ prec 35;\ndef a: $ x $;");
    assert_eq!(errors.len(), 1);
    assert_eq!(env.defs.len(), 1);
  }

  #[test]
  fn show_reports_expansion() {
    let (errors, _) = elab(&format!("{PRELUDE}show $ ∃ x > 0, P x $;"));
    let info: Vec<_> = errors.iter().filter(|e| e.level == ErrorLevel::Info).collect();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].kind.msg(), "Try this: $ ∃ x, x > 0 ∧ P x $");
  }

  #[test]
  fn show_suggestion_round_trips() {
    let orig = "def orig: $ ∃ᵉ (x < 2) (_ : T), P x ∧ Q $;";
    let (errors, _) = elab(&format!("{PRELUDE}{orig}\nshow $ ∃ᵉ (x < 2) (_ : T), P x ∧ Q $;"));
    let msg = errors.iter().find(|e| e.level == ErrorLevel::Info)
      .expect("expected a show report").kind.msg();
    let sugg = msg.strip_prefix("Try this: ").expect("expected a suggestion");
    let env = elab_ok(&format!("{PRELUDE}{orig}\ndef round: {sugg};"));
    assert_eq!(env.defs[DefId(0)].val, env.defs[DefId(1)].val);
  }
}

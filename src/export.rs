//! The `.eb` exporter, which writes the elaborated statements of an
//! [`Environment`](crate::Environment) object back out as `.eb` source text.
//!
//! The output contains no extended binders: definitions are printed from their
//! expanded terms, so the result elaborates to the same definitions using only
//! the primitive quantifier forms.
use std::io::{self, Write};
use itertools::Itertools;
use crate::elab::environment::{Environment, StmtTrace};
use crate::elab::print::FormatEnv;
use crate::lined_string::LinedString;

/// The target width for pretty-printed definition bodies.
const PP_WIDTH: usize = 80;

impl Environment {
  /// Write the elaborated statements as `.eb` source.
  ///
  /// Delimiters come first, so that the rest of the output tokenizes the same
  /// way it did at elaboration time, followed by the notations and definitions
  /// in declaration order. Binder predicate declarations are not written:
  /// the definitions are already expanded, so nothing in the output needs them.
  pub fn export(&self, source: &LinedString, mut w: impl Write) -> io::Result<()> {
    let w = &mut w;
    let fe = FormatEnv { source, env: self };
    let (dl, dr) = (&self.pe.delims_l, &self.pe.delims_r);
    if dl == dr {
      if !dl.is_empty() {
        writeln!(w, "delimiter $ {} $;", dl.iter().map(char::from).format(" "))?
      }
    } else {
      writeln!(w, "delimiter $ {} $ $ {} $;",
        dl.iter().map(char::from).format(" "),
        dr.iter().map(char::from).format(" "))?
    }
    for s in &self.stmts {
      match s {
        StmtTrace::Nota(tk, infix) => {
          let info = if *infix { &self.pe.infixes[tk] } else { &self.pe.prefixes[tk] };
          let kw = match info.rassoc {
            None => "prefix",
            Some(false) => "infixl",
            Some(true) => "infixr",
          };
          writeln!(w, "{} {}: ${}$ prec {};", kw, self.data[info.term].name, tk, info.prec)?
        }
        &StmtTrace::Def(i) => {
          let d = &self.defs[i];
          writeln!(w, "def {}: {};", self.data[d.atom].name, fe.pp(&d.val, PP_WIDTH))?
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;
  use std::sync::Arc;
  use crate::elab::elaborate;
  use crate::parser::{parse, ErrorLevel};
  use crate::util::FileRef;

  fn elab_export(src: &str) -> String {
    let ast = Arc::new(parse(Arc::new(src.to_owned().into())));
    assert!(ast.errors.is_empty(), "parse errors: {:?}", ast.errors);
    let (errors, env) = elaborate(&ast, FileRef::from(PathBuf::from("test.eb")));
    assert!(
      errors.iter().all(|e| e.level != ErrorLevel::Error),
      "elab errors: {:?}",
      errors.iter().map(|e| e.kind.msg()).collect::<Vec<_>>()
    );
    let mut out = Vec::new();
    env.export(&ast.source, &mut out).expect("export failed");
    String::from_utf8(out).expect("export produced invalid utf8")
  }

  #[test]
  fn export_expands_extended_binders() {
    let s1 = elab_export(
      "delimiter $ ( ) , $;\n\
       infixl lt: $<$ prec 50;\n\
       binder_predicate ltp: x $<$ v prec 50 => $ x < v $;\n\
       def ex: $ ∃ᵉ (x < 2) (y : Nat), x < y $;\n",
    );
    assert!(!s1.contains("∃ᵉ"), "extended binder in output: {s1}");
    assert!(!s1.contains("binder_predicate"), "binder predicate in output: {s1}");
    assert!(s1.contains("def ex: $ ∃ x, x < 2 ∧ (∃ y : Nat, x < y) $;"), "{s1}");
    // the output elaborates to the same statements, so a second pass is stable
    assert_eq!(s1, elab_export(&s1));
  }

  #[test]
  fn export_preserves_notations() {
    let s1 = elab_export(
      "delimiter $ ( ) , $;\n\
       infixr arr: $->$ prec 30;\n\
       prefix neg: $~$ prec max;\n\
       def a: $ arr b (neg c) $;\n",
    );
    assert!(s1.contains("infixr arr: $->$ prec 30;"), "{s1}");
    assert!(s1.contains("prefix neg: $~$ prec max;"), "{s1}");
    assert!(s1.contains("def a: $ b -> ~ c $;"), "{s1}");
    assert_eq!(s1, elab_export(&s1));
  }

  #[test]
  fn export_splits_one_sided_delimiters() {
    let s1 = elab_export("delimiter $ ( , $ $ ) , $;\ndef a: $ b $;\n");
    assert!(s1.starts_with("delimiter $ ( , $ $ ) , $;\n"), "{s1}");
    assert_eq!(s1, elab_export(&s1));
  }

  #[test]
  fn export_of_empty_environment_is_empty() {
    assert_eq!(elab_export(""), "");
  }
}

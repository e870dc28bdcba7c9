//! The standalone (command line) compiler interface.
//!
//! The compiler parses and elaborates a single `.eb` file, reporting
//! diagnostics as Rust-style errors using the [`annotate_snippets`] crate.
//! If an output file is requested, the elaborated statements are written back
//! out as plain `.eb` source, with all extended binders expanded away.
use std::{fs, io};
use std::sync::Arc;
use annotate_snippets::{
  snippet::{Snippet, Annotation, AnnotationType, SourceAnnotation, Slice},
  display_list::{DisplayList, FormatOptions}};
use typed_arena::Arena;
use crate::elab::{elaborate, ElabError, ElabErrorKind};
use crate::parser::{parse, ParseError, ErrorLevel};
use crate::lined_string::LinedString;
use crate::util::{FileRef, FileSpan, Span, Position, Range};

impl ElabErrorKind {
  /// Convert the payload of an elaboration error to the footer data
  /// of a [`Snippet`].
  ///
  /// # Parameters
  ///
  /// - `arena`: A temporary [`typed_arena::Arena`] for storing [`String`]s that are
  ///   allocated for the snippet
  /// - `to_range`: a function for converting (index-based) spans to (line/col) ranges
  pub fn to_footer<'a>(&self, arena: &'a Arena<String>,
      mut to_range: impl FnMut(&FileSpan) -> Range) -> Vec<Annotation<'a>> {
    match self {
      ElabErrorKind::Boxed(_, Some(info)) =>
        info.iter().map(|(fs, e)| Annotation {
          id: None,
          label: Some(arena.alloc({
            let Range {start, ..} = to_range(fs);
            format!("{}:{}:{}: {}", fs.file.rel(), start.line + 1, start.character + 1, e)
          })),
          annotation_type: AnnotationType::Note,
        }).collect(),
      _ => vec![]
    }
  }
}

/// Create a [`Snippet`] from a message.
///
/// # Parameters
///
/// - `path`: The file that sourced the error
/// - `file`: The file contents
/// - `pos`: The position of the error
/// - `msg`: The error message
/// - `level`: The error level
/// - `footer`: The snippet footer (calculated by [`ElabErrorKind::to_footer`])
fn make_snippet<'a>(path: &'a FileRef, file: &'a LinedString, pos: Span,
    msg: &'a str, level: ErrorLevel, footer: Vec<Annotation<'a>>) -> Snippet<'a> {
  let annotation_type = level.to_annotation_type();
  let Range {start, end} = file.to_range(pos);
  let start2 = file.to_idx(Position {line: start.line, character: 0}).unwrap_or(0);
  let end2 = file.to_idx(Position {line: end.line + 1, character: 0})
    .unwrap_or_else(|| file.len());
  Snippet {
    title: Some(Annotation {
      id: None,
      label: Some(msg),
      annotation_type,
    }),
    slices: vec![Slice {
      source: file.str_at((start2..end2).into()),
      line_start: start.line as usize + 1,
      origin: Some(path.rel()),
      fold: end.line - start.line >= 5,
      annotations: vec![SourceAnnotation {
        range: (pos.start - start2, pos.end - start2),
        label: "",
        annotation_type,
      }],
    }],
    footer,
    opt: FormatOptions { color: true, anonymized_line_numbers: false, margin: None }
  }
}

impl ElabError {
  /// Create a [`Snippet`] from this error.
  ///
  /// Because [`Snippet`] does not own its data, it is sometimes necessary to call
  /// functions on the snippet before the borrowed data expires, so this function
  /// is in CPS form, calling `f` with the constructed snippet.
  fn to_snippet<T>(&self, path: &FileRef, file: &LinedString,
      to_range: impl FnMut(&FileSpan) -> Range,
      f: impl for<'a> FnOnce(Snippet<'a>) -> T) -> T {
    f(make_snippet(path, file, self.pos, &self.kind.msg(), self.level,
      self.kind.to_footer(&Arena::new(), to_range)))
  }
}

impl ParseError {
  /// Create a [`Snippet`] from this error. See [`ElabError::to_snippet`] for
  /// information about the CPS form.
  fn to_snippet<T>(&self, path: &FileRef, file: &LinedString,
      f: impl for<'a> FnOnce(Snippet<'a>) -> T) -> T {
    f(make_snippet(path, file, self.pos, &format!("{}", self.msg), self.level, vec![]))
  }
}

/// Elaborate a `.eb` file and report the results.
#[derive(clap::Args, Debug, Default)]
pub struct Args {
  /// Sets the input file (.eb)
  pub input: String,
  /// Sets the output file, or stdout if `-`. The input is only checked if
  /// this argument is omitted
  pub output: Option<String>,
}

impl Args {
  /// Main entry point for `eb-rs <in.eb> [out.eb]`.
  ///
  /// # Arguments
  ///
  /// - `in.eb` is the file to elaborate
  /// - `out.eb` is the file to write the elaborated statements to, if the
  ///   elaboration is successful. If it is `-` the statements go to stdout
  ///   instead, and if it is omitted the input is only elaborated.
  pub fn main(self) -> io::Result<()> {
    let path: FileRef = fs::canonicalize(&self.input)?.into();
    let file = Arc::new(LinedString::from(fs::read_to_string(path.path())?));
    log::info!("parsing {path}");
    let ast = Arc::new(parse(file));
    let mut failed = false;
    for e in &ast.errors {
      failed |= e.level == ErrorLevel::Error;
      e.to_snippet(&path, &ast.source,
        |s| println!("{}\n", DisplayList::from(s).to_string()));
    }
    log::info!("elaborating {path}");
    let (errors, env) = elaborate(&ast, path.clone());
    for e in &errors {
      failed |= e.level == ErrorLevel::Error;
      e.to_snippet(&path, &ast.source, |fsp| ast.source.to_range(fsp.span),
        |s| println!("{}\n", DisplayList::from(s).to_string()));
    }
    if failed { std::process::exit(1) }
    if let Some(out) = &self.output {
      use {fs::File, io::BufWriter};
      log::info!("writing {out}");
      if out == "-" {
        env.export(&ast.source, io::stdout())?;
      } else {
        env.export(&ast.source, BufWriter::new(File::create(out)?))?;
      }
    }
    Ok(())
  }
}

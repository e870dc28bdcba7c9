use std::io;
use crate::compiler;

fn compile_eb(file: &str) -> io::Result<()> {
  compiler::Args { input: format!("demos/{file}.eb"), ..<_>::default() }.main()
}

#[test] fn peano() -> io::Result<()> { compile_eb("peano") }
#[test] fn sets() -> io::Result<()> { compile_eb("sets") }
#[test] fn wildcards() -> io::Result<()> { compile_eb("wildcards") }

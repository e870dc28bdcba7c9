use clap::Parser;

/// Elaborate `.eb` files, expanding extended binder notation.
#[derive(Parser, Debug)]
#[clap(name = "eb-rs", version, about = "Extended binder notation elaborator")]
struct Cli {
  /// Print elaboration progress to stderr (repeat for more detail)
  #[clap(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
  #[clap(flatten)]
  args: eb_rs::compiler::Args,
}

fn main() -> std::io::Result<()> {
  let cli = Cli::parse();
  {
    use simplelog::*;
    let level = match cli.verbose {
      0 => LevelFilter::Warn,
      1 => LevelFilter::Info,
      _ => LevelFilter::Debug,
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
  }
  cli.args.main()
}

use bookpress::exec::ProcessRunner;
use bookpress::{config, output, serve, tasks, watch};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookpress")]
#[command(about = "Multi-format book builder driving pandoc")]
#[command(long_about = "\
Multi-format book builder driving pandoc

Your filesystem is the data source. An ordered list of Markdown fragments
plus a metadata file become one logical document, rendered to HTML, PDF,
EPUB, and JSON. Fragment order in book.toml is chapter order in every
rendition.

Source structure:

  book/
  ├── book.toml                    # Build config (optional, defaults shown by gen-config)
  ├── metadata.yaml                # Pandoc metadata (title, author, language)
  ├── chapters/
  │   ├── 01-intro.md              # Fragments, concatenated in book.toml order
  │   └── 02-basics.md
  ├── templates/
  │   ├── book.html                # HTML template
  │   └── book.tex                 # LaTeX template for the PDF rendition
  ├── filters/                     # Pandoc filter executables
  │   ├── tables.py
  │   ├── callouts.py
  │   └── columns.py
  ├── styles/
  │   └── book.scss                # SCSS entry point, compiled and inlined
  └── scripts/
      └── book.js                  # Script bundle entry point

External tools: pandoc (document compiler) and esbuild (script bundler)
must be on PATH. Stylesheets compile in-process.

Run 'bookpress gen-config' to print a documented book.toml.")]
#[command(version)]
struct Cli {
    /// Book source directory
    #[arg(long, default_value = "book", global = true)]
    source: PathBuf,

    /// Output directory for the rendered book
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (compiled assets, build report)
    #[arg(long, default_value = ".bookpress-temp", global = true)]
    temp_dir: PathBuf,

    /// Minify the compiled stylesheet and the script bundle
    #[arg(long, global = true)]
    minify: bool,

    /// Preview server port (overrides serve.port from book.toml)
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Produce the JSON rendition (pandoc AST dump)
    Json,
    /// Compile assets and produce the HTML rendition
    Html,
    /// Produce the PDF rendition
    Pdf,
    /// Compile the stylesheet and produce the EPUB rendition
    Epub,
    /// Produce HTML, PDF, and EPUB in sequence
    All,
    /// Run `all`, then archive the renditions into one zip
    Package,
    /// Build HTML, then watch for changes and serve a live preview
    Serve,
    /// Validate config and source files without building
    Check,
    /// Print a stock book.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The default command is `package`, the full distributable build.
    let command = cli.command.unwrap_or(Command::Package);

    if let Command::GenConfig = command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let book_config = config::BookConfig::load(&cli.source)?;
    book_config.validate()?;

    // External tools run with the source root as their working directory, so
    // the output and temp paths they receive must not depend on it.
    let output_dir = std::path::absolute(&cli.output)?;
    let temp_dir = std::path::absolute(&cli.temp_dir)?;

    let ctx = tasks::BuildContext {
        config: &book_config,
        source_root: &cli.source,
        output_dir: &output_dir,
        temp_dir: &temp_dir,
        minify: cli.minify,
    };
    let runner = ProcessRunner::new();

    match command {
        Command::GenConfig => unreachable!("handled above"),
        Command::Json => run_and_report(&runner, &ctx, "json")?,
        Command::Html => run_and_report(&runner, &ctx, "html")?,
        Command::Pdf => run_and_report(&runner, &ctx, "pdf")?,
        Command::Epub => run_and_report(&runner, &ctx, "epub")?,
        Command::All => run_and_report(&runner, &ctx, "all")?,
        Command::Package => run_and_report(&runner, &ctx, "package")?,
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let checked = book_config.check_sources(&cli.source)?;
            for path in &checked {
                println!("    {path}");
            }
            println!("==> {} source files present", checked.len());
            for path in book_config.unlisted_markdown(&cli.source) {
                output::print_warning(&format!(
                    "{path} is not listed in fragments and will not appear in any rendition"
                ));
            }
        }
        Command::Serve => {
            println!("==> Initial build");
            run_and_report(&runner, &ctx, "html")?;
            let port = cli.port.unwrap_or(book_config.serve.port);
            serve::spawn(output_dir.clone(), port);
            watch::run(&runner, &ctx, &book_config.watch_rules)?;
        }
    }

    Ok(())
}

/// Run one registry task and print its report; a failure propagates and
/// makes the process exit non-zero.
fn run_and_report(
    runner: &ProcessRunner,
    ctx: &tasks::BuildContext<'_>,
    name: &str,
) -> Result<(), tasks::TaskError> {
    let report = tasks::run_named(runner, ctx, name)?;
    output::print_task_report(&report);
    Ok(())
}

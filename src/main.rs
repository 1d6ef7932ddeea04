use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;

use snapcard::export::DEFAULT_PIXEL_RATIO;
use snapcard::{
    CanvasSize, CardOptions, CosmicTextMeasure, Error, ExportOptions, Exporter, ImageFormat,
    ResvgBackend, Result, Session, Theme,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Svg,
    Pdf,
}

impl From<Format> for ImageFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Png => ImageFormat::Png,
            Format::Svg => ImageFormat::Svg,
            Format::Pdf => ImageFormat::Pdf,
        }
    }
}

/// Split Markdown into a series of styled, fixed-size image cards
#[derive(Parser, Debug)]
#[command(name = "snapcard", version)]
#[command(about = "Turn Markdown into paginated PNG, SVG or PDF cards", long_about = None)]
struct Args {
    /// Input markdown file (use "-" for stdin)
    #[arg(value_name = "INPUT", required_unless_present_any = ["list_themes", "completions"])]
    input: Option<PathBuf>,

    /// Directory the cards are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// File name prefix; pages are numbered when there are several
    #[arg(long, default_value = "card")]
    prefix: String,

    /// Built-in theme name or path to a TOML/YAML theme file
    #[arg(short, long, value_name = "THEME", default_value = "minimal")]
    theme: String,

    /// auto, square, landscape, WIDTHxHEIGHT or WIDTHxauto
    #[arg(short, long, value_name = "SIZE", default_value = "auto")]
    canvas: String,

    /// Name shown in the card footer
    #[arg(long, default_value = "AI Assistant")]
    author: String,

    /// Hide the footer row
    #[arg(long)]
    no_author: bool,

    /// Label at the right of the footer
    #[arg(long, default_value = "SNAPCARD")]
    brand: String,

    #[arg(short, long, value_enum, default_value_t = Format::Png)]
    format: Format,

    /// Raster scale multiplier (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = DEFAULT_PIXEL_RATIO)]
    pixel_ratio: f32,

    /// Pause between pages, in milliseconds
    #[arg(long, default_value_t = 300)]
    delay_ms: u64,

    /// Reuse loaded fonts across pages
    #[arg(long)]
    no_cache_bust: bool,

    /// Print the pagination as JSON instead of writing cards
    #[arg(long)]
    dump_pages: bool,

    /// List the built-in themes and canvas sizes
    #[arg(long)]
    list_themes: bool,

    /// Print a shell completion script
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "snapcard", &mut std::io::stdout());
        return Ok(());
    }

    if args.list_themes {
        println!("themes:");
        for name in Theme::list_builtins() {
            println!("  {:<10} {}", name, Theme::from_builtin(name)?.display_name());
        }
        println!("canvases: {}", CanvasSize::list_builtins().join(", "));
        return Ok(());
    }

    let input = args.input.clone().unwrap_or_else(|| PathBuf::from("-"));
    let markdown = read_input(&input)?;
    let theme = Theme::load(&args.theme)?;
    let canvas = CanvasSize::parse(&args.canvas)?;
    log::info!("theme '{}', canvas {:?}", theme.name, canvas);

    let mut session = Session::new(CosmicTextMeasure::new());
    session.set_theme(theme);
    session.set_canvas(canvas);
    session.set_options(CardOptions {
        author: args.author.clone(),
        show_author: !args.no_author,
        brand: args.brand.clone(),
    });
    session.set_text(markdown);

    if args.dump_pages {
        println!("{}", serde_json::to_string_pretty(&session.report())?);
        return Ok(());
    }

    let cards = session.render_pages();
    let options = ExportOptions {
        out_dir: args.out_dir,
        prefix: args.prefix,
        format: args.format.into(),
        pixel_ratio: args.pixel_ratio,
        cache_bust: !args.no_cache_bust,
        delay: Duration::from_millis(args.delay_ms),
    };
    let written = Exporter::new(ResvgBackend::new()).export(&cards, &options)?;
    for path in written {
        eprintln!("saved {}", path.display());
    }
    Ok(())
}

fn read_input(input: &std::path::Path) -> Result<String> {
    if input.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|source| Error::Read {
                path: input.to_path_buf(),
                source,
            })?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input).map_err(|source| Error::Read {
            path: input.to_path_buf(),
            source,
        })
    }
}

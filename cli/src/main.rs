//! quire CLI - paginate styled text and export it

use std::fs;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use quire::export::to_json;
use quire::{
    DocumentStats, EditingSession, ExportFormat, ExportOptions, ExportOutcome, ExportRequest,
    FontCatalog, FontResolver, JsonFormat, PageSetup, SessionOptions, StyleChange,
};

#[derive(Parser)]
#[command(name = "quire")]
#[command(author = "quire contributors")]
#[command(version)]
#[command(about = "Paginate styled text and export it to PDF, RTF, HTML and plain text", long_about = None)]
struct Cli {
    /// Paper size
    #[arg(long, value_enum, global = true, env = "QUIRE_PAGE", default_value = "letter")]
    page: PaperSize,

    /// Minimum number of pages
    #[arg(long, global = true, env = "QUIRE_MIN_PAGES", default_value = "1")]
    min_pages: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a text file to PDF, RTF, HTML or plain text
    Export {
        /// Input text file ("-" for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file; the format follows its extension
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output format, overriding the extension
        #[arg(short, long)]
        format: Option<String>,

        /// Style change as FIELD=VALUE[@START..END] (repeatable)
        #[arg(short, long = "style", value_name = "CHANGE")]
        styles: Vec<String>,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Document author
        #[arg(long)]
        author: Option<String>,

        /// Write uncompressed PDF streams
        #[arg(long)]
        no_compress: bool,
    },

    /// Show the page partition of a text file
    Layout {
        /// Input text file ("-" for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Style change as FIELD=VALUE[@START..END] (repeatable)
        #[arg(short, long = "style", value_name = "CHANGE")]
        styles: Vec<String>,

        /// Print the page map as JSON
        #[arg(long)]
        json: bool,

        /// Output compact JSON
        #[arg(long, requires = "json")]
        compact: bool,
    },

    /// Show document statistics
    Info {
        /// Input text file ("-" for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// List the font families and style fields
    Fonts,

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PaperSize {
    /// US Letter, 612 x 792 pt
    Letter,
    /// ISO A4, 595 x 842 pt
    A4,
}

impl From<PaperSize> for PageSetup {
    fn from(size: PaperSize) -> Self {
        match size {
            PaperSize::Letter => PageSetup::letter(),
            PaperSize::A4 => PageSetup::a4(),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let options = SessionOptions::new()
        .with_page_setup(cli.page.into())
        .with_minimum_pages(cli.min_pages);

    let result = match cli.command {
        Some(Commands::Export {
            input,
            output,
            format,
            styles,
            title,
            author,
            no_compress,
        }) => {
            let mut export_options = ExportOptions::new().with_compression(!no_compress);
            if let Some(title) = title {
                export_options = export_options.with_title(title);
            }
            if let Some(author) = author {
                export_options = export_options.with_author(author);
            }
            cmd_export(
                &input,
                &output,
                format.as_deref(),
                &styles,
                export_options,
                options,
            )
        }
        Some(Commands::Layout {
            input,
            styles,
            json,
            compact,
        }) => cmd_layout(&input, &styles, json, compact, options),
        Some(Commands::Info { input }) => cmd_info(&input, options),
        Some(Commands::Fonts) => {
            cmd_fonts();
            Ok(())
        }
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: quire export <INPUT> <OUTPUT>".yellow());
            println!("       quire --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn read_input(input: &Path) -> Result<String, Box<dyn std::error::Error>> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

/// Split `FIELD=VALUE[@START..END]` into a change and an optional range.
fn parse_style(arg: &str) -> Result<(StyleChange, Option<Range<usize>>), String> {
    let (change, range) = match arg.rsplit_once('@') {
        Some((change, range)) => (change, Some(parse_range(range)?)),
        None => (arg, None),
    };
    let (field, value) = change
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", change))?;
    Ok((StyleChange::parse(field, value)?, range))
}

fn parse_range(s: &str) -> Result<Range<usize>, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{}'", s))?;
    let start = start
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid range start '{}': {}", start, e))?;
    let end = end
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid range end '{}': {}", end, e))?;
    if start > end {
        return Err(format!("range start {} is after end {}", start, end));
    }
    Ok(start..end)
}

/// Load the input into a session and apply the style changes in order.
fn open_session(
    input: &Path,
    styles: &[String],
    options: SessionOptions,
) -> Result<EditingSession, Box<dyn std::error::Error>> {
    let text = read_input(input)?;
    let mut session = EditingSession::with_text(&text, options);

    for arg in styles {
        let (change, range) = parse_style(arg)?;
        let range = range.unwrap_or(0..session.document().len());
        log::debug!("Applying {} to {:?}", change, range);
        session.on_selection_changed(range)?;
        session.on_style_control_changed(change)?;
    }
    Ok(session)
}

fn cmd_export(
    input: &Path,
    output: &Path,
    format: Option<&str>,
    styles: &[String],
    export_options: ExportOptions,
    options: SessionOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Reading text...");
    let mut session = open_session(input, styles, options)?;
    pb.inc(1);

    pb.set_message("Paginating...");
    let page_count = session.pages().len();
    pb.inc(1);

    let request = match format {
        Some(name) => ExportRequest::new(output, name.parse::<ExportFormat>()?),
        None => ExportRequest::from_path(output)?,
    }
    .with_options(export_options);

    pb.set_message(format!("Writing {}...", request.format));
    let outcome = session.export(&request);
    pb.inc(1);

    match outcome {
        ExportOutcome::Succeeded {
            destination,
            format,
            bytes,
            stats,
            warnings,
        } => {
            pb.finish_with_message("Done!");
            println!("\n{}", "Exported:".green().bold());
            println!("  {} {}", "├─".dimmed(), destination.display());
            println!("  {} {} ({})", "├─".dimmed(), format, format.mime_type());
            println!("  {} {} pages, {} bytes", "└─".dimmed(), page_count, bytes);
            log::debug!("{} characters, {} runs", stats.characters, stats.runs);
            for warning in warnings {
                println!("{} {}", "Warning:".yellow(), warning);
            }
            Ok(())
        }
        ExportOutcome::Failed { cause } => {
            pb.abandon_with_message("Failed");
            Err(cause.into())
        }
    }
}

fn cmd_layout(
    input: &Path,
    styles: &[String],
    json: bool,
    compact: bool,
    options: SessionOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(input, styles, options)?;

    if json {
        let format = if compact {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        };
        let snapshot = session.snapshot()?;
        println!("{}", to_json(&snapshot, format)?);
        return Ok(());
    }

    println!("{}", "Page Layout".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let content = session.page_setup().content_size();
    for page in session.pages() {
        println!(
            "{} {:>4}: {:>7}..{:<7} {:>6} chars  {:>6.1}/{:.1} pt",
            "Page".bold(),
            page.index + 1,
            page.range.start,
            page.range.end,
            page.char_count(),
            page.used_height,
            content.height,
        );
    }
    Ok(())
}

fn cmd_info(input: &Path, options: SessionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(input, &[], options)?;
    let snapshot = session.snapshot()?;
    let stats = DocumentStats::from_snapshot(&snapshot);
    let setup = snapshot.setup;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!(
        "{}: {} x {} pt",
        "Page size".bold(),
        setup.width,
        setup.height
    );
    println!(
        "{}: {} / {} / {} / {} pt",
        "Margins".bold(),
        setup.margins.top,
        setup.margins.right,
        setup.margins.bottom,
        setup.margins.left
    );
    println!("{}: {}", "Pages".bold(), stats.pages);

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Words".bold(), stats.words);
    println!("{}: {}", "Characters".bold(), stats.characters);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraphs);
    println!("{}: {}", "Style runs".bold(), stats.runs);

    Ok(())
}

fn cmd_fonts() {
    let catalog = FontCatalog::standard();

    println!("{}", "Font Families".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for family in catalog.families() {
        match catalog.get(&family) {
            Some(entry) => {
                let variants = if entry.has_bold && entry.has_italic {
                    ""
                } else {
                    " (regular only)"
                };
                println!(
                    "{:<18} {}{}",
                    family.bold(),
                    entry.base_face.postscript_name(false, false).dimmed(),
                    variants
                );
            }
            None => println!("{}", family.bold()),
        }
    }

    println!();
    println!("{}", "Style Fields".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}", StyleChange::FIELDS.join(", "));
    println!(
        "{}: {}",
        "Formats".bold(),
        ExportFormat::ALL
            .iter()
            .map(|format| format.extension())
            .collect::<Vec<_>>()
            .join(", ")
    );
}

fn cmd_version() {
    println!("{} {}", "quire".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Paginated rich-text document core");
    println!();
    println!("License: MIT");
}

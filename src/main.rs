//! docstream - convert academic documents to HTML, Markdown, LaTeX, EPUB and text

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{LevelFilter, debug, info};

use docstream::export::{
    Consumer, EpubConfig, EpubConsumer, HtmlConfig, HtmlConsumer, LatexConfig, LatexConsumer,
    MarkdownConfig, MarkdownConsumer, TextConfig, TextConsumer,
};
use docstream::model::Document;
use docstream::stream::{CancelToken, StreamOptions, stream};
use docstream::{Dispatcher, DocumentInfo, Format};

#[derive(Parser)]
#[command(name = "docstream")]
#[command(version, about = "Streaming document converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    docstream thesis.json                   Write every format next to the input
    docstream thesis.json -f md,epub -o out Write Markdown and EPUB into out/
    docstream -i thesis.json                Show document info")]
struct Cli {
    /// Input document (JSON)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (defaults to the input's directory)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Comma-separated output formats
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "html,markdown,latex,epub,text"
    )]
    formats: Vec<Format>,

    /// Split text runs longer than this many bytes
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Keep paragraphs without text or images
    #[arg(long)]
    keep_empty: bool,

    /// Do not clean invisible and control characters
    #[arg(long)]
    no_sanitize: bool,

    /// Give up after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// JSON file with stream and format options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the event stream instead of converting
    #[arg(long)]
    events: bool,

    /// Show document info without converting
    #[arg(short, long)]
    info: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print debug output
    #[arg(short, long)]
    verbose: bool,
}

/// Contents of a `--config` file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    stream: StreamOptions,
    html: HtmlConfig,
    markdown: MarkdownConfig,
    latex: LatexConfig,
    epub: EpubConfig,
    text: TextConfig,
}

impl Config {
    fn load(path: &Path) -> docstream::Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Apply command line overrides.
    fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(chunk_size) = cli.chunk_size {
            self.stream.chunk_size = chunk_size;
        }
        if cli.keep_empty {
            self.stream.skip_empty = false;
        }
        if cli.no_sanitize {
            self.stream.sanitize_text = false;
        }
        self
    }

    fn consumer(&self, format: Format) -> Box<dyn Consumer> {
        match format {
            Format::Html => Box::new(HtmlConsumer::with_config(self.html.clone())),
            Format::Markdown => Box::new(MarkdownConsumer::with_config(self.markdown.clone())),
            Format::Latex => Box::new(LatexConsumer::with_config(self.latex.clone())),
            Format::Epub => Box::new(EpubConsumer::with_config(self.epub.clone())),
            Format::Text => Box::new(TextConsumer::with_config(self.text.clone())),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = if cli.info {
        show_info(&cli.input)
    } else if cli.events {
        print_events(&cli)
    } else {
        convert(&cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let mut builder = env_logger::Builder::from_default_env();
    if cli.quiet {
        builder.filter_level(LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn load_document(path: &Path) -> Result<Document, String> {
    let data = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("{}: {e}", path.display()))
}

fn load_config(cli: &Cli) -> Result<Config, String> {
    let config = match &cli.config {
        Some(path) => Config::load(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => Config::default(),
    };
    let config = config.with_cli(cli);
    config.stream.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn cancel_token(cli: &Cli) -> CancelToken {
    match cli.timeout_ms {
        Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
        None => CancelToken::new(),
    }
}

fn show_info(path: &Path) -> Result<(), String> {
    let doc = load_document(path)?;
    let info = DocumentInfo::from_document(&doc);

    println!("File: {}", path.display());
    println!("Title: {}", info.title);
    let description = info.description.trim();
    if !description.is_empty() {
        match description.char_indices().nth(200) {
            Some((end, _)) => println!("Description: {}...", &description[..end]),
            None => println!("Description: {description}"),
        }
    }
    if let Some(date) = &info.date {
        println!("Date: {date}");
    }
    if let Some(pages) = info.page_count {
        println!("Pages: {pages}");
    }
    if let Some(progress) = info.progress {
        println!("Progress: {progress}%");
    }
    println!("Body elements: {}", doc.elements().len());
    println!("Chapters: {}", doc.chapters.len());
    println!("Images: {}", doc.image_urls().len());

    Ok(())
}

fn print_events(cli: &Cli) -> Result<(), String> {
    let doc = load_document(&cli.input)?;
    let config = load_config(cli)?;
    let cancel = cancel_token(cli);

    for event in stream(&doc, &config.stream, &cancel) {
        println!("{event:?}");
    }
    if cancel.is_cancelled() {
        return Err(docstream::Error::Cancelled.to_string());
    }
    Ok(())
}

fn convert(cli: &Cli) -> Result<(), String> {
    let doc = load_document(&cli.input)?;
    let config = load_config(cli)?;
    let cancel = cancel_token(cli);

    let mut formats: Vec<Format> = Vec::new();
    for &format in &cli.formats {
        if !formats.contains(&format) {
            formats.push(format);
        }
    }

    let mut dispatcher = Dispatcher::new();
    for &format in &formats {
        dispatcher.add(config.consumer(format));
    }

    let outputs = dispatcher
        .run(stream(&doc, &config.stream, &cancel), &cancel)
        .map_err(|e| e.to_string())?;
    debug!("{}", dispatcher.stats());

    let dir = match &cli.output {
        Some(dir) => dir.clone(),
        None => cli
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    fs::create_dir_all(&dir).map_err(|e| format!("{}: {e}", dir.display()))?;

    let stem = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    for output in outputs {
        let path = dir.join(format!("{stem}.{}", output.extension));
        fs::write(&path, &output.bytes).map_err(|e| format!("{}: {e}", path.display()))?;
        info!("{}: {}", output.format, output.stats);
        if !cli.quiet {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

use crate::{
    app::{self, App, LogLevel},
    config::{self, ViewerConfig},
    loader::{self, LOAD_FAILED_MESSAGE},
    render::{self, TableLine},
    state::{reduce, ViewEvent, ViewState},
    ui,
};
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SourceOverrides {
    endpoint: Option<String>,
    sheet_id: Option<String>,
    tab_name: Option<String>,
}

impl SourceOverrides {
    fn apply(&self, config: &mut ViewerConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(sheet_id) = &self.sheet_id {
            config.sheet_id = sheet_id.clone();
        }
        if let Some(tab_name) = &self.tab_name {
            config.tab_name = tab_name.clone();
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct PrintOptions {
    series: Option<String>,
    search: Option<String>,
    format: OutputFormat,
}

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Ui(SourceOverrides),
    Print(SourceOverrides, PrintOptions),
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        CliAction::Help => {
            print_help();
            Ok(())
        }
        CliAction::Version => {
            println!("ChapterMap v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliAction::Ui(overrides) => {
            let config = resolve_config(&overrides);
            let mut app = App::new(config, config::log_path());
            ui::run(&mut app)
        }
        CliAction::Print(overrides, options) => run_print(resolve_config(&overrides), options),
    }
}

fn resolve_config(overrides: &SourceOverrides) -> ViewerConfig {
    let mut config = match ViewerConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Ignoring config file: {err:#}");
            ViewerConfig::default()
        }
    };
    overrides.apply(&mut config);
    config
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    if matches!(args.first().map(|s| s.as_str()), Some("--help" | "-h" | "help")) {
        return Ok(CliAction::Help);
    }
    if matches!(args.first().map(|s| s.as_str()), Some("--version" | "-V" | "version")) {
        return Ok(CliAction::Version);
    }

    let mut overrides = SourceOverrides::default();
    let mut print = false;
    let mut options = PrintOptions {
        series: None,
        search: None,
        format: OutputFormat::Text,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };
        let mut value = || -> Result<String> {
            match inline.clone().or_else(|| iter.next().cloned()) {
                Some(value) => Ok(value),
                None => bail!("{flag} requires a value"),
            }
        };
        match flag {
            "--print" | "-p" => print = true,
            "--endpoint" => overrides.endpoint = Some(value()?),
            "--sheet" => overrides.sheet_id = Some(value()?),
            "--tab" => overrides.tab_name = Some(value()?),
            "--series" => options.series = Some(value()?),
            "--search" => options.search = Some(value()?),
            "--format" => {
                let raw = value()?;
                options.format = OutputFormat::parse(&raw)
                    .with_context(|| format!("Unknown format: {raw} (use 'text' or 'json')"))?;
            }
            "--help" | "-h" => return Ok(CliAction::Help),
            other => bail!("Unknown argument: {other} (see --help)"),
        }
    }

    if !print && (options.series.is_some() || options.search.is_some()) {
        bail!("--series and --search only apply with --print");
    }

    if print {
        Ok(CliAction::Print(overrides, options))
    } else {
        Ok(CliAction::Ui(overrides))
    }
}

fn run_print(config: ViewerConfig, options: PrintOptions) -> Result<()> {
    let log_path = config::log_path();
    let log = |level: LogLevel, message: &str| {
        if let Some(path) = &log_path {
            let _ = app::append_log_file(path, level, message);
        }
    };

    log(LogLevel::Info, &format!("Fetching {}", loader::sheet_url(&config)));
    let data = match loader::fetch_sheet(&config) {
        Ok(data) => data,
        Err(err) => {
            log(LogLevel::Error, &format!("Load failed: {err}"));
            bail!(LOAD_FAILED_MESSAGE);
        }
    };
    for column in &data.missing_columns {
        log(LogLevel::Warn, &format!("Column not found in sheet: \"{column}\""));
    }

    let mut state = ViewState::from_rows(data.rows);
    if let Some(series) = options.series {
        state = reduce(state, ViewEvent::SelectSeries(series));
    }
    if let Some(search) = options.search {
        state = reduce(state, ViewEvent::Search(search));
    }

    let lines = render::table_lines(&state);
    match options.format {
        OutputFormat::Text => {
            println!("{}", state.title());
            println!();
            println!("{}", render::plain_table(&lines));
        }
        OutputFormat::Json => {
            let chapters: Vec<_> = lines
                .iter()
                .filter_map(|line| match line {
                    TableLine::Chapter(chapter) => Some(chapter),
                    TableLine::Empty(_) => None,
                })
                .collect();
            let raw = serde_json::to_string_pretty(&chapters).context("serialize chapters")?;
            println!("{raw}");
        }
    }
    Ok(())
}

fn print_help() {
    println!("ChapterMap v{}", env!("CARGO_PKG_VERSION"));
    println!("Browse manga chapter to light novel mappings from a shared sheet.");
    println!();
    println!("Usage:");
    println!("  chaptermap [source options]              Open the interactive viewer");
    println!("  chaptermap --print [options]             Print one series as a table");
    println!();
    println!("Source options:");
    println!("  --sheet <id>        Spreadsheet id (default {})", config::DEFAULT_SHEET_ID);
    println!("  --tab <name>        Tab name (default {})", config::DEFAULT_TAB_NAME);
    println!("  --endpoint <url>    JSON endpoint (default {})", config::DEFAULT_ENDPOINT);
    println!();
    println!("Print options:");
    println!("  --series <name>     Series to show (default: first alphabetically)");
    println!("  --search <term>     Filter by number, title or LN title");
    println!("  --format text|json  Output format (default text)");
    println!();
    println!("Keys: / search  x clear  [ ] series  Enter select  y copy  Tab focus  q quit");
}

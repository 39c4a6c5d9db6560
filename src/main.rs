use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use atelier::config::AtelierConfig;
use atelier::html::Normalizer;
use atelier::store::{DocumentStore, default_session_path};
use atelier::{normalize_options, preview_renderer, store_options};

const USAGE: &str = "usage:
  atelier normalize <file> [--page <path>]
  atelier preview [<session.json>] [--page <path>]
  atelier tree [<session.json>]";

fn main() -> Result<()> {
    let config = AtelierConfig::load();
    init_logging(&config);

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let (positional, page) = split_args(args)?;

    match command.as_str() {
        "normalize" => {
            let Some(file) = positional else {
                bail!("normalize needs a file\n{USAGE}");
            };
            normalize(&config, PathBuf::from(file), page)
        }
        "preview" => preview(&config, session_path(positional), page),
        "tree" => tree(&config, session_path(positional)),
        "help" | "--help" | "-h" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown command {other:?}\n{USAGE}"),
    }
}

fn init_logging(config: &AtelierConfig) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(filter) = &config.logging.filter {
        builder.parse_filters(filter);
    }
    let _ = builder.try_init();
}

/// One optional positional argument plus an optional `--page <path>`.
fn split_args(mut args: impl Iterator<Item = String>) -> Result<(Option<String>, Option<String>)> {
    let mut positional = None;
    let mut page = None;
    while let Some(arg) = args.next() {
        if arg == "--page" {
            page = Some(args.next().context("--page needs a value")?);
        } else if let Some(value) = arg.strip_prefix("--page=") {
            page = Some(value.to_string());
        } else if positional.is_none() {
            positional = Some(arg);
        } else {
            bail!("unexpected argument {arg:?}\n{USAGE}");
        }
    }
    Ok((positional, page))
}

fn session_path(arg: Option<String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(default_session_path)
}

fn normalize(config: &AtelierConfig, file: PathBuf, page: Option<String>) -> Result<()> {
    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let identity = match page {
        Some(page) => page,
        None => file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("input has no file name")?,
    };

    let mut normalizer = Normalizer::new(normalize_options(config));
    let normalized = normalizer.normalize(&raw, &identity);
    if let Some(fallback) = normalized.fallback {
        log::warn!("{identity}: markup could not be repaired ({fallback:?})");
    }
    println!("{}", normalized.html);
    Ok(())
}

fn load_store(config: &AtelierConfig, path: &Path) -> Result<DocumentStore> {
    log::debug!("loading session from {}", path.display());
    DocumentStore::load(path, store_options(config))
        .with_context(|| format!("failed to load session {}", path.display()))
}

fn preview(config: &AtelierConfig, path: PathBuf, page: Option<String>) -> Result<()> {
    let store = load_store(config, &path)?;
    let page = match page {
        Some(page) => page,
        None => store
            .active()
            .or_else(|| store.first_page())
            .map(|page| page.to_string())
            .context("session has no pages")?,
    };
    let entry = store
        .current(&page)
        .with_context(|| format!("no page {page:?} in {}", path.display()))?;

    let pages: Vec<String> = store.pages().iter().map(|page| page.to_string()).collect();
    let html = preview_renderer(config).render(&entry.code, &pages, &page);
    println!("{html}");
    Ok(())
}

fn tree(config: &AtelierConfig, path: PathBuf) -> Result<()> {
    let store = load_store(config, &path)?;
    let json = store.tree().to_json().context("failed to encode tree")?;
    println!("{json}");
    Ok(())
}

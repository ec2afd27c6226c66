//! Imports a directory of page manifests and prints the namespaced result.
use std::{path::PathBuf, process};

use clap::Parser;
use pagespace::{discover_pages, logging, App, IsolationConfig, NamespaceError, RewritePolicy};
use serde_json::{json, Map, Value};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "pagespace", about = "Namespace page component ids", version)]
struct Cli {
    /// Directory holding `*.page.json` manifests
    pages_dir: PathBuf,

    /// Module path prefix the pages directory stands for
    #[arg(long, value_name = "MODULE")]
    root: Option<String>,

    /// Optional path to a JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Rewrite every id, not just the ones bound by a callback
    #[arg(long)]
    unconditional: bool,

    /// Set log level to debug (our crate only)
    #[arg(long, conflicts_with = "log_level")]
    debug: bool,

    /// Set a single log level for our crate (error|warn|info|debug|trace)
    #[arg(long)]
    log_level: Option<String>,
}

fn run(cli: &Cli) -> Result<Value, NamespaceError> {
    let mut config = match &cli.config {
        Some(path) => IsolationConfig::from_path(path)?,
        None => IsolationConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.pages_root = root.clone();
    }
    if cli.unconditional {
        config.policy = RewritePolicy::Unconditional;
    }
    config.validate()?;

    let manifests = discover_pages(&cli.pages_dir, &config.pages_root, &config.manifest_suffix)?;
    let mut app = App::new(config)?;
    app.import_manifests(manifests)?;
    app.finish_import()?;

    let pages = app.page_registry();
    let mut layouts = Map::new();
    for page in &pages {
        if let Some(layout) = app.layout_value(&page.path)? {
            layouts.insert(page.path.clone(), layout);
        }
    }

    Ok(json!({
        "pages": pages,
        "layouts": layouts,
        "registry": app.registry().keys(),
    }))
}

fn main() {
    let cli = Cli::parse();
    logging::init(&logging::compute_spec(cli.debug, cli.log_level.as_deref()));

    match run(&cli) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("failed to render output: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!(code = e.code(), "{}", e);
            eprintln!("pagespace: {} [{}]", e, e.code());
            process::exit(1);
        }
    }
}

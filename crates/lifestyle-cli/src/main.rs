mod storage;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lifestyle_client_http::HttpApi;
use lifestyle_core::embed::embed_url;
use lifestyle_core::{
    LifestyleWidget, MarkupView, SessionProvider, SkuResolver, WidgetConfig, WidgetLoadState,
};
use lifestyle_resolver_html::{mounts, HostPage};
use tracing_subscriber::EnvFilter;

use crate::storage::FileStorage;

/// Environment variable overriding `api_base`.
const API_ENV: &str = "LIFESTYLE_WIDGET_API";

#[derive(Parser)]
#[command(name = "lifestyle-widget", about = "Lifestyle image widget runtime")]
struct Cli {
    /// JSON config file. Defaults to `<config_dir>/lifestyle-widget/config.json`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not read or write the session id on disk.
    #[arg(long, global = true)]
    no_storage: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the SKU a saved product page is displaying.
    Detect {
        /// Saved HTML of the host page.
        html: PathBuf,
        /// Location the page was served from.
        #[arg(long)]
        url: String,
        /// SKU configured on the embed script (`AUTO_DETECT` to detect).
        #[arg(long)]
        sku: Option<String>,
    },
    /// Detect, mount and load the widget into a saved product page.
    Init {
        html: PathBuf,
        #[arg(long)]
        url: String,
    },
    /// Load the widget for a SKU and print its markup.
    Load {
        sku: String,
    },
    /// Load a SKU, then toggle the like on one of its renders.
    Like {
        sku: String,
        render_id: String,
    },
    /// Print the iframe source for a SKU, or plan iframes for a saved page.
    Embed {
        /// SKU to embed. Ignored when `--html` is given.
        sku: Option<String>,
        #[arg(long, requires = "url")]
        html: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the session id, minting one if needed.
    Session {
        /// Forget the stored id first.
        #[arg(long)]
        clear: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<WidgetConfig> {
    let path = path.map(Path::to_path_buf).or_else(|| {
        dirs::config_dir()
            .map(|d| d.join("lifestyle-widget").join("config.json"))
            .filter(|p| p.exists())
    });
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => WidgetConfig::default(),
    };
    if let Ok(api) = std::env::var(API_ENV) {
        config.api_base = api;
    }
    Ok(config)
}

fn session_provider(config: &WidgetConfig, no_storage: bool) -> SessionProvider {
    if no_storage {
        return SessionProvider::ephemeral();
    }
    match FileStorage::default_path() {
        Some(path) => SessionProvider::persistent(
            config.session_key.clone(),
            Box::new(FileStorage::open(path)),
        ),
        None => SessionProvider::ephemeral(),
    }
}

fn read_page(html: &Path, url: &str) -> Result<HostPage> {
    let text = fs::read_to_string(html)
        .with_context(|| format!("failed to read {}", html.display()))?;
    Ok(HostPage::parse(&text, url))
}

fn print_outcome(state: &WidgetLoadState, markup: &str) {
    if let WidgetLoadState::Errored(reason) = state {
        eprintln!("load failed: {reason}");
    }
    println!("{markup}");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let sessions = session_provider(&config, cli.no_storage);

    match cli.command {
        Command::Detect { html, url, sku } => {
            let mut page = read_page(&html, &url)?;
            if let Some(sku) = sku {
                page = page.with_configured_sku(&sku);
            }
            let Some(resolution) = page.resolve() else {
                bail!("no SKU found on {}", html.display());
            };
            println!("{}\t{}", resolution.sku, resolution.source);
        }
        Command::Init { html, url } => {
            let mut page = read_page(&html, &url)?;
            let api = HttpApi::new(&config)?;
            let entry = LifestyleWidget::new(api, sessions, config);
            let resolution = page.resolve();
            let widget = entry.init(&resolution, &mut page).await?;
            print_outcome(&widget.state(), widget.view().markup());
        }
        Command::Load { sku } => {
            let api = HttpApi::new(&config)?;
            let entry = LifestyleWidget::new(api, sessions, config);
            let widget = entry.mount(&sku, MarkupView::new());
            widget.load().await;
            print_outcome(&widget.state(), widget.view().markup());
        }
        Command::Like { sku, render_id } => {
            let api = HttpApi::new(&config)?;
            let entry = LifestyleWidget::new(api, sessions, config);
            let widget = entry.mount(&sku, MarkupView::new());
            widget.load().await;
            if let WidgetLoadState::Errored(reason) = widget.state() {
                bail!("could not load {sku}: {reason}");
            }
            let state = widget
                .toggle_like(&render_id)
                .await
                .with_context(|| format!("failed to toggle like on {render_id}"))?;
            println!("liked={} total={}", state.liked, state.total);
        }
        Command::Embed { sku, html, url } => match (html, url) {
            (Some(html), Some(url)) => {
                let page = read_page(&html, &url)?;
                let detected = page.resolve_sku();
                for plan in mounts::plan_embeds(&page, detected.as_deref(), &config.widget_base)? {
                    println!("{}\t{}\t{}", plan.container_id, plan.sku, plan.iframe_src);
                }
            }
            _ => {
                let Some(sku) = sku else {
                    bail!("give a SKU or --html with --url");
                };
                println!("{}", embed_url(&config.widget_base, &sku)?);
            }
        },
        Command::Session { clear } => {
            let entry = LifestyleWidget::new(HttpApi::new(&config)?, sessions, config);
            if clear {
                entry.clear_session();
            }
            println!("{}", entry.session_id());
        }
    }

    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use na_analyzer::{AnalysisPipeline, AnalysisViewModel, FetchOutcome};
use na_client::ApiClient;
use na_core::config::DEFAULT_BASE_URL;
use na_core::session::UserProfile;
use na_core::types::source_label;
use na_core::{
    AnalysisService, AnalyzeRequest, ApiConfig, DiffItem, NewsQuery, Session, Storage, Theme,
};
use na_scrappers::{PageFetcher, Scraper};
use na_storage::StorageKind;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod logging;

const DEFAULT_SESSION_PATH: &str = ".news-analyzer/session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

fn unit_seconds(unit: char) -> Option<u64> {
    match unit {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(3600),
        'd' => Some(86400),
        _ => None,
    }
}

/// Accepts `90`, `30s`, `5m` or compounds like `1h15m30s`. A trailing bare
/// number counts as seconds.
impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let overflow = || format!("Duration too large: {}", s);
        let mut total: u64 = 0;
        let mut rest = s.trim();
        if rest.is_empty() {
            return Err("Duration must include a number".to_string());
        }

        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(format!("Expected a number in duration: {}", s));
            }
            let value: u64 = rest[..digits].parse().map_err(|_| overflow())?;
            rest = &rest[digits..];

            let scale = match rest.chars().next() {
                None => 1,
                Some(unit) => {
                    rest = &rest[unit.len_utf8()..];
                    unit_seconds(unit).ok_or_else(|| format!("Invalid duration unit: {}", unit))?
                }
            };
            total = value
                .checked_mul(scale)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(overflow)?;
            rest = rest.trim_start();
        }

        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrape news pages and get them rated by the analysis service", long_about = None)]
struct Cli {
    /// Root URL of the analysis service
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Local store: memory, json or sqlite
    #[arg(long, global = true, default_value = "json")]
    storage: StorageKind,
    /// Path of the local store (defaults depend on the backend)
    #[arg(long, global = true)]
    storage_path: Option<PathBuf>,
    /// Where the signed-in session is kept
    #[arg(long, global = true, default_value = DEFAULT_SESSION_PATH)]
    session: PathBuf,
    /// Print the recorded API errors before exiting
    #[arg(long, global = true)]
    show_errors: bool,
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a page and print the extracted title and text
    Scrape { url: String },
    /// Scrape a page and submit it for analysis
    Analyze {
        url: String,
        #[arg(long)]
        source: Option<String>,
        /// Use the news analysis endpoint instead of the generic one
        #[arg(long)]
        news: bool,
    },
    /// List analyses known to the service
    Analyses {
        /// Only show what the local store holds
        #[arg(long)]
        local: bool,
        /// Keep refreshing with the given interval (e.g. 30s, 5m, 1h15m)
        #[arg(long)]
        watch: Option<HumanDuration>,
    },
    Themes {
        #[command(subcommand)]
        command: ThemeCommands,
    },
    Diffs {
        #[command(subcommand)]
        command: DiffCommands,
    },
    /// Copy the service's themes and diffs into the local store
    Sync,
    /// Sentiment history recorded for a URL
    History { url: String },
    /// Browse analysed news
    News {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Store a bearer token for later requests
    Login {
        token: String,
        #[arg(long, requires = "email")]
        name: Option<String>,
        #[arg(long, requires = "name")]
        email: Option<String>,
    },
    Logout,
    Whoami,
}

#[derive(Subcommand, Debug)]
enum ThemeCommands {
    List {
        #[arg(long)]
        local: bool,
    },
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Only save to the local store
        #[arg(long)]
        local: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DiffCommands {
    List {
        theme_id: String,
        #[arg(long)]
        local: bool,
    },
    Add {
        theme_id: String,
        content: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        local: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

struct App {
    client: Arc<ApiClient>,
    storage: Arc<dyn Storage>,
    pipeline: AnalysisPipeline,
    session: Session,
}

impl App {
    async fn new(cli: &Cli) -> anyhow::Result<Self> {
        let session = Session::load(&cli.session)
            .with_context(|| format!("loading session from {}", cli.session.display()))?;
        let config = ApiConfig::new(&cli.base_url)?;
        let client = Arc::new(ApiClient::new(config).with_session(&session));

        let storage = na_storage::create_storage(cli.storage, cli.storage_path.as_deref()).await?;
        info!("💾 Storage initialized (using {})", cli.storage);

        let service: Arc<dyn AnalysisService> = client.clone();
        let view_model = Arc::new(AnalysisViewModel::new(service.clone()));
        let pipeline = AnalysisPipeline::new(service, view_model).with_storage(storage.clone());

        Ok(Self {
            client,
            storage,
            pipeline,
            session,
        })
    }

    async fn run(&mut self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Scrape { url } => {
                let page = PageFetcher::new().scrape_page(&url).await?;
                print_json(&page)?;
            }
            Commands::Analyze { url, source, news } => {
                let fetcher = PageFetcher::new();
                info!("🦗 Scraping {}", url);
                if news {
                    let page = fetcher.scrape_page(&url).await?;
                    // the news route rejects requests without a source
                    let source = source.unwrap_or_else(|| source_label(&page.url));
                    let request = AnalyzeRequest::from_page(&page, Some(source));
                    let news = self.client.analyze_news(&request).await?;
                    self.storage
                        .save_analysis(&news.clone().into_analysis(&request))
                        .await?;
                    print_json(&news)?;
                } else {
                    let (_, analysis) = self.pipeline.analyze_url(&fetcher, &url, source).await?;
                    print_json(&analysis)?;
                }
            }
            Commands::Analyses { local, watch } => self.analyses(local, watch).await?,
            Commands::Themes { command } => match command {
                ThemeCommands::List { local } => {
                    let themes = if local {
                        self.storage.get_themes().await?
                    } else {
                        self.client.get_themes().await?
                    };
                    print_json(&themes)?;
                }
                ThemeCommands::Create { name, description, local } => {
                    let mut theme = Theme::new(uuid::Uuid::new_v4().to_string(), name);
                    theme.description = description;
                    if !local {
                        theme = self.client.create_theme(&theme).await?;
                    }
                    self.storage.save_theme(&theme).await?;
                    info!("🏷️ Created theme {}", theme.id);
                    print_json(&theme)?;
                }
            },
            Commands::Diffs { command } => match command {
                DiffCommands::List { theme_id, local } => {
                    let diffs = if local {
                        self.storage.get_diffs_by_theme(&theme_id).await?
                    } else {
                        self.client.get_theme_diffs(&theme_id).await?
                    };
                    print_json(&diffs)?;
                }
                DiffCommands::Add { theme_id, content, source, url, local } => {
                    let mut diff = DiffItem {
                        id: uuid::Uuid::new_v4().to_string(),
                        theme_id,
                        content,
                        source,
                        url,
                    };
                    if !local {
                        diff = self.client.create_diff(&diff).await?;
                    }
                    self.storage.save_diff(&diff).await?;
                    print_json(&diff)?;
                }
            },
            Commands::Sync => {
                let report = self.pipeline.sync_themes().await?;
                println!("{} themes, {} diffs", report.themes, report.diffs);
            }
            Commands::History { url } => {
                print_json(&self.client.get_sentiment_history(&url).await?)?;
            }
            Commands::News { skip, limit, category, source } => {
                let query = NewsQuery { skip, limit, category, source };
                print_json(&self.client.get_news(&query).await?)?;
            }
            Commands::Login { token, name, email } => {
                let user = match (name, email) {
                    (Some(name), Some(email)) => Some(UserProfile { name, email, picture: None }),
                    _ => None,
                };
                self.session.sign_in(token, user)?;
                info!("🔑 Signed in, session saved to {}", self.session.path().display());
            }
            Commands::Logout => {
                self.session.sign_out()?;
                info!("👋 Signed out");
            }
            Commands::Whoami => match (self.session.is_authenticated(), self.session.user()) {
                (true, Some(user)) => println!("{} <{}>", user.name, user.email),
                (true, None) => println!("signed in"),
                (false, _) => println!("not signed in"),
            },
        }
        Ok(())
    }

    async fn analyses(&self, local: bool, watch: Option<HumanDuration>) -> anyhow::Result<()> {
        let restored = self.pipeline.restore().await?;
        if local {
            return print_json(&self.pipeline.view_model().analyses());
        }
        info!("📦 Restored {} cached analyses", restored);

        let Some(HumanDuration(interval)) = watch else {
            self.pipeline.view_model().fetch_analyses().await?;
            return print_json(&self.pipeline.view_model().analyses());
        };

        info!("Refreshing every {}s", interval.as_secs());
        loop {
            match self.pipeline.view_model().fetch_analyses().await {
                Ok(FetchOutcome::Refreshed(_)) => {
                    for analysis in self.pipeline.view_model().analyses() {
                        println!("{:>3}  {}  ({})", analysis.trust_score, analysis.title, analysis.source);
                    }
                }
                Ok(outcome) => info!("refresh skipped: {:?}", outcome),
                Err(e) => warn!("refresh failed: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::level_for(cli.verbose, cli.quiet));

    let mut app = App::new(&cli).await?;
    let show_errors = cli.show_errors;
    let result = app.run(cli.command).await;

    if show_errors || result.is_err() {
        for entry in app.client.errors() {
            error!("{} {}: {}", entry.timestamp.to_rfc3339(), entry.endpoint, entry.message);
        }
    }
    result
}

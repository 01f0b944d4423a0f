use clap::{Parser, Subcommand};
use recruit_desk::config::toml_config::TomlConfig;
use recruit_desk::core::interview::{results_path, InterviewWizard};
use recruit_desk::core::layout::GridMetrics;
use recruit_desk::core::listing::{FieldFilter, ListQuery, SortOrder};
use recruit_desk::core::search::{ScoringWeights, SearchResult};
use recruit_desk::core::session::SessionStore;
use recruit_desk::domain::model::DashboardWidget;
use recruit_desk::domain::ports::ConfigProvider;
use recruit_desk::utils::error::{DeskError, ErrorSeverity};
use recruit_desk::utils::{logger, validation::Validate};
use recruit_desk::{
    ApiClient, CliConfig, DashboardLayout, DataCache, DeskEngine, DragSession, EntityKind,
    LayoutStore, LocalStorage, SearchOptions, SearchService,
};

#[derive(Parser)]
#[command(name = "recruit-desk")]
#[command(about = "Search, browse and arrange recruiting data from the command line")]
struct Cli {
    #[command(flatten)]
    global: CliConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ranked search across entity types
    Search {
        query: String,
        /// Comma separated entity types (default: all)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
        /// Ignore cached data
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
    },
    /// Filtered, sorted, paginated list of one entity type
    List {
        kind: String,
        /// Tab filter as field=value
        #[arg(long)]
        tab: Option<String>,
        /// Dropdown filter as field=value, repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value = "10")]
        page_size: usize,
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
    },
    /// Detail view of one record
    Show { kind: String, id: String },
    /// Create a record from a JSON body
    Create {
        kind: String,
        #[arg(long)]
        data: String,
    },
    /// Partially update a record from a JSON body
    Update {
        kind: String,
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete { kind: String, id: String },
    /// List notifications, optionally marking one as read
    Notifications {
        #[arg(long)]
        mark_read: Option<i64>,
        #[arg(long)]
        unread: bool,
    },
    /// Record counts per entity type
    Summary {
        #[arg(long)]
        refresh: bool,
    },
    /// Inspect or edit a user's dashboard layout
    Layout {
        #[arg(long)]
        user: String,
        #[command(subcommand)]
        action: LayoutAction,
    },
    /// Show an interview session and its first step
    Interview { session_key: String },
    /// Show the results of a completed interview
    Results { session_id: String },
    /// Store a token for later runs
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored token
    Logout,
}

#[derive(Subcommand)]
enum LayoutAction {
    Show,
    Add {
        id: String,
        widget_type: String,
        #[arg(long, default_value = "2")]
        w: u32,
        #[arg(long, default_value = "2")]
        h: u32,
        #[arg(long)]
        title: Option<String>,
    },
    /// Drop a widget on a cell; occupied targets relocate to the next free cell
    Move { id: String, x: u32, y: u32 },
    /// Replay a pointer drag in pixels: grab at one point, release at another
    Drag {
        id: String,
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
    },
    Resize { id: String, w: u32, h: u32 },
    Remove { id: String },
    Reset,
}

struct Settings {
    provider: Box<dyn ConfigProvider>,
    weights: ScoringWeights,
    metrics: GridMetrics,
}

fn load_settings(global: &CliConfig) -> recruit_desk::Result<Settings> {
    match &global.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let mut config = TomlConfig::from_file(path)?;
            config.apply_overrides(global);
            config.validate()?;
            Ok(Settings {
                weights: config.scoring_weights(),
                metrics: config.grid_metrics(),
                provider: Box::new(config),
            })
        }
        None => {
            global.validate()?;
            Ok(Settings {
                weights: ScoringWeights::default(),
                metrics: GridMetrics {
                    columns: global.grid_columns(),
                    ..GridMetrics::default()
                },
                provider: Box::new(global.clone()),
            })
        }
    }
}

fn parse_kinds(types: &[String]) -> recruit_desk::Result<Vec<EntityKind>> {
    if types.is_empty() {
        return Ok(EntityKind::ALL.to_vec());
    }
    types.iter().map(|t| t.parse()).collect()
}

fn parse_filter(spec: &str) -> recruit_desk::Result<FieldFilter> {
    FieldFilter::parse(spec).ok_or_else(|| DeskError::InvalidConfigValueError {
        field: "filter".to_string(),
        value: spec.to_string(),
        reason: "expected field=value".to_string(),
    })
}

fn parse_body(data: &str) -> recruit_desk::Result<serde_json::Value> {
    let body: serde_json::Value = serde_json::from_str(data)?;
    if !body.is_object() {
        return Err(DeskError::InvalidConfigValueError {
            field: "data".to_string(),
            value: data.to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok(body)
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results");
        return;
    }
    for result in results {
        println!(
            "{:>4}  {:<15} {:<30} {:<30} {}",
            result.score,
            result.kind.label(),
            result.title,
            result.subtitle,
            result.path
        );
    }
}

fn print_layout(layout: &DashboardLayout) {
    println!("Grid: {} columns, {} widgets", layout.columns, layout.widgets.len());
    for widget in &layout.widgets {
        println!(
            "  {:<20} {:<15} at ({}, {}) size {}x{}",
            widget.id, widget.widget_type, widget.x, widget.y, widget.w, widget.h
        );
    }
}

async fn run(cli: Cli, settings: Settings) -> recruit_desk::Result<()> {
    let storage = LocalStorage::new(settings.provider.data_dir().to_string());
    let session = SessionStore::new(storage.clone());

    let mut client = ApiClient::from_config(settings.provider.as_ref())?;
    if !client.has_token() {
        if let Some(token) = session.token().await? {
            tracing::debug!("Using token from stored session");
            client = client.with_token(token);
        }
    }

    let result = dispatch(cli.command, &settings, client, storage, &session).await;
    if let Err(e) = &result {
        session.handle_error(e).await?;
    }
    result
}

async fn dispatch(
    command: Command,
    settings: &Settings,
    client: ApiClient,
    storage: LocalStorage,
    session: &SessionStore<LocalStorage>,
) -> recruit_desk::Result<()> {
    let cache = DataCache::new(settings.provider.cache_duration());
    let search = SearchService::new(settings.weights.clone());

    match command {
        Command::Search {
            query,
            types,
            limit,
            refresh,
            json,
        } => {
            let options = SearchOptions::default()
                .with_kinds(&parse_kinds(&types)?)
                .with_limit(limit.unwrap_or_else(|| settings.provider.search_limit()));
            let mut engine = DeskEngine::new(client, cache, search);
            let results = engine.search(&query, &options, refresh).await?;
            tracing::info!("🔍 '{}' matched {} results", query, results.len());
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
            }
        }
        Command::List {
            kind,
            tab,
            filters,
            text,
            sort,
            desc,
            page,
            page_size,
            refresh,
            json,
        } => {
            let kind: EntityKind = kind.parse()?;
            let query = ListQuery {
                tab: tab.as_deref().map(parse_filter).transpose()?,
                filters: filters.iter().map(|f| parse_filter(f)).collect::<Result<_, _>>()?,
                text,
                sort_by: sort,
                order: if desc { SortOrder::Desc } else { SortOrder::Asc },
                page,
                page_size,
            };
            let mut engine = DeskEngine::new(client, cache, search);
            let page = engine.list(kind, &query, refresh).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                println!(
                    "{} {} (page {}/{})",
                    page.total,
                    kind,
                    page.page,
                    page.total_pages.max(1)
                );
                let fields = kind.display_fields();
                for record in &page.items {
                    println!(
                        "  #{:<6} {:<30} {}",
                        record.id().unwrap_or_default(),
                        record.first_text(fields.title).unwrap_or_default(),
                        record.first_text(fields.subtitle).unwrap_or_default()
                    );
                }
            }
        }
        Command::Show { kind, id } => {
            let mut engine = DeskEngine::new(client, cache, search);
            let record = engine.get(kind.parse()?, &id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Create { kind, data } => {
            let mut engine = DeskEngine::new(client, cache, search);
            let record = engine.create(kind.parse()?, &parse_body(&data)?).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Update { kind, id, data } => {
            let mut engine = DeskEngine::new(client, cache, search);
            let record = engine.update(kind.parse()?, &id, &parse_body(&data)?).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Delete { kind, id } => {
            let mut engine = DeskEngine::new(client, cache, search);
            engine.delete(kind.parse()?, &id).await?;
            println!("Deleted {} {}", kind, id);
        }
        Command::Notifications { mark_read, unread } => {
            if let Some(id) = mark_read {
                client.mark_notification_read(id).await?;
                println!("Marked notification {} as read", id);
            }
            for notification in client.notifications().await? {
                if unread && notification.is_read {
                    continue;
                }
                println!(
                    "{} #{:<5} {:<30} {}",
                    if notification.is_read { " " } else { "*" },
                    notification.id,
                    notification.title,
                    notification.message
                );
            }
        }
        Command::Summary { refresh } => {
            let mut engine = DeskEngine::new(client, cache, search);
            for entry in engine.summary(refresh).await? {
                println!("{:<16} {:>6}", entry.kind.label(), entry.count);
            }
        }
        Command::Layout { user, action } => {
            let store = LayoutStore::new(storage);
            let mut layout = store.load(&user, settings.metrics.columns).await?;
            match action {
                LayoutAction::Show => {
                    print_layout(&layout);
                    return Ok(());
                }
                LayoutAction::Add {
                    id,
                    widget_type,
                    w,
                    h,
                    title,
                } => {
                    let mut widget = DashboardWidget::new(&id, &widget_type, w, h);
                    widget.title = title.unwrap_or_default();
                    let (x, y) = layout.add_widget(widget)?;
                    println!("Added '{}' at ({}, {})", id, x, y);
                }
                LayoutAction::Move { id, x, y } => {
                    let placed = layout.place(&id, x, y)?;
                    if placed != (x, y) {
                        println!("Cell ({}, {}) is occupied, moved '{}' to {:?}", x, y, id, placed);
                    }
                }
                LayoutAction::Drag {
                    id,
                    from_x,
                    from_y,
                    to_x,
                    to_y,
                } => {
                    let mut drag = DragSession::new(layout, settings.metrics);
                    drag.mouse_down(&id, (from_x, from_y))?;
                    if let Some(cell) = drag.mouse_move((to_x, to_y)) {
                        tracing::debug!("Preview for '{}' at {:?}", id, cell);
                    }
                    if drag.mouse_up().is_none() {
                        println!("Nothing to commit for '{}'", id);
                    }
                    layout = drag.into_layout();
                }
                LayoutAction::Resize { id, w, h } => {
                    layout.resize_widget(&id, w, h)?;
                }
                LayoutAction::Remove { id } => {
                    layout.remove_widget(&id)?;
                }
                LayoutAction::Reset => {
                    store.reset(&user).await?;
                    println!("Layout for '{}' reset", user);
                    return Ok(());
                }
            }
            store.save(&user, &layout).await?;
            print_layout(&layout);
        }
        Command::Interview { session_key } => {
            let interview = client.interview_session(&session_key).await?;
            let wizard = InterviewWizard::new(interview);
            let details = wizard.session();
            println!("Interview {} for {} ({})", details.session_key, details.candidate_name, details.job_title);
            println!("{} questions, status: {}", details.questions.len(), details.status);
            println!("Next step: {}", wizard.step());
        }
        Command::Results { session_id } => {
            let results = client.interview_results(&session_id).await?;
            println!("Results for {}", results_path(&results.session_id));
            if let Some(score) = results.overall_score {
                println!("Overall score: {:.1}", score);
            }
            if !results.summary.is_empty() {
                println!("{}", results.summary);
            }
        }
        Command::Login { token } => {
            session.login(&token, &serde_json::Value::Null).await?;
            println!("✅ Token stored");
        }
        Command::Logout => {
            session.logout().await?;
            println!("Logged out");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.global.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.global.verbose);
    }

    tracing::debug!("Starting recruit-desk");

    let settings = match load_settings(&cli.global) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, settings).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

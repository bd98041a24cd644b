use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tconn")]
#[command(about = "Topic connection CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Reconciled connection queries
    Connections {
        #[command(subcommand)]
        cmd: ConnectionsCmd,
    },

    /// Upsert raw connection records from a JSON array file
    Ingest {
        /// Path to a JSON file holding an array of raw records
        #[arg(long)]
        file: String,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum ConnectionsCmd {
    /// Connections of one topic, broker self-traffic excluded
    Topic {
        #[arg(long)]
        cluster: i64,

        #[arg(long)]
        topic: String,

        /// Only this app's connections
        #[arg(long)]
        app: Option<String>,

        /// Window start, epoch millis (inclusive)
        #[arg(long = "start-ms")]
        start_ms: i64,

        /// Window end, epoch millis (inclusive)
        #[arg(long = "end-ms")]
        end_ms: i64,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Connections of one app across clusters
    App {
        #[arg(long)]
        app: String,

        #[arg(long = "start-ms")]
        start_ms: i64,

        #[arg(long = "end-ms")]
        end_ms: i64,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if missing.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = tconn_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = tconn_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_connections_table={}",
                        s.ok, s.has_connections_table
                    );
                }
                DbCmd::Migrate => {
                    tconn_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tconn_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Connections { cmd } => match cmd {
            ConnectionsCmd::Topic {
                cluster,
                topic,
                app,
                start_ms,
                end_ms,
                config_paths,
            } => {
                commands::connections::run_topic(commands::connections::TopicArgs {
                    cluster_id: cluster,
                    topic_name: &topic,
                    app_id: app.as_deref(),
                    start_ms,
                    end_ms,
                    config_paths: &config_paths,
                })
                .await?;
            }

            ConnectionsCmd::App {
                app,
                start_ms,
                end_ms,
                config_paths,
            } => {
                commands::connections::run_app(&app, start_ms, end_ms, &config_paths).await?;
            }
        },

        Commands::Ingest { file, config_paths } => {
            commands::ingest::run_ingest(&file, &config_paths).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries the JSON output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

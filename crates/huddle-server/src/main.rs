mod config;
mod serve;

use clap::{Parser, Subcommand};

use huddle_db::pool;

use config::HuddleConfig;

#[derive(Parser)]
#[command(name = "huddle", about = "Backend service for a social plans application")]
struct Cli {
    /// Database URL (overrides HUDDLE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a huddle config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/huddle")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the huddle database and run migrations
    DbInit,
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Execute the `huddle init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `huddle db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `huddle db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = HuddleConfig::resolve(cli_db_url)?;

    println!("Initializing huddle database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(&resolved.db_config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with table counts.
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    // 5. Clean shutdown.
    db_pool.close().await;

    println!("huddle db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = HuddleConfig::resolve(cli.database_url.as_deref())?;
            let bind = bind.unwrap_or(resolved.server.bind);
            let port = port.unwrap_or(resolved.server.port);

            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = serve::run_serve(db_pool.clone(), &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

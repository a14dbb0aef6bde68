//! Shared test harness for huddle integration tests.
//!
//! Every test in a binary shares one PostgreSQL server; every test gets its
//! own freshly migrated database inside it. The server comes from
//! `HUDDLE_TEST_PG_URL` when a setup script has already started one, and
//! from a lazily started testcontainers instance otherwise.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use huddle_db::pool;

/// The PostgreSQL server shared by every test in a binary.
struct PgServer {
    url: String,
    // Dropping the container stops it, so the handle lives as long as the
    // binary. `None` when an external server is supplied.
    _container: Option<ContainerAsync<Postgres>>,
}

static PG_SERVER: OnceCell<PgServer> = OnceCell::const_new();

/// Base URL of the shared server, with no database name appended.
async fn server_url() -> &'static str {
    let server = PG_SERVER
        .get_or_init(|| async {
            if let Ok(url) = std::env::var("HUDDLE_TEST_PG_URL") {
                return PgServer {
                    url,
                    _container: None,
                };
            }

            let container = Postgres::default()
                .with_tag("18")
                .start()
                .await
                .expect("failed to start PostgreSQL container");
            let host = container.get_host().await.expect("failed to get host");
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("failed to get mapped port");

            PgServer {
                url: format!("postgresql://postgres:postgres@{host}:{port}"),
                _container: Some(container),
            }
        })
        .await;
    &server.url
}

/// One connection to the `postgres` maintenance database, for CREATE and
/// DROP DATABASE statements.
async fn admin_connection() -> PgConnection {
    let url = format!("{}/postgres", server_url().await);
    PgConnection::connect(&url)
        .await
        .expect("failed to connect to the postgres maintenance database")
}

/// Create a uniquely named test database with the huddle schema applied.
///
/// Returns `(pool, db_name)`; pass `db_name` to [`drop_test_db`] when the
/// test is done.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("huddle_test_{}", Uuid::new_v4().simple());

    let mut admin = admin_connection().await;
    admin
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create test database {db_name}: {e}"));
    let _ = admin.close().await;

    let url = format!("{}/{db_name}", server_url().await);
    let test_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to test database {db_name}: {e}"));

    pool::run_migrations(&test_pool)
        .await
        .expect("migrations should succeed");

    (test_pool, db_name)
}

/// Drop a test database. Safe to call when it is already gone.
pub async fn drop_test_db(db_name: &str) {
    let mut admin = admin_connection().await;

    // Stray connections block DROP DATABASE.
    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = admin.execute(terminate.as_str()).await;
    let _ = admin
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    let _ = admin.close().await;
}

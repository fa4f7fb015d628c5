//! Postgres for tests that exercise SQL.
//!
//! One container is shared by the whole test binary and every test gets its
//! own freshly migrated database on it. Set `TEST_DATABASE_URL` to an admin
//! connection string to use an existing server instead of Docker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, Connection, PgPool,
};
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    auth::repo::User,
    generations::{self, dto::GenerationKind},
    generator::{AssetGenerator, PlaceholderGenerator},
    profiles,
};

static SHARED_PG: OnceCell<(Option<ContainerAsync<Postgres>>, PgConnectOptions)> =
    OnceCell::const_new();

static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

static CONTAINER_ID: OnceLock<String> = OnceLock::new();

extern "C" fn remove_container() {
    if let Some(id) = CONTAINER_ID.get() {
        let _ = std::process::Command::new("docker")
            .args(["rm", "-f", "-v", id])
            .output();
    }
}

async fn admin_options() -> PgConnectOptions {
    let (_, options) = SHARED_PG
        .get_or_init(|| async {
            if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
                let options = url.parse().expect("TEST_DATABASE_URL is a postgres url");
                return (None, options);
            }

            let container = Postgres::default()
                .start()
                .await
                .expect("start postgres container");
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("postgres container port");

            // Statics are never dropped, so remove the container at exit.
            let _ = CONTAINER_ID.set(container.id().to_string());
            unsafe { libc::atexit(remove_container) };

            let options = PgConnectOptions::new()
                .host("127.0.0.1")
                .port(port)
                .username("postgres")
                .password("postgres")
                .database("postgres");
            (Some(container), options)
        })
        .await;
    options.clone()
}

/// A pool on a new, migrated database nobody else uses.
pub async fn test_pool() -> PgPool {
    let admin = admin_options().await;
    let name = format!(
        "freegen_test_{}_{}",
        std::process::id(),
        DB_COUNTER.fetch_add(1, Ordering::SeqCst)
    );

    let mut conn = admin.connect().await.expect("connect to admin database");
    sqlx::query(&format!(r#"CREATE DATABASE "{name}""#))
        .execute(&mut conn)
        .await
        .expect("create test database");
    conn.close().await.ok();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(admin.database(&name))
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

/// User plus profile, with a password hash nothing can log in with.
pub async fn seed_user(db: &PgPool, username: &str) -> Uuid {
    let mut tx = db.begin().await.unwrap();
    let user = User::create_tx(&mut tx, &format!("{username}@example.com"), "!")
        .await
        .unwrap();
    profiles::repo::create_tx(&mut tx, user.id, username)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    user.id
}

pub async fn seed_generation(
    db: &PgPool,
    owner: Uuid,
    kind: GenerationKind,
    prompt: &str,
    public: bool,
) -> Uuid {
    let asset = PlaceholderGenerator::new("https://fake.local")
        .generate(kind, prompt)
        .await
        .unwrap();
    generations::repo::insert(db, owner, kind, prompt, public, asset)
        .await
        .unwrap()
        .id
}

/// Moves a generation's `created_at` into the past.
pub async fn backdate_generation(db: &PgPool, id: Uuid, hours: i32) {
    sqlx::query(
        "UPDATE generations SET created_at = now() - make_interval(hours => $2) WHERE id = $1",
    )
    .bind(id)
    .bind(hours)
    .execute(db)
    .await
    .unwrap();
}

pub async fn count_rows(db: &PgPool, table: &str, generation_id: Uuid) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE generation_id = $1"))
        .bind(generation_id)
        .fetch_one(db)
        .await
        .unwrap()
}

#![cfg(feature = "live-tests")]

//! Live integration test against a real Postgres instance.
//!
//! Exercises the full run path: keyset pagination over a seeded `articles`
//! table, dispatch to a mock orchestrator, checkpointing, and resume.
//!
//! Gated behind the `live-tests` feature flag. Requires `TEST_DATABASE_URL`
//! in the environment or `.env`, pointing at a DISPOSABLE database: the test
//! creates and truncates an `articles` table there.
//!
//! ```bash
//! cargo test --features live-tests --test live_postgres -- --nocapture
//! ```

mod common;

use chrono::{DateTime, TimeZone, Utc};
use rag_backfill::{BackfillConfig, Cursor, RunOutcome, run_backfill};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn prepare_articles_table(pool: &PgPool) {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS articles (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            body TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await
    .expect("create articles table");

    sqlx::query("TRUNCATE articles")
        .execute(pool)
        .await
        .expect("truncate articles table");
}

async fn insert_article(
    pool: &PgPool,
    id: &str,
    body: Option<&str>,
    created_at: DateTime<Utc>,
) {
    sqlx::query("INSERT INTO articles (id, title, body, created_at) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("title-{id}"))
        .bind(body)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("insert article");
}

async fn submitted_ids(server: &MockServer) -> HashSet<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| {
            let payload: serde_json::Value =
                serde_json::from_slice(&request.body).expect("json payload");
            payload["article_id"]
                .as_str()
                .expect("article_id field")
                .to_string()
        })
        .collect()
}

/// One test function owns the shared `articles` table for the whole flow:
/// initial run, body exclusions, checkpoint contents, and resume.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backfill_run_checkpoints_and_resumes_against_postgres() {
    skip_if_no_scratch_database!();

    let database_url = common::scratch_database_url();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("connect to scratch database");
    prepare_articles_table(&pool).await;

    let base = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).expect("timestamp");
    // Two articles share a timestamp so the id tiebreak is exercised.
    insert_article(&pool, "art-a", Some("body-a"), base).await;
    insert_article(&pool, "art-b", Some("body-b"), base).await;
    insert_article(&pool, "art-c", Some("body-c"), base + chrono::Duration::minutes(5)).await;
    // Neither of these may ever reach the orchestrator.
    insert_article(&pool, "art-null", None, base + chrono::Duration::minutes(1)).await;
    insert_article(&pool, "art-empty", Some(""), base + chrono::Duration::minutes(2)).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/internal/rag/backfill"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("temp dir");
    let cursor_file = dir.path().join("cursor.json");
    let config = BackfillConfig {
        database_url: database_url.clone(),
        orchestrator_url: server.uri(),
        cursor_file: cursor_file.clone(),
        batch_size: 2,
        ..BackfillConfig::default()
    };

    // First run drains the three articles with bodies.
    let outcome = run_backfill(&config, CancellationToken::new())
        .await
        .expect("first run");
    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.total, 3);
            assert_eq!(summary.success, 3);
            assert_eq!(summary.failed, 0);
        }
        other => panic!("expected completed run, got {other:?}"),
    }

    let ids = submitted_ids(&server).await;
    assert_eq!(
        ids,
        HashSet::from([
            "art-a".to_string(),
            "art-b".to_string(),
            "art-c".to_string()
        ]),
        "NULL and empty bodies must be filtered out in SQL"
    );

    let cursor = Cursor::load(&cursor_file).await.expect("load cursor");
    assert_eq!(cursor.last_id, "art-c");
    assert_eq!(cursor.processed_count, 3);

    // A later article appears; a resumed run picks up only that one.
    insert_article(&pool, "art-d", Some("body-d"), base + chrono::Duration::hours(1)).await;

    let outcome = run_backfill(&config, CancellationToken::new())
        .await
        .expect("resumed run");
    match outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.total, 1, "already processed articles must not repeat");
        }
        other => panic!("expected completed run, got {other:?}"),
    }

    let cursor = Cursor::load(&cursor_file).await.expect("load cursor");
    assert_eq!(cursor.last_id, "art-d");
    assert_eq!(cursor.processed_count, 4);

    pool.close().await;
}

#[allow(dead_code)]
mod helpers;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use outreach::config::WorkerConfig;
use outreach::db::DbContext;
use outreach::engine::{JobEngine, WorkerPool};
use outreach::error::{Error, Result};
use outreach::models::{JobStatus, ScrapeJob};
use outreach::scrape::{CanonicalProfile, Platform, ProfileSource};
use outreach::tenant::TenantId;
use sqlx::PgPool;
use uuid::Uuid;

fn test_engine(pool: &PgPool, source: Arc<dyn ProfileSource>) -> (DbContext, JobEngine) {
    let db = DbContext::new(pool.clone());
    let workers = WorkerConfig {
        concurrency: 4,
        recycle_after: 50,
        task_soft_limit: Duration::from_secs(50),
        task_hard_limit: Duration::from_secs(60),
    };
    let engine = JobEngine::new(
        db.clone(),
        source,
        WorkerPool::start(4, 50),
        workers,
        Duration::ZERO,
    );
    (db, engine)
}

fn canned_profile(id: usize, username: String) -> CanonicalProfile {
    CanonicalProfile {
        id: format!("id{id}"),
        display_name: String::new(),
        follower_count: 0,
        following_count: 0,
        posts_count: 0,
        username,
    }
}

/// Fixed dataset: 80 male-named profiles and 20 female-named ones.
struct CannedSource;

#[async_trait::async_trait]
impl ProfileSource for CannedSource {
    async fn scrape(
        &self,
        _platform: Platform,
        _accounts: &[String],
        _max_per_account: u32,
    ) -> Result<HashMap<String, CanonicalProfile>> {
        let mut profiles = HashMap::new();
        for i in 0..80 {
            let username = format!("john{i}");
            profiles.insert(username.clone(), canned_profile(i, username));
        }
        for i in 80..100 {
            let username = format!("maria{i}");
            profiles.insert(username.clone(), canned_profile(i, username));
        }
        Ok(profiles)
    }
}

/// Returns 40 distinct male-named profiles per call.
struct GeneratingSource {
    counter: AtomicUsize,
}

#[async_trait::async_trait]
impl ProfileSource for GeneratingSource {
    async fn scrape(
        &self,
        _platform: Platform,
        _accounts: &[String],
        _max_per_account: u32,
    ) -> Result<HashMap<String, CanonicalProfile>> {
        let mut profiles = HashMap::new();
        for _ in 0..40 {
            let i = self.counter.fetch_add(1, Ordering::SeqCst);
            let username = format!("david{i}");
            profiles.insert(username.clone(), canned_profile(i, username));
        }
        Ok(profiles)
    }
}

/// Like [`GeneratingSource`], but any batch containing the poison account
/// blows up.
struct PoisonedSource {
    inner: GeneratingSource,
}

#[async_trait::async_trait]
impl ProfileSource for PoisonedSource {
    async fn scrape(
        &self,
        platform: Platform,
        accounts: &[String],
        max_per_account: u32,
    ) -> Result<HashMap<String, CanonicalProfile>> {
        if accounts.iter().any(|a| a == "bad_account") {
            return Err(Error::Transient(anyhow::anyhow!(
                "upstream rejected the account batch"
            )));
        }
        self.inner.scrape(platform, accounts, max_per_account).await
    }
}

async fn wait_terminal(db: &DbContext, tenant: &TenantId, job_id: Uuid) -> ScrapeJob {
    for _ in 0..400 {
        let job = db.jobs().fetch(tenant, job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} did not reach a terminal state");
}

fn accounts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("account{i}")).collect()
}

// ── submission validation ───────────────────────────────────────────

#[sqlx::test]
async fn submit_rejects_empty_accounts(pool: PgPool) {
    let (_db, engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();

    let result = engine.submit(&tenant, vec![], "male", None).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[sqlx::test]
async fn submit_rejects_count_smaller_than_accounts(pool: PgPool) {
    let (_db, engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();

    let result = engine.submit(&tenant, accounts(11), "male", Some(5)).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[sqlx::test]
async fn submit_rejects_unknown_target_gender(pool: PgPool) {
    let (_db, engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();

    let result = engine.submit(&tenant, accounts(2), "everyone", None).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

// ── completion ──────────────────────────────────────────────────────

#[sqlx::test]
async fn single_batch_job_completes_with_filtered_results(pool: PgPool) {
    let (db, engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();

    // 11 accounts, 110 total: 10 per account, one batch
    let receipt = engine
        .submit(&tenant, accounts(11), "male", Some(110))
        .await
        .unwrap();
    assert_eq!(receipt.total_batches, 1);

    let job = wait_terminal(&db, &tenant, receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.max_count_per_account, 10);
    assert_eq!(job.total_scraped, Some(100));
    assert_eq!(job.total_filtered, Some(80));
    assert_eq!(job.profiles_scraped, 100);
    assert_eq!(job.current_batch, 1);
    assert_eq!(job.progress, 100.0);
    assert!(job.completed_at.is_some());

    let page = db
        .jobs()
        .fetch_results(&tenant, receipt.job_id, 1, 5000)
        .await
        .unwrap();
    assert_eq!(page.total, 80);
    assert_eq!(page.profiles.len(), 80);
    assert!(page.profiles.iter().all(|p| p.username.starts_with("john")));

    // Aggregation also feeds the tenant's profile pool.
    assert_eq!(helpers::pool_count(&pool, &tenant, true).await, 80);
    assert_eq!(helpers::raw_count(&pool, &tenant).await, 80);
}

#[sqlx::test]
async fn multi_batch_job_aggregates_across_batches(pool: PgPool) {
    let source = Arc::new(GeneratingSource {
        counter: AtomicUsize::new(0),
    });
    let (db, engine) = test_engine(&pool, source);
    let tenant = helpers::tenant();

    // 75 accounts: two batches of 50 + 25
    let receipt = engine.submit(&tenant, accounts(75), "male", None).await.unwrap();
    assert_eq!(receipt.total_batches, 2);

    let job = wait_terminal(&db, &tenant, receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.max_count_per_account, 5);
    assert_eq!(job.total_filtered, Some(80));
    assert_eq!(job.total_scraped, Some(80));
    assert_eq!(job.current_batch, 2);

    let page = db
        .jobs()
        .fetch_results(&tenant, receipt.job_id, 1, 5000)
        .await
        .unwrap();
    assert_eq!(page.total, 80);
}

// ── failure handling ────────────────────────────────────────────────

#[sqlx::test]
async fn failed_batch_preserves_partial_results(pool: PgPool) {
    let source = Arc::new(PoisonedSource {
        inner: GeneratingSource {
            counter: AtomicUsize::new(0),
        },
    });
    let (db, engine) = test_engine(&pool, source);
    let tenant = helpers::tenant();

    // Poison lands in the second batch (index 60 of 75).
    let mut accts = accounts(75);
    accts[60] = "bad_account".to_string();

    let receipt = engine.submit(&tenant, accts, "male", None).await.unwrap();
    assert_eq!(receipt.total_batches, 2);

    let job = wait_terminal(&db, &tenant, receipt.job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error_message.expect("failed job must carry an error");
    assert!(message.contains("batch 2"), "unexpected message: {message}");

    // The job flips to failed as soon as the batch errors; the barrier
    // persists batch 1's partial results shortly after.
    let mut count = 0i64;
    for _ in 0..400 {
        let (c,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scrape_results WHERE job_id = $1")
            .bind(receipt.job_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        count = c;
        if count == 40 && helpers::pool_count(&pool, &tenant, true).await == 40 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(count, 40);
    assert_eq!(helpers::pool_count(&pool, &tenant, true).await, 40);
}

// ── status and results queries ──────────────────────────────────────

#[sqlx::test]
async fn unknown_job_is_not_found(pool: PgPool) {
    let (db, _engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();

    let result = db.jobs().fetch(&tenant, Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}

#[sqlx::test]
async fn jobs_are_tenant_scoped(pool: PgPool) {
    let (db, engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();
    let other = helpers::other_tenant();

    let receipt = engine
        .submit(&tenant, accounts(2), "male", None)
        .await
        .unwrap();
    wait_terminal(&db, &tenant, receipt.job_id).await;

    let result = db.jobs().fetch(&other, receipt.job_id).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}

#[sqlx::test]
async fn results_are_refused_before_completion(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();

    // A queued job that never ran.
    let job_id = Uuid::new_v4();
    db.jobs()
        .insert(&tenant, job_id, &serde_json::json!(["a"]), "male", 5, 1)
        .await
        .unwrap();

    let result = db.jobs().fetch_results(&tenant, job_id, 1, 100).await;
    assert!(matches!(result, Err(Error::Precondition(_))));
}

#[sqlx::test]
async fn results_page_past_the_end_is_empty_with_correct_total(pool: PgPool) {
    let (db, engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();

    let receipt = engine
        .submit(&tenant, accounts(11), "male", Some(110))
        .await
        .unwrap();
    wait_terminal(&db, &tenant, receipt.job_id).await;

    let page = db
        .jobs()
        .fetch_results(&tenant, receipt.job_id, 10, 50)
        .await
        .unwrap();
    assert_eq!(page.total, 80);
    assert!(page.profiles.is_empty());
}

#[sqlx::test]
async fn results_pagination_covers_the_full_set(pool: PgPool) {
    let (db, engine) = test_engine(&pool, Arc::new(CannedSource));
    let tenant = helpers::tenant();

    let receipt = engine
        .submit(&tenant, accounts(11), "male", Some(110))
        .await
        .unwrap();
    wait_terminal(&db, &tenant, receipt.job_id).await;

    let mut seen = std::collections::HashSet::new();
    for page_number in 1..=4 {
        let page = db
            .jobs()
            .fetch_results(&tenant, receipt.job_id, page_number, 25)
            .await
            .unwrap();
        assert_eq!(page.total, 80);
        for profile in page.profiles {
            seen.insert(profile.username);
        }
    }
    assert_eq!(seen.len(), 80);
}

#[allow(dead_code)]
mod helpers;

use outreach::db::DbContext;
use outreach::error::Error;
use outreach::models::AssignmentState;
use outreach::pipeline::{distribute, select_daily_batch};
use outreach::store::{MemoryRecordStore, RecordStore};
use outreach::sync::{pull_statuses, push_campaign};
use sqlx::PgPool;
use uuid::Uuid;

/// Select and distribute a campaign over N=2, M=3, returning its id.
async fn distributed_campaign(db: &DbContext, pool: &PgPool, count: usize) -> Uuid {
    let tenant = helpers::tenant();
    helpers::seed_pool(pool, &tenant, count).await;
    let selection = select_daily_batch(db, &tenant, None, 2, 3).await.unwrap();
    distribute(db, &tenant, selection.campaign_id, 2, 3)
        .await
        .unwrap();
    selection.campaign_id
}

// ── push ────────────────────────────────────────────────────────────

#[sqlx::test]
async fn push_mirrors_every_queue(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = distributed_campaign(&db, &pool, 10).await;

    let report = push_campaign(&db, &store, &tenant, campaign_id).await.unwrap();
    assert_eq!(report.tables_synced, 2);
    assert_eq!(report.records_synced, 6);
    assert!(report.status);

    // Campaign flagged as fully mirrored.
    let campaign = db.campaigns().fetch(&tenant, campaign_id).await.unwrap();
    assert!(campaign.status);

    // Pushed rows carry position order and the pending state.
    let q1 = store.list_records(&tenant, "WorkQueue_01").await.unwrap();
    assert_eq!(q1.len(), 3);
    assert_eq!(
        q1.iter().map(|r| r.fields.position).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(q1.iter().all(|r| r.fields.state == AssignmentState::Pending));
}

#[sqlx::test]
async fn push_short_campaign_counts_partial_queues(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = distributed_campaign(&db, &pool, 4).await;

    let report = push_campaign(&db, &store, &tenant, campaign_id).await.unwrap();
    assert_eq!(report.tables_synced, 2);
    assert_eq!(report.records_synced, 4);
    assert!(report.status);
}

#[sqlx::test]
async fn repush_does_not_duplicate_records(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = distributed_campaign(&db, &pool, 10).await;

    push_campaign(&db, &store, &tenant, campaign_id).await.unwrap();
    let report = push_campaign(&db, &store, &tenant, campaign_id).await.unwrap();

    // Clear-before-push keeps the mirror at exactly one row per slot.
    assert_eq!(report.records_synced, 6);
    assert_eq!(store.record_count(&tenant), 6);
}

#[sqlx::test]
async fn push_requires_a_distributed_campaign(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    helpers::seed_pool(&pool, &tenant, 6).await;

    let selection = select_daily_batch(&db, &tenant, None, 2, 3).await.unwrap();
    let result = push_campaign(&db, &store, &tenant, selection.campaign_id).await;
    assert!(matches!(result, Err(Error::Precondition(_))));
}

#[sqlx::test]
async fn push_unknown_campaign_is_not_found(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();

    let result = push_campaign(&db, &store, &tenant, Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}

// ── round-trip laws ─────────────────────────────────────────────────

#[sqlx::test]
async fn roundtrip_without_edits_changes_nothing(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = distributed_campaign(&db, &pool, 10).await;

    push_campaign(&db, &store, &tenant, campaign_id).await.unwrap();
    let synced = pull_statuses(&db, &store, &tenant, 2).await.unwrap();

    assert_eq!(synced, 0);
    let states = helpers::assignment_states(&pool, &tenant, campaign_id).await;
    assert!(states.iter().all(|(_, state, ..)| state == "pending"));
}

#[sqlx::test]
async fn pull_applies_operator_edits(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = distributed_campaign(&db, &pool, 10).await;

    push_campaign(&db, &store, &tenant, campaign_id).await.unwrap();

    // Operator marks the first record in queue 1 as followed.
    let q1 = store.list_records(&tenant, "WorkQueue_01").await.unwrap();
    let edited_profile = q1[0].fields.profile_id.clone();
    assert!(store.edit_state(&tenant, "WorkQueue_01", &edited_profile, AssignmentState::Followed));

    let synced = pull_statuses(&db, &store, &tenant, 2).await.unwrap();
    assert_eq!(synced, 1);

    let states = helpers::assignment_states(&pool, &tenant, campaign_id).await;
    for (profile_id, state, ..) in &states {
        if *profile_id == edited_profile {
            assert_eq!(state, "followed");
        } else {
            assert_eq!(state, "pending");
        }
    }
}

#[sqlx::test]
async fn pull_is_idempotent(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = distributed_campaign(&db, &pool, 10).await;

    push_campaign(&db, &store, &tenant, campaign_id).await.unwrap();
    let q2 = store.list_records(&tenant, "WorkQueue_02").await.unwrap();
    store.edit_state(
        &tenant,
        "WorkQueue_02",
        &q2[1].fields.profile_id,
        AssignmentState::Completed,
    );

    let first = pull_statuses(&db, &store, &tenant, 2).await.unwrap();
    let second = pull_statuses(&db, &store, &tenant, 2).await.unwrap();

    assert_eq!(first, 1);
    // Already reconciled; the repeat run finds no differences.
    assert_eq!(second, 0);
}

#[sqlx::test]
async fn pull_ignores_records_without_a_matching_assignment(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();

    store
        .create_records(
            &tenant,
            "WorkQueue_01",
            &[outreach::store::QueueRecord {
                profile_id: "ghost".to_string(),
                username: "ghost".to_string(),
                display_name: String::new(),
                platform: "instagram".to_string(),
                position: 1,
                campaign_date: chrono::Utc::now().date_naive(),
                state: AssignmentState::Followed,
            }],
        )
        .await
        .unwrap();

    let synced = pull_statuses(&db, &store, &tenant, 2).await.unwrap();
    assert_eq!(synced, 0);
}

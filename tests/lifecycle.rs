#[allow(dead_code)]
mod helpers;

use outreach::db::DbContext;
use outreach::lifecycle::{delete_completed_after_delay, mark_unfollow_due, purge_old_telemetry};
use outreach::models::AssignmentState;
use outreach::pipeline::{distribute, select_daily_batch};
use outreach::store::{MemoryRecordStore, RecordStore};
use outreach::sync::{pull_statuses, push_campaign};
use sqlx::PgPool;
use uuid::Uuid;

/// Build a fully mirrored campaign over N=2, M=3.
async fn mirrored_campaign(
    db: &DbContext,
    pool: &PgPool,
    store: &MemoryRecordStore,
    count: usize,
) -> Uuid {
    let tenant = helpers::tenant();
    helpers::seed_pool(pool, &tenant, count).await;
    let selection = select_daily_batch(db, &tenant, None, 2, 3).await.unwrap();
    distribute(db, &tenant, selection.campaign_id, 2, 3)
        .await
        .unwrap();
    push_campaign(db, store, &tenant, selection.campaign_id)
        .await
        .unwrap();
    selection.campaign_id
}

// ── aging ───────────────────────────────────────────────────────────

#[sqlx::test]
async fn young_assignments_are_not_aged(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    mirrored_campaign(&db, &pool, &store, 6).await;

    let marked = mark_unfollow_due(&db, &store, &tenant).await.unwrap();
    assert_eq!(marked, 0);
}

#[sqlx::test]
async fn aging_transitions_pending_and_followed(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = mirrored_campaign(&db, &pool, &store, 6).await;

    // One operator got as far as following; the rest stayed pending.
    let q1 = store.list_records(&tenant, "WorkQueue_01").await.unwrap();
    store.edit_state(
        &tenant,
        "WorkQueue_01",
        &q1[0].fields.profile_id,
        AssignmentState::Followed,
    );
    pull_statuses(&db, &store, &tenant, 2).await.unwrap();

    helpers::backdate_assignments(&pool, &tenant, "-8 days").await;

    let marked = mark_unfollow_due(&db, &store, &tenant).await.unwrap();
    assert_eq!(marked, 6);

    // Internal rows all aged to unfollow.
    let states = helpers::assignment_states(&pool, &tenant, campaign_id).await;
    assert!(states.iter().all(|(_, state, ..)| state == "unfollow"));

    // External mirror followed.
    for table in ["WorkQueue_01", "WorkQueue_02"] {
        let records = store.list_records(&tenant, table).await.unwrap();
        assert!(
            records
                .iter()
                .all(|r| r.fields.state == AssignmentState::Unfollow)
        );
    }
}

// ── delayed deletion ────────────────────────────────────────────────

#[sqlx::test]
async fn completed_rows_survive_the_first_24_hours(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = mirrored_campaign(&db, &pool, &store, 6).await;

    let q1 = store.list_records(&tenant, "WorkQueue_01").await.unwrap();
    store.edit_state(
        &tenant,
        "WorkQueue_01",
        &q1[0].fields.profile_id,
        AssignmentState::Completed,
    );
    pull_statuses(&db, &store, &tenant, 2).await.unwrap();

    let deleted = delete_completed_after_delay(&db, &store, &tenant).await.unwrap();
    assert_eq!(deleted, 0);
    assert_eq!(
        helpers::assignment_states(&pool, &tenant, campaign_id)
            .await
            .len(),
        6
    );
}

#[sqlx::test]
async fn full_lifecycle_ages_completes_and_deletes(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = mirrored_campaign(&db, &pool, &store, 6).await;

    // Day 8: everything ages to unfollow, mirrored externally.
    helpers::backdate_assignments(&pool, &tenant, "-8 days").await;
    mark_unfollow_due(&db, &store, &tenant).await.unwrap();

    // The operator then completes one profile in the external store.
    let q1 = store.list_records(&tenant, "WorkQueue_01").await.unwrap();
    let completed_profile = q1[0].fields.profile_id.clone();
    store.edit_state(
        &tenant,
        "WorkQueue_01",
        &completed_profile,
        AssignmentState::Completed,
    );
    pull_statuses(&db, &store, &tenant, 2).await.unwrap();

    // 25 hours later the completed row is deleted, external first.
    helpers::backdate_assignment_updates(&pool, &tenant, "-25 hours").await;
    let deleted = delete_completed_after_delay(&db, &store, &tenant).await.unwrap();
    assert_eq!(deleted, 1);

    let states = helpers::assignment_states(&pool, &tenant, campaign_id).await;
    assert_eq!(states.len(), 5);
    assert!(states.iter().all(|(id, ..)| *id != completed_profile));

    let q1_after = store.list_records(&tenant, "WorkQueue_01").await.unwrap();
    assert!(
        q1_after
            .iter()
            .all(|r| r.fields.profile_id != completed_profile)
    );
}

// ── telemetry purge ─────────────────────────────────────────────────

#[sqlx::test]
async fn purge_drops_old_telemetry_but_not_the_pool(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    mirrored_campaign(&db, &pool, &store, 6).await;

    // Raw events from the scrape that fed the pool.
    db.profiles()
        .ingest_batch(
            &tenant,
            &[helpers::profile("900", "old_raw", "Old Raw")],
            std::time::Duration::ZERO,
        )
        .await
        .unwrap();

    // Age everything past the 8-day horizon.
    sqlx::query("UPDATE raw_profiles SET scraped_at = scraped_at - INTERVAL '9 days' WHERE tenant_id = $1")
        .bind(&tenant)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE campaigns SET campaign_date = campaign_date - INTERVAL '9 days' WHERE tenant_id = $1")
        .bind(&tenant)
        .execute(&pool)
        .await
        .unwrap();
    helpers::backdate_assignments(&pool, &tenant, "-9 days").await;

    let report = purge_old_telemetry(&db, &tenant).await.unwrap();
    assert_eq!(report.raw_profiles, 1);
    assert_eq!(report.campaigns, 1);
    assert_eq!(report.assignments, 6);

    // The deduplicated pool is never purged.
    assert_eq!(helpers::pool_count(&pool, &tenant, false).await, 7);
}

#[sqlx::test]
async fn purge_keeps_recent_rows(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    let store = MemoryRecordStore::new();
    let campaign_id = mirrored_campaign(&db, &pool, &store, 6).await;

    let report = purge_old_telemetry(&db, &tenant).await.unwrap();
    assert_eq!(report.campaigns, 0);
    assert_eq!(report.assignments, 0);
    assert_eq!(
        helpers::assignment_states(&pool, &tenant, campaign_id)
            .await
            .len(),
        6
    );
}

#[allow(dead_code)]
mod helpers;

use std::collections::HashSet;

use outreach::db::DbContext;
use outreach::error::Error;
use outreach::pipeline::select_daily_batch;
use sqlx::PgPool;

// ── select_unused / mark_used ───────────────────────────────────────

#[sqlx::test]
async fn select_unused_respects_the_limit(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    helpers::seed_pool(&pool, &tenant, 10).await;

    let batch = db.profiles().select_unused(&tenant, 4).await.unwrap();
    assert_eq!(batch.len(), 4);
    assert!(batch.iter().all(|p| !p.used));
}

#[sqlx::test]
async fn mark_used_flips_only_unused_rows(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    helpers::seed_pool(&pool, &tenant, 3).await;

    let ids = vec!["p1".to_string(), "p2".to_string()];
    let marked = db.profiles().mark_used(&tenant, &ids).await.unwrap();
    assert_eq!(marked, 2);
    assert!(helpers::used_at(&pool, &tenant, "p1").await.is_some());

    // Second call finds nothing left to flip.
    let marked_again = db.profiles().mark_used(&tenant, &ids).await.unwrap();
    assert_eq!(marked_again, 0);
    assert_eq!(helpers::pool_count(&pool, &tenant, true).await, 1);
}

#[sqlx::test]
async fn selection_does_not_cross_tenants(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant_a = helpers::tenant();
    let tenant_b = helpers::other_tenant();
    helpers::seed_pool(&pool, &tenant_a, 5).await;

    let batch = db.profiles().select_unused(&tenant_b, 10).await.unwrap();
    assert!(batch.is_empty());
}

// ── select_daily_batch ──────────────────────────────────────────────

#[sqlx::test]
async fn daily_select_caps_at_queue_capacity(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    helpers::seed_pool(&pool, &tenant, 10).await;

    // N=2, M=3: capacity 6 of the 10 available
    let outcome = select_daily_batch(&db, &tenant, None, 2, 3).await.unwrap();
    assert_eq!(outcome.total_selected, 6);
    assert_eq!(helpers::pool_count(&pool, &tenant, true).await, 4);

    let states = helpers::assignment_states(&pool, &tenant, outcome.campaign_id).await;
    assert_eq!(states.len(), 6);
    assert!(
        states
            .iter()
            .all(|(_, state, queue, position)| state == "pending" && *queue == 0 && *position == 0)
    );
}

#[sqlx::test]
async fn daily_select_takes_the_whole_short_pool(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    helpers::seed_pool(&pool, &tenant, 4).await;

    let outcome = select_daily_batch(&db, &tenant, None, 2, 3).await.unwrap();
    assert_eq!(outcome.total_selected, 4);
    assert_eq!(helpers::pool_count(&pool, &tenant, true).await, 0);
}

#[sqlx::test]
async fn daily_select_fails_on_an_empty_pool(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();

    let result = select_daily_batch(&db, &tenant, None, 2, 3).await;
    assert!(matches!(result, Err(Error::NoProfilesAvailable)));
}

#[sqlx::test]
async fn consecutive_selections_are_disjoint(pool: PgPool) {
    let db = DbContext::new(pool.clone());
    let tenant = helpers::tenant();
    helpers::seed_pool(&pool, &tenant, 12).await;

    let first = select_daily_batch(&db, &tenant, None, 2, 3).await.unwrap();
    let second = select_daily_batch(&db, &tenant, None, 2, 3).await.unwrap();

    let ids_of = |campaign_id| {
        let pool = pool.clone();
        let tenant = tenant.clone();
        async move {
            helpers::assignment_states(&pool, &tenant, campaign_id)
                .await
                .into_iter()
                .map(|(profile_id, ..)| profile_id)
                .collect::<HashSet<_>>()
        }
    };

    let first_ids = ids_of(first.campaign_id).await;
    let second_ids = ids_of(second.campaign_id).await;

    assert_eq!(first_ids.len(), 6);
    assert_eq!(second_ids.len(), 6);
    assert!(first_ids.is_disjoint(&second_ids));
}

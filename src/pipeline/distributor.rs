//! Random distribution of placeholder assignments across worker queues.

use rand::seq::SliceRandom;
use tracing::info;
use uuid::Uuid;

use crate::db::{DbContext, SlotUpdate};
use crate::error::{Error, Result};
use crate::tenant::TenantId;

/// Outcome of distributing one campaign.
#[derive(Debug, serde::Serialize)]
pub struct DistributionReport {
    /// Largest queue index at which any slot was filled.
    pub tables_used: u32,
    pub total_distributed: usize,
    /// Placeholders left unassigned because every slot was taken.
    pub overflow: usize,
}

/// Queue/position pairs for the first `count` items of a shuffled list.
///
/// Fills queue 1 positions 1..=M, then queue 2, and so on; anything beyond
/// `num_queues * per_queue` is overflow and stays placeholder.
fn pack_slots(count: usize, num_queues: u32, per_queue: u32) -> Vec<(i32, i32)> {
    let capacity = (num_queues as usize) * (per_queue as usize);
    let packed = count.min(capacity);
    let mut slots = Vec::with_capacity(packed);

    let mut queue: i32 = 1;
    let mut position: i32 = 1;
    for _ in 0..packed {
        slots.push((queue, position));
        position += 1;
        if position > per_queue as i32 {
            position = 1;
            queue += 1;
        }
    }

    slots
}

/// Shuffle the campaign's placeholders and pack them into queue slots.
///
/// The shuffle draws fresh entropy each run; the packing that follows is
/// deterministic. Re-running against an already-distributed campaign is a
/// precondition failure, never a re-shuffle.
pub async fn distribute(
    db: &DbContext,
    tenant: &TenantId,
    campaign_id: Uuid,
    num_queues: u32,
    profiles_per_queue: u32,
) -> Result<DistributionReport> {
    // Existence check doubles as the CampaignNotFound error.
    db.campaigns().fetch(tenant, campaign_id).await?;

    if db.assignments().count_packed(tenant, campaign_id).await? > 0 {
        return Err(Error::precondition(format!(
            "campaign {campaign_id} is already distributed"
        )));
    }

    let mut placeholders = db.assignments().fetch_placeholders(tenant, campaign_id).await?;
    if placeholders.is_empty() {
        return Ok(DistributionReport {
            tables_used: 0,
            total_distributed: 0,
            overflow: 0,
        });
    }

    {
        let mut rng = rand::rng();
        placeholders.shuffle(&mut rng);
    }

    let slots = pack_slots(placeholders.len(), num_queues, profiles_per_queue);
    let overflow = placeholders.len() - slots.len();
    let tables_used = slots.last().map(|(q, _)| *q as u32).unwrap_or(0);

    let updates: Vec<SlotUpdate> = placeholders
        .iter()
        .zip(slots.iter())
        .map(|(a, &(queue_index, position))| SlotUpdate {
            assignment_id: a.assignment_id,
            queue_index,
            position,
        })
        .collect();

    let total_distributed = db.assignments().assign_slots(tenant, &updates).await? as usize;

    info!(
        tenant_id = %tenant,
        %campaign_id,
        total_distributed,
        tables_used,
        overflow,
        "campaign distributed"
    );

    Ok(DistributionReport {
        tables_used,
        total_distributed,
        overflow,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_exactly_into_queues() {
        // 6 items over 2 queues of 3
        let slots = pack_slots(6, 2, 3);
        assert_eq!(
            slots,
            vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3)]
        );
    }

    #[test]
    fn short_pool_fills_a_partial_last_queue() {
        let slots = pack_slots(4, 2, 3);
        assert_eq!(slots, vec![(1, 1), (1, 2), (1, 3), (2, 1)]);
        assert_eq!(slots.last().unwrap().0, 2);
    }

    #[test]
    fn overflow_is_truncated_at_capacity() {
        let slots = pack_slots(10, 2, 3);
        assert_eq!(slots.len(), 6);
        assert_eq!(slots.last(), Some(&(2, 3)));
    }

    #[test]
    fn packed_slots_are_contiguous_and_unique() {
        let slots = pack_slots(100, 7, 9);
        let mut seen = std::collections::HashSet::new();
        for &(q, p) in &slots {
            assert!((1..=7).contains(&q));
            assert!((1..=9).contains(&p));
            assert!(seen.insert((q, p)), "duplicate slot ({q}, {p})");
        }
        assert_eq!(slots.len(), 63);
    }

    #[test]
    fn empty_input_packs_nothing() {
        assert!(pack_slots(0, 5, 5).is_empty());
    }
}

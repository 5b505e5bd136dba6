//! Repository for the `npc_intents` junction table.
//!
//! An NPC's intent set is only ever replaced wholesale: the existing rows
//! are cleared and the new set inserted inside one transaction, with the
//! NPC row locked so concurrent replacements for the same NPC serialize.

use sqlx::{PgConnection, PgExecutor, PgPool};
use talkbox_core::types::DbId;

use crate::models::intent::IntentWithPhrases;
use crate::repositories::intent_repo::INTENT_WITH_PHRASES;

/// NPC ↔ intent association store.
pub struct NpcIntentRepo;

impl NpcIntentRepo {
    /// Replace the NPC's entire intent set with `intent_ids`.
    ///
    /// Ids that do not exist in the catalog are skipped rather than failing
    /// the call; duplicates collapse. Returns the resulting intent list, or
    /// `None` if the NPC does not exist.
    pub async fn set_intents(
        pool: &PgPool,
        npc_id: DbId,
        intent_ids: &[DbId],
    ) -> Result<Option<Vec<IntentWithPhrases>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !Self::lock_npc(&mut tx, npc_id).await? {
            return Ok(None);
        }
        Self::replace_in(&mut tx, npc_id, intent_ids).await?;
        let intents = Self::fetch_for_npc(&mut *tx, npc_id).await?;

        tx.commit().await?;
        Ok(Some(intents))
    }

    /// List the NPC's intents ordered by intent ID. `None` if the NPC does not exist.
    pub async fn list_for_npc(
        pool: &PgPool,
        npc_id: DbId,
    ) -> Result<Option<Vec<IntentWithPhrases>>, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, DbId>("SELECT id FROM npcs WHERE id = $1")
            .bind(npc_id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }
        Self::fetch_for_npc(pool, npc_id).await.map(Some)
    }

    /// Raw association rows for an NPC id, without checking the NPC exists.
    ///
    /// Empty for a removed NPC.
    pub async fn intent_ids_for_npc(pool: &PgPool, npc_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT intent_id FROM npc_intents WHERE npc_id = $1 ORDER BY intent_id",
        )
        .bind(npc_id)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Take a row lock on the NPC. Returns `false` if it does not exist.
    pub(crate) async fn lock_npc(conn: &mut PgConnection, npc_id: DbId) -> Result<bool, sqlx::Error> {
        let locked = sqlx::query_scalar::<_, DbId>("SELECT id FROM npcs WHERE id = $1 FOR UPDATE")
            .bind(npc_id)
            .fetch_optional(conn)
            .await?;
        Ok(locked.is_some())
    }

    /// Replace intent associations within an existing transaction.
    pub(crate) async fn replace_in(
        conn: &mut PgConnection,
        npc_id: DbId,
        intent_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM npc_intents WHERE npc_id = $1")
            .bind(npc_id)
            .execute(&mut *conn)
            .await?;

        let inserted = sqlx::query(
            "INSERT INTO npc_intents (npc_id, intent_id)
             SELECT $1, id FROM intents WHERE id = ANY($2)
             ON CONFLICT DO NOTHING",
        )
        .bind(npc_id)
        .bind(intent_ids)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        let mut requested = intent_ids.to_vec();
        requested.sort_unstable();
        requested.dedup();
        let skipped = (requested.len() as u64).saturating_sub(inserted);
        if skipped > 0 {
            tracing::debug!(npc_id, skipped, "Unknown intent ids skipped during replace");
        }
        Ok(())
    }

    pub(crate) async fn fetch_for_npc<'e>(
        executor: impl PgExecutor<'e>,
        npc_id: DbId,
    ) -> Result<Vec<IntentWithPhrases>, sqlx::Error> {
        let query = format!(
            "SELECT {INTENT_WITH_PHRASES}
             FROM npc_intents ni
             JOIN intents i ON i.id = ni.intent_id
             WHERE ni.npc_id = $1
             ORDER BY i.id"
        );
        sqlx::query_as::<_, IntentWithPhrases>(&query)
            .bind(npc_id)
            .fetch_all(executor)
            .await
    }
}

//! Read projection of an NPC's intents for classifier training.

use sqlx::PgPool;
use talkbox_core::classifier::TrainingIntent;
use talkbox_core::types::DbId;

use crate::models::intent::IntentWithPhrases;
use crate::repositories::npc_intent_repo::NpcIntentRepo;

/// Assembles the training material for an NPC.
pub struct IntentCatalogRepo;

impl IntentCatalogRepo {
    /// Export the NPC's intents with their patterns and responses.
    ///
    /// Runs in a read-only `REPEATABLE READ` transaction so the existence
    /// check and the export observe the same snapshot. Phrase order is
    /// insertion order. Returns `None` if the NPC does not exist.
    pub async fn export(
        pool: &PgPool,
        npc_id: DbId,
    ) -> Result<Option<Vec<IntentWithPhrases>>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let exists = sqlx::query_scalar::<_, DbId>("SELECT id FROM npcs WHERE id = $1")
            .bind(npc_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let intents = NpcIntentRepo::fetch_for_npc(&mut *tx, npc_id).await?;
        tx.commit().await?;
        Ok(Some(intents))
    }

    /// [`export`](Self::export) converted into classifier training input.
    pub async fn training_snapshot(
        pool: &PgPool,
        npc_id: DbId,
    ) -> Result<Option<Vec<TrainingIntent>>, sqlx::Error> {
        let exported = Self::export(pool, npc_id).await?;
        Ok(exported.map(|intents| intents.into_iter().map(TrainingIntent::from).collect()))
    }
}

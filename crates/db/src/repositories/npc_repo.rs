//! Repository for the `npcs` table and the `project_npcs` roster.

use sqlx::PgPool;
use talkbox_core::types::DbId;

use crate::models::npc::{intent_ids, CreateNpc, Npc, NpcDetail, NpcRemoval, UpdateNpc};
use crate::repositories::npc_intent_repo::NpcIntentRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, avatar, bio, voice, style, created_at, updated_at";

/// Provides CRUD operations for NPCs and their project roster entry.
pub struct NpcRepo;

impl NpcRepo {
    /// Create an NPC on a project's roster, returning the created row.
    ///
    /// Returns `None` if the project does not exist. The NPC row, its roster
    /// entry and its initial intent set are written in one transaction.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreateNpc,
    ) -> Result<Option<Npc>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_scalar::<_, DbId>("SELECT id FROM projects WHERE id = $1 FOR SHARE")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
        if project.is_none() {
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO npcs (name, avatar, bio, voice, style)
             VALUES ($1, $2, COALESCE($3, ''), $4, $5)
             RETURNING {COLUMNS}"
        );
        let npc = sqlx::query_as::<_, Npc>(&query)
            .bind(&input.name)
            .bind(&input.avatar)
            .bind(&input.bio)
            .bind(&input.voice)
            .bind(&input.style)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO project_npcs (project_id, npc_id) VALUES ($1, $2)")
            .bind(project_id)
            .bind(npc.id)
            .execute(&mut *tx)
            .await?;

        if !input.intents.is_empty() {
            NpcIntentRepo::replace_in(&mut tx, npc.id, &intent_ids(&input.intents)).await?;
        }

        tx.commit().await?;
        tracing::info!(npc_id = npc.id, project_id, "NPC created");
        Ok(Some(npc))
    }

    /// Find an NPC by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Npc>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM npcs WHERE id = $1");
        sqlx::query_as::<_, Npc>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an NPC together with its project id and intents.
    pub async fn find_detail(pool: &PgPool, id: DbId) -> Result<Option<NpcDetail>, sqlx::Error> {
        let Some(npc) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let project_id = Self::project_id_for(pool, id).await?;
        let intents = NpcIntentRepo::fetch_for_npc(pool, id).await?;
        Ok(Some(NpcDetail {
            npc,
            project_id,
            intents,
        }))
    }

    /// List NPCs ordered by ID.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Npc>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM npcs ORDER BY id LIMIT $1 OFFSET $2");
        sqlx::query_as::<_, Npc>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List the NPCs on a project's roster, ordered by name ascending.
    pub async fn list_by_project(pool: &PgPool, project_id: DbId) -> Result<Vec<Npc>, sqlx::Error> {
        sqlx::query_as::<_, Npc>(
            "SELECT n.id, n.name, n.avatar, n.bio, n.voice, n.style, n.created_at, n.updated_at
             FROM npcs n
             JOIN project_npcs pn ON pn.npc_id = n.id
             WHERE pn.project_id = $1
             ORDER BY n.name ASC, n.id ASC",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// The project whose roster holds this NPC.
    pub async fn project_id_for(pool: &PgPool, npc_id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT project_id FROM project_npcs WHERE npc_id = $1")
            .bind(npc_id)
            .fetch_optional(pool)
            .await
    }

    /// Update an NPC. Only non-`None` fields in `input` are applied; a
    /// present `intents` list replaces the whole intent set in the same
    /// transaction. `avatar` is `Option<Option<String>>` so it can be
    /// cleared.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateNpc,
    ) -> Result<Option<Npc>, sqlx::Error> {
        let avatar_provided = input.avatar.is_some();
        let avatar_value = input.avatar.as_ref().and_then(|v| v.as_deref());

        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE npcs SET
                name = COALESCE($2, name),
                avatar = CASE WHEN $3 THEN $4 ELSE avatar END,
                bio = COALESCE($5, bio),
                voice = COALESCE($6, voice),
                style = COALESCE($7, style),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let npc = sqlx::query_as::<_, Npc>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(avatar_provided)
            .bind(avatar_value)
            .bind(&input.bio)
            .bind(&input.voice)
            .bind(&input.style)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(ref npc) = npc {
            if let Some(ref intents) = input.intents {
                NpcIntentRepo::replace_in(&mut tx, npc.id, &intent_ids(intents)).await?;
            }
        }

        tx.commit().await?;
        Ok(npc)
    }

    /// Remove an NPC with its roster entry and intent associations.
    ///
    /// An NPC that is on no project roster is reported as
    /// [`NpcRemoval::Orphaned`] and left untouched.
    pub async fn remove(pool: &PgPool, id: DbId) -> Result<NpcRemoval, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !NpcIntentRepo::lock_npc(&mut tx, id).await? {
            return Ok(NpcRemoval::NotFound);
        }

        let project_id =
            sqlx::query_scalar::<_, DbId>("SELECT project_id FROM project_npcs WHERE npc_id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(project_id) = project_id else {
            tracing::warn!(npc_id = id, "Refusing to remove NPC without an owning project");
            return Ok(NpcRemoval::Orphaned);
        };

        sqlx::query("DELETE FROM npc_intents WHERE npc_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM project_npcs WHERE npc_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM npcs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(npc_id = id, project_id, "NPC removed");
        Ok(NpcRemoval::Removed)
    }
}

//! Repository for the `intents`, `patterns` and `responses` tables.

use sqlx::PgPool;
use talkbox_core::types::DbId;

use crate::models::intent::{CreateIntent, IntentWithPhrases, Phrase};

/// Select list for [`IntentWithPhrases`] over an `intents` alias `i`.
///
/// Phrases are aggregated in row-id order, which is insertion order.
pub(crate) const INTENT_WITH_PHRASES: &str = "i.id, i.tag, \
     COALESCE((SELECT array_agg(p.text ORDER BY p.id) FROM patterns p WHERE p.intent_id = i.id), \
              '{}'::text[]) AS patterns, \
     COALESCE((SELECT array_agg(r.text ORDER BY r.id) FROM responses r WHERE r.intent_id = i.id), \
              '{}'::text[]) AS responses";

const PHRASE_COLUMNS: &str = "id, intent_id, text, created_at";

/// Provides create/read/delete operations for intents and their phrases.
pub struct IntentRepo;

impl IntentRepo {
    /// Insert an intent with its initial patterns and responses.
    ///
    /// A duplicate tag violates `uq_intents_tag` and fails the whole insert.
    pub async fn create(
        pool: &PgPool,
        input: &CreateIntent,
    ) -> Result<IntentWithPhrases, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let id = sqlx::query_scalar::<_, DbId>("INSERT INTO intents (tag) VALUES ($1) RETURNING id")
            .bind(&input.tag)
            .fetch_one(&mut *tx)
            .await?;

        for pattern in &input.patterns {
            sqlx::query("INSERT INTO patterns (intent_id, text) VALUES ($1, $2)")
                .bind(id)
                .bind(pattern.as_str())
                .execute(&mut *tx)
                .await?;
        }
        for response in &input.responses {
            sqlx::query("INSERT INTO responses (intent_id, text) VALUES ($1, $2)")
                .bind(id)
                .bind(response.as_str())
                .execute(&mut *tx)
                .await?;
        }

        let query = format!("SELECT {INTENT_WITH_PHRASES} FROM intents i WHERE i.id = $1");
        let intent = sqlx::query_as::<_, IntentWithPhrases>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(intent)
    }

    /// Find an intent by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<IntentWithPhrases>, sqlx::Error> {
        let query = format!("SELECT {INTENT_WITH_PHRASES} FROM intents i WHERE i.id = $1");
        sqlx::query_as::<_, IntentWithPhrases>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List intents ordered by ID.
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<IntentWithPhrases>, sqlx::Error> {
        let query = format!(
            "SELECT {INTENT_WITH_PHRASES} FROM intents i ORDER BY i.id LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, IntentWithPhrases>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete an intent. Its phrases and every NPC association go with it.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM intents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Append a training pattern. Returns `None` if the intent does not exist.
    pub async fn add_pattern(
        pool: &PgPool,
        intent_id: DbId,
        text: &str,
    ) -> Result<Option<Phrase>, sqlx::Error> {
        Self::add_phrase(pool, "patterns", intent_id, text).await
    }

    /// Append a candidate response. Returns `None` if the intent does not exist.
    pub async fn add_response(
        pool: &PgPool,
        intent_id: DbId,
        text: &str,
    ) -> Result<Option<Phrase>, sqlx::Error> {
        Self::add_phrase(pool, "responses", intent_id, text).await
    }

    async fn add_phrase(
        pool: &PgPool,
        table: &'static str,
        intent_id: DbId,
        text: &str,
    ) -> Result<Option<Phrase>, sqlx::Error> {
        let query = format!(
            "INSERT INTO {table} (intent_id, text)
             SELECT id, $2 FROM intents WHERE id = $1
             RETURNING {PHRASE_COLUMNS}"
        );
        sqlx::query_as::<_, Phrase>(&query)
            .bind(intent_id)
            .bind(text)
            .fetch_optional(pool)
            .await
    }
}

//! SQLite index store.
//!
//! Persists the watermark, the single block lock, and campaign projections
//! in one SQLite file. Uses `sqlx` with WAL mode. The lock lives in a
//! single-row table, so a second `begin_block` while one is held cannot
//! succeed, and `last_processed` reports `None` whenever the lock row
//! exists — the convention the scan driver uses to detect an in-flight
//! batch.
//!
//! Call [`SqliteIndexStore::initialize_watermark`] once at startup before
//! handing the store to the indexer; an uninitialized watermark reads as an
//! in-flight batch and the scan driver would never open a range.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use centive_core::{
    CampaignData, CampaignRow, CampaignStore, CampaignTx, IndexerError, WatermarkStore,
};

/// SQLite-backed watermark + campaign storage.
pub struct SqliteIndexStore {
    pool: SqlitePool,
}

impl SqliteIndexStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./centive.db"`) or a full
    /// SQLite URL (`"sqlite:./centive.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory SQLite database. Ideal for tests.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), IndexerError> {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS watermark (
                id           INTEGER PRIMARY KEY CHECK (id = 0),
                block_number INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexerError::Storage(e.to_string()))?;

        // Single-row table: the primary-key check is what makes a second
        // in-flight lock impossible.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS block_lock (
                id             INTEGER PRIMARY KEY CHECK (id = 0),
                block_number   INTEGER NOT NULL,
                skipped_blocks INTEGER NOT NULL,
                locked_at      INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexerError::Storage(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS campaigns (
                user               TEXT    NOT NULL,
                nonce              INTEGER NOT NULL,
                trainer            TEXT    NOT NULL,
                length             INTEGER NOT NULL,
                frequency          INTEGER NOT NULL,
                cooldown           INTEGER NOT NULL,
                stake              INTEGER NOT NULL,
                completed          INTEGER NOT NULL,
                started            INTEGER NOT NULL,
                bonus              INTEGER NOT NULL,
                missed             INTEGER NOT NULL,
                last_completed     INTEGER NOT NULL,
                charity_percentage INTEGER NOT NULL,
                trainer_percentage INTEGER NOT NULL,
                created_block      INTEGER NOT NULL,
                PRIMARY KEY (user, nonce)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexerError::Storage(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_campaigns_user ON campaigns (user);")
            .execute(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Seed the watermark at `start_block` if no watermark exists yet.
    pub async fn initialize_watermark(&self, start_block: u64) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT OR IGNORE INTO watermark (id, block_number, updated_at) VALUES (0, ?, ?)",
        )
        .bind(start_block as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| IndexerError::Storage(e.to_string()))?;
        Ok(())
    }

    // ─── Campaign queries ───────────────────────────────────────────────────────

    pub async fn campaign(
        &self,
        user: &str,
        nonce: u16,
    ) -> Result<Option<CampaignRow>, IndexerError> {
        let row = sqlx::query("SELECT * FROM campaigns WHERE user = ? AND nonce = ?")
            .bind(user)
            .bind(nonce as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;

        Ok(row.map(|r| row_to_campaign(&r)))
    }

    /// All of one user's campaigns, ordered by nonce.
    pub async fn campaigns_for(&self, user: &str) -> Result<Vec<CampaignRow>, IndexerError> {
        let rows = sqlx::query("SELECT * FROM campaigns WHERE user = ? ORDER BY nonce")
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;

        Ok(rows.iter().map(row_to_campaign).collect())
    }

    pub async fn campaign_count(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM campaigns")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        Ok(row.get::<i64, _>("cnt") as u64)
    }
}

fn row_to_campaign(r: &sqlx::sqlite::SqliteRow) -> CampaignRow {
    CampaignRow {
        user: r.get("user"),
        trainer: r.get("trainer"),
        data: CampaignData {
            nonce: r.get::<i64, _>("nonce") as u16,
            length: r.get::<i64, _>("length") as u8,
            frequency: r.get::<i64, _>("frequency") as u8,
            cooldown: r.get::<i64, _>("cooldown") as u8,
            stake: r.get::<i64, _>("stake") as u32,
            completed: r.get::<i64, _>("completed") as u16,
            started: r.get::<i64, _>("started") as u32,
            bonus: r.get::<i64, _>("bonus") as u32,
            missed: r.get::<i64, _>("missed") as u16,
            last_completed: r.get::<i64, _>("last_completed") as u32,
            charity_percentage: r.get::<i64, _>("charity_percentage") as u8,
            trainer_percentage: r.get::<i64, _>("trainer_percentage") as u8,
        },
        block_number: r.get::<i64, _>("created_block") as u64,
    }
}

// ─── WatermarkStore impl ─────────────────────────────────────────────────────

#[async_trait]
impl WatermarkStore for SqliteIndexStore {
    async fn last_processed(&self) -> Result<Option<u64>, IndexerError> {
        let locks = sqlx::query("SELECT COUNT(*) AS cnt FROM block_lock")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        if locks.get::<i64, _>("cnt") > 0 {
            return Ok(None);
        }

        let row = sqlx::query("SELECT block_number FROM watermark WHERE id = 0")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        Ok(row.map(|r| r.get::<i64, _>("block_number") as u64))
    }

    async fn set_last_processed(&self, block: u64) -> Result<bool, IndexerError> {
        let result = sqlx::query(
            "UPDATE watermark SET block_number = ?1, updated_at = ?2
             WHERE id = 0 AND block_number <= ?1",
        )
        .bind(block as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| IndexerError::Storage(e.to_string()))?;

        let advanced = result.rows_affected() == 1;
        if advanced {
            debug!(block, "watermark advanced");
        }
        Ok(advanced)
    }

    async fn begin_block(&self, block: u64, skipped_blocks: u64) -> Result<bool, IndexerError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO block_lock (id, block_number, skipped_blocks, locked_at)
             VALUES (0, ?, ?, ?)",
        )
        .bind(block as i64)
        .bind(skipped_blocks as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| IndexerError::Storage(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn finish_block(&self, block: u64) -> Result<bool, IndexerError> {
        let result = sqlx::query("DELETE FROM block_lock WHERE id = 0 AND block_number = ?")
            .bind(block as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn revert_block(&self, block: u64) -> Result<(), IndexerError> {
        sqlx::query("DELETE FROM block_lock WHERE id = 0 AND block_number = ?")
            .bind(block as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        debug!(block, "block lock reverted");
        Ok(())
    }
}

// ─── CampaignStore impl ──────────────────────────────────────────────────────

#[async_trait]
impl CampaignStore for SqliteIndexStore {
    async fn begin(&self, block: u64) -> Result<Box<dyn CampaignTx>, IndexerError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))?;
        Ok(Box::new(SqliteCampaignTx { tx, block }))
    }
}

/// One block's writes inside a real SQL transaction.
struct SqliteCampaignTx {
    tx: sqlx::Transaction<'static, sqlx::Sqlite>,
    block: u64,
}

#[async_trait]
impl CampaignTx for SqliteCampaignTx {
    async fn create_campaign(
        &mut self,
        user: &str,
        data: &CampaignData,
        trainer: &str,
    ) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT OR REPLACE INTO campaigns
             (user, nonce, trainer, length, frequency, cooldown, stake, completed,
              started, bonus, missed, last_completed, charity_percentage,
              trainer_percentage, created_block)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user)
        .bind(data.nonce as i64)
        .bind(trainer)
        .bind(data.length as i64)
        .bind(data.frequency as i64)
        .bind(data.cooldown as i64)
        .bind(data.stake as i64)
        .bind(data.completed as i64)
        .bind(data.started as i64)
        .bind(data.bonus as i64)
        .bind(data.missed as i64)
        .bind(data.last_completed as i64)
        .bind(data.charity_percentage as i64)
        .bind(data.trainer_percentage as i64)
        .bind(self.block as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| IndexerError::Storage(e.to_string()))?;

        debug!(user, nonce = data.nonce, block = self.block, "campaign stored");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), IndexerError> {
        self.tx
            .commit()
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), IndexerError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| IndexerError::Storage(e.to_string()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

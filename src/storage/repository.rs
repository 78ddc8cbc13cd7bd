use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{PromptStore, StoreError, StoreResult};
use crate::models::{
    title_from_content, PromptDraft, PromptPatch, PromptRecord, Settings, SettingsPatch,
    DEFAULT_CATEGORY,
};
use crate::variables;

/// SQLite-backed prompt library. Records are stored as JSON documents.
pub struct PromptRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PromptRepository {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.init_schema()?;
        tracing::info!("Prompt library opened at {:?}", path);
        Ok(repo)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let repo = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prompts (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                record_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_prompts_created_at ON prompts(created_at DESC);

            CREATE TABLE IF NOT EXISTS app_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                settings_json TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn load(conn: &Connection, id: &str) -> StoreResult<PromptRecord> {
        let json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM prompts WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn store(conn: &Connection, record: &PromptRecord) -> StoreResult<()> {
        conn.execute(
            r#"
            INSERT INTO prompts (id, created_at, record_json) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET record_json = excluded.record_json
            "#,
            params![
                record.id,
                record.created_at.to_rfc3339(),
                serde_json::to_string(record)?
            ],
        )?;
        Ok(())
    }

    /// Load, change and write back one record under a single lock
    fn modify<F>(&self, id: &str, change: F) -> StoreResult<PromptRecord>
    where
        F: FnOnce(&mut PromptRecord),
    {
        let conn = self.lock()?;
        let mut record = Self::load(&conn, id)?;
        change(&mut record);
        Self::store(&conn, &record)?;
        Ok(record)
    }
}

impl PromptStore for PromptRepository {
    fn get_all_prompts(&self) -> StoreResult<Vec<PromptRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT record_json FROM prompts ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut prompts = Vec::new();
        for json in rows {
            prompts.push(serde_json::from_str(&json?)?);
        }
        Ok(prompts)
    }

    fn get_prompt(&self, id: &str) -> StoreResult<PromptRecord> {
        let conn = self.lock()?;
        Self::load(&conn, id)
    }

    fn save_prompt(&self, draft: PromptDraft) -> StoreResult<PromptRecord> {
        let now = Utc::now();
        let title = draft
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| title_from_content(&draft.content));
        let category = draft
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let record = PromptRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            variables: variables::derive_specs(&draft.content, &draft.variables),
            content: draft.content,
            tags: draft.tags,
            category,
            is_pinned: false,
            usage_count: 0,
            last_used: now,
            created_at: now,
            source_url: draft.source_url.unwrap_or_default(),
        };

        let conn = self.lock()?;
        Self::store(&conn, &record)?;
        tracing::debug!("Saved prompt {} ({})", record.id, record.title);
        Ok(record)
    }

    fn update_prompt(&self, id: &str, patch: PromptPatch) -> StoreResult<PromptRecord> {
        self.modify(id, |record| {
            let rederive = patch.content.is_some() || patch.variables.is_some();
            if let Some(content) = patch.content {
                record.content = content;
            }
            if let Some(specs) = patch.variables {
                record.variables = specs;
            }
            if rederive {
                record.variables = variables::derive_specs(&record.content, &record.variables);
            }
            if let Some(title) = patch.title {
                record.title = if title.trim().is_empty() {
                    title_from_content(&record.content)
                } else {
                    title
                };
            }
            if let Some(tags) = patch.tags {
                record.tags = tags;
            }
            if let Some(category) = patch.category {
                record.category = category;
            }
            if let Some(pinned) = patch.is_pinned {
                record.is_pinned = pinned;
            }
            if let Some(source_url) = patch.source_url {
                record.source_url = source_url;
            }
        })
    }

    fn delete_prompt(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn increment_usage(&self, id: &str) -> StoreResult<PromptRecord> {
        self.modify(id, |record| {
            record.usage_count += 1;
            record.last_used = Utc::now();
        })
    }

    fn toggle_pin(&self, id: &str) -> StoreResult<PromptRecord> {
        self.modify(id, |record| record.is_pinned = !record.is_pinned)
    }

    fn get_settings(&self) -> StoreResult<Settings> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT settings_json FROM app_settings WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Settings::default()),
        }
    }

    fn update_settings(&self, patch: SettingsPatch) -> StoreResult<Settings> {
        let mut settings = self.get_settings()?;
        settings.apply(patch);

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO app_settings (id, settings_json) VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET settings_json = excluded.settings_json
            "#,
            params![serde_json::to_string(&settings)?],
        )?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SaveMode, VariableType};

    fn repo() -> PromptRepository {
        PromptRepository::in_memory().unwrap()
    }

    #[test]
    fn test_save_assigns_defaults() {
        let repo = repo();
        let saved = repo
            .save_prompt(PromptDraft::new("Explain [concept] simply\nwith examples"))
            .unwrap();

        assert!(!saved.id.is_empty());
        assert_eq!(saved.title, "Explain [concept] simply");
        assert_eq!(saved.category, DEFAULT_CATEGORY);
        assert_eq!(saved.usage_count, 0);
        assert_eq!(saved.created_at, saved.last_used);
        assert_eq!(saved.variables.len(), 1);
        assert_eq!(saved.variables[0].name, "concept");

        assert_eq!(repo.get_all_prompts().unwrap(), vec![saved]);
    }

    #[test]
    fn test_update_keeps_customised_variables() {
        let repo = repo();
        let saved = repo.save_prompt(PromptDraft::new("[topic] for [audience]")).unwrap();

        let mut specs = saved.variables.clone();
        specs[0] = specs[0].clone().options(["A", "B"]);
        repo.update_prompt(
            &saved.id,
            PromptPatch {
                variables: Some(specs),
                ..Default::default()
            },
        )
        .unwrap();

        let updated = repo
            .update_prompt(
                &saved.id,
                PromptPatch {
                    content: Some("[Topic] discussion".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.variables.len(), 1);
        assert_eq!(updated.variables[0].name, "Topic");
        assert_eq!(updated.variables[0].kind, VariableType::Options);
        assert_eq!(updated.variables[0].options, vec!["A", "B"]);
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        let repo = repo();
        assert!(matches!(repo.delete_prompt("nope"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            repo.update_prompt("nope", PromptPatch::default()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(repo.toggle_pin("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_usage_and_pin() {
        let repo = repo();
        let saved = repo.save_prompt(PromptDraft::new("hello")).unwrap();

        let used = repo.increment_usage(&saved.id).unwrap();
        assert_eq!(used.usage_count, 1);
        assert!(used.last_used >= saved.last_used);

        assert!(repo.toggle_pin(&saved.id).unwrap().is_pinned);
        assert_eq!(repo.pinned_prompts().unwrap().len(), 1);
        assert!(!repo.toggle_pin(&saved.id).unwrap().is_pinned);

        repo.delete_prompt(&saved.id).unwrap();
        assert!(repo.get_all_prompts().unwrap().is_empty());
    }

    #[test]
    fn test_settings_round_trip_through_patch() {
        let repo = repo();
        assert_eq!(repo.get_settings().unwrap(), Settings::default());

        let updated = repo
            .update_settings(SettingsPatch {
                save_mode: Some(SaveMode::Detailed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.save_mode, SaveMode::Detailed);
        assert_eq!(repo.get_settings().unwrap().save_mode, SaveMode::Detailed);
        assert_eq!(repo.get_settings().unwrap().language, "auto");
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prompts.db");

        let id = {
            let repo = PromptRepository::open(&path).unwrap();
            repo.save_prompt(PromptDraft::new("persist me")).unwrap().id
        };

        let reopened = PromptRepository::open(&path).unwrap();
        assert_eq!(reopened.get_prompt(&id).unwrap().content, "persist me");
    }
}

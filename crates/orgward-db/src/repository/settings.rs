//! SurrealDB implementation of [`SettingsRepository`].
//!
//! The setting key doubles as the record ID, which makes the batch
//! write a plain UPSERT per key.

use orgward_core::error::OrgwardResult;
use orgward_core::models::setting::Setting;
use orgward_core::repository::SettingsRepository;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};

use crate::error::DbError;

#[derive(Debug, Deserialize)]
struct SettingRow {
    value: String,
}

/// SurrealDB implementation of the settings store.
#[derive(Clone)]
pub struct SurrealSettingsRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSettingsRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SettingsRepository for SurrealSettingsRepository<C> {
    async fn get(&self, key: &str) -> OrgwardResult<Option<Setting>> {
        let mut result = self
            .db
            // `value` is a reserved word in SurrealQL, so the field name
            // is escaped wherever it appears in query text.
            .query("SELECT `value` FROM type::thing('setting', $key)")
            .bind(("key", key.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SettingRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| Setting::new(key, row.value)))
    }

    async fn upsert_all(&self, settings: &[Setting]) -> OrgwardResult<()> {
        if settings.is_empty() {
            return Ok(());
        }

        let mut query = String::from("BEGIN TRANSACTION; ");
        for index in 0..settings.len() {
            query.push_str(&format!(
                "UPSERT type::thing('setting', $key_{index}) SET \
                 `value` = $value_{index}; ",
            ));
        }
        query.push_str("COMMIT TRANSACTION;");

        let mut builder = self.db.query(query);
        for (index, setting) in settings.iter().enumerate() {
            builder = builder
                .bind((format!("key_{index}"), setting.key.clone()))
                .bind((format!("value_{index}"), setting.value.clone()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}

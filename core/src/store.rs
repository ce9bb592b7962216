use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{ManualIngredient, Recipe, SelectedRecipe};

/// Local persistence for the working set (selection and manual list) and a
/// handful of key/value settings. The catalog itself lives on the backend.
pub struct Store {
    conn: Connection,
}

/// A working set as read back from disk, before it is reconciled against a
/// freshly loaded catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    pub selection: Vec<SelectedRecipe>,
    pub manual: Vec<ManualIngredient>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let store = Store { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Store { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS selections (
                    position INTEGER NOT NULL,
                    recipe_id INTEGER PRIMARY KEY NOT NULL,
                    recipe_name TEXT NOT NULL,
                    prep_time_minutes INTEGER,
                    default_servings INTEGER NOT NULL,
                    servings INTEGER,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS manual_ingredients (
                    position INTEGER NOT NULL,
                    ingredient_id INTEGER PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    quantity REAL NOT NULL CHECK (quantity > 0),
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Working set ---

    /// Replace the stored working set with the given one, atomically.
    pub fn save_working_set(
        &self,
        selection: &[SelectedRecipe],
        manual: &[ManualIngredient],
    ) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM selections", [])?;
        tx.execute("DELETE FROM manual_ingredients", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO selections
                    (position, recipe_id, recipe_name, prep_time_minutes, default_servings, servings, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, entry) in selection.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    entry.recipe.id,
                    entry.recipe.name,
                    entry.recipe.prep_time_minutes,
                    entry.recipe.servings,
                    entry.servings,
                    now,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO manual_ingredients (position, ingredient_id, name, quantity, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, entry) in manual.iter().enumerate() {
                stmt.execute(params![position as i64, entry.id, entry.name, entry.quantity, now])?;
            }
        }
        tx.commit()?;
        tracing::debug!(
            selections = selection.len(),
            manual = manual.len(),
            "working set saved"
        );
        Ok(())
    }

    pub fn load_working_set(&self) -> Result<WorkingSet> {
        let mut stmt = self.conn.prepare(
            "SELECT recipe_id, recipe_name, prep_time_minutes, default_servings, servings
             FROM selections ORDER BY position",
        )?;
        let selection = stmt
            .query_map([], |row| {
                Ok(SelectedRecipe {
                    recipe: Recipe {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        prep_time_minutes: row.get(2)?,
                        servings: row.get(3)?,
                    },
                    servings: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT ingredient_id, name, quantity FROM manual_ingredients ORDER BY position",
        )?;
        let manual = stmt
            .query_map([], |row| {
                Ok(ManualIngredient {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    quantity: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WorkingSet { selection, manual })
    }

    /// When the working set was last written, if ever.
    pub fn last_saved_at(&self) -> Result<Option<String>> {
        let ts = self.conn.query_row(
            "SELECT MAX(updated_at) FROM (
                SELECT updated_at FROM selections
                UNION ALL
                SELECT updated_at FROM manual_ingredients
            )",
            [],
            |row| row.get::<_, Option<String>>(0),
        )?;
        Ok(ts)
    }

    // --- Settings ---

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(n > 0)
    }
}

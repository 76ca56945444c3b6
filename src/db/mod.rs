pub mod queries;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, TimeZone};
use rusqlite::{Connection, params};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// A single work-log entry. Ids are epoch-millisecond strings, so they sort
/// chronologically and stay stable across exports.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRow {
    pub id: String,
    pub content: String,
    pub category: String,
    pub logged_at: i64,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn insert_entry(&self, content: &str, category: &str, logged_at: i64) -> Result<EntryRow> {
        let id = self.unused_id("SELECT COUNT(*) FROM entries WHERE id = ?1")?;

        self.conn
            .execute(
                "INSERT INTO entries (id, content, category, logged_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, content, category, logged_at],
            )
            .context("Failed to insert entry")?;

        Ok(EntryRow {
            id,
            content: content.to_string(),
            category: category.to_string(),
            logged_at,
            updated_at: None,
        })
    }

    pub fn entry(&self, id: &str) -> Result<Option<EntryRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, content, category, logged_at, updated_at FROM entries WHERE id = ?1",
                params![id],
                Self::entry_from_row,
            )
            .ok();

        Ok(row)
    }

    pub fn entries_between(&self, from_ts: i64, to_ts: i64) -> Result<Vec<EntryRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, content, category, logged_at, updated_at
             FROM entries
             WHERE logged_at >= ?1 AND logged_at <= ?2
             ORDER BY logged_at ASC",
        )?;

        let rows = statement
            .query_map(params![from_ts, to_ts], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query entries")?;

        Ok(rows)
    }

    /// Entries logged between local midnight of `start` and the last
    /// millisecond of `end`. Both endpoints are inclusive.
    pub fn entries_between_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<EntryRow>> {
        let from_ts = day_start_millis(start)?;
        let to_ts = day_start_millis(end + Duration::days(1))? - 1;

        self.entries_between(from_ts, to_ts)
    }

    pub fn update_entry(
        &self,
        id: &str,
        content: Option<&str>,
        category: Option<&str>,
        logged_at: Option<i64>,
    ) -> Result<bool> {
        let Some(current) = self.entry(id)? else {
            return Ok(false);
        };

        let content = content.unwrap_or(&current.content);
        let category = category.unwrap_or(&current.category);
        let logged_at = logged_at.unwrap_or(current.logged_at);
        let changed = self
            .conn
            .execute(
                "UPDATE entries SET content = ?1, category = ?2, logged_at = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    content,
                    category,
                    logged_at,
                    Local::now().timestamp_millis(),
                    id
                ],
            )
            .context("Failed to update entry")?;

        Ok(changed > 0)
    }

    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id])
            .context("Failed to delete entry")?;

        Ok(deleted > 0)
    }

    pub fn entry_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            .context("Failed to count entries")
    }

    pub fn entry_counts_by_category(&self) -> Result<Vec<(String, i64)>> {
        let mut statement = self.conn.prepare(
            "SELECT category, COUNT(*) AS n
             FROM entries
             GROUP BY category
             ORDER BY n DESC, category ASC",
        )?;

        let rows = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to count entries by category")?;

        Ok(rows)
    }

    pub fn latest_entry_timestamp(&self) -> Result<Option<i64>> {
        let timestamp = self
            .conn
            .query_row(
                "SELECT logged_at FROM entries ORDER BY logged_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();

        Ok(timestamp)
    }

    pub fn insert_template(&self, name: &str, content: &str) -> Result<TemplateRow> {
        let id = self.unused_id("SELECT COUNT(*) FROM templates WHERE id = ?1")?;
        let now = Local::now().timestamp_millis();

        self.conn
            .execute(
                "INSERT INTO templates (id, name, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, content, now, now],
            )
            .with_context(|| format!("Failed to save template '{name}'"))?;

        Ok(TemplateRow {
            id,
            name: name.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn template(&self, id: &str) -> Result<Option<TemplateRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, content, created_at, updated_at FROM templates WHERE id = ?1",
                params![id],
                Self::template_from_row,
            )
            .ok();

        Ok(row)
    }

    pub fn template_by_name(&self, name: &str) -> Result<Option<TemplateRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, content, created_at, updated_at FROM templates WHERE name = ?1",
                params![name],
                Self::template_from_row,
            )
            .ok();

        Ok(row)
    }

    pub fn list_templates(&self) -> Result<Vec<TemplateRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, name, content, created_at, updated_at
             FROM templates
             ORDER BY name ASC",
        )?;

        let rows = statement
            .query_map([], Self::template_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list templates")?;

        Ok(rows)
    }

    pub fn update_template(
        &self,
        id: &str,
        name: Option<&str>,
        content: Option<&str>,
    ) -> Result<bool> {
        let Some(current) = self.template(id)? else {
            return Ok(false);
        };

        let name = name.unwrap_or(&current.name);
        let content = content.unwrap_or(&current.content);
        let changed = self
            .conn
            .execute(
                "UPDATE templates SET name = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![name, content, Local::now().timestamp_millis(), id],
            )
            .with_context(|| format!("Failed to update template '{name}'"))?;

        Ok(changed > 0)
    }

    pub fn delete_template(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])
            .context("Failed to delete template")?;

        Ok(deleted > 0)
    }

    pub fn template_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))
            .context("Failed to count templates")
    }

    // Ids are the current epoch milliseconds; bump until free so bulk
    // inserts inside one millisecond still get distinct ids.
    fn unused_id(&self, count_query: &str) -> Result<String> {
        let mut candidate = Local::now().timestamp_millis();

        loop {
            let id = candidate.to_string();
            let taken: i64 = self
                .conn
                .query_row(count_query, params![id], |row| row.get(0))
                .context("Failed to check id availability")?;

            if taken == 0 {
                return Ok(id);
            }
            candidate += 1;
        }
    }

    fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
        Ok(EntryRow {
            id: row.get(0)?,
            content: row.get(1)?,
            category: row.get(2)?,
            logged_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn template_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TemplateRow> {
        Ok(TemplateRow {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

fn day_start_millis(date: NaiveDate) -> Result<i64> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .context("Failed to build day start")?;

    Local
        .from_local_datetime(&start)
        .single()
        .context("Failed to convert day start to local time")
        .map(|moment| moment.timestamp_millis())
}

pub const CREATE_ENTRIES: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
  id          TEXT PRIMARY KEY,
  content     TEXT NOT NULL,
  category    TEXT NOT NULL DEFAULT 'other',
  logged_at   INTEGER NOT NULL,
  updated_at  INTEGER
);
"#;

pub const CREATE_TEMPLATES: &str = r#"
CREATE TABLE IF NOT EXISTS templates (
  id          TEXT PRIMARY KEY,
  name        TEXT NOT NULL UNIQUE,
  content     TEXT NOT NULL,
  created_at  INTEGER NOT NULL,
  updated_at  INTEGER NOT NULL
);
"#;

pub const INDEX_ENTRIES_LOGGED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_logged_at ON entries(logged_at);";

pub const INDEX_ENTRIES_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category);";

pub const INDEX_TEMPLATES_NAME: &str =
    "CREATE INDEX IF NOT EXISTS idx_templates_name ON templates(name);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_ENTRIES,
        CREATE_TEMPLATES,
        INDEX_ENTRIES_LOGGED_AT,
        INDEX_ENTRIES_CATEGORY,
        INDEX_TEMPLATES_NAME,
    ]
}

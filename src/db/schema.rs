/// Schema for the local catalog tables.
pub const SCHEMA: &str = r#"
-- Sets; is_favorite is local state and is never written by a refresh
CREATE TABLE IF NOT EXISTS sets (
    set_num TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    year INTEGER,
    theme_id INTEGER,
    num_parts INTEGER,
    set_img_url TEXT,
    set_url TEXT,
    last_modified_dt TEXT,
    cached_at TEXT NOT NULL,
    is_favorite INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sets_theme ON sets(theme_id);
CREATE INDEX IF NOT EXISTS idx_sets_favorite ON sets(is_favorite);

CREATE TABLE IF NOT EXISTS themes (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT,
    parent_id INTEGER,
    cached_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_themes_parent ON themes(parent_id);
"#;

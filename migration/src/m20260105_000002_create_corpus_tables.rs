use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const ENUM_TYPES: &[&str] = &[
    "CREATE TYPE pecha.group_type AS ENUM ('text', 'commentary', 'version')",
    "CREATE TYPE pecha.text_type AS ENUM ('root_text', 'commentary', 'version', 'translation', 'transliteration', 'adaptation', 'sheet')",
    "CREATE TYPE pecha.segment_type AS ENUM ('source', 'content', 'audio', 'image', 'video')",
    "CREATE TYPE pecha.table_of_content_type AS ENUM ('text', 'sheet')",
];

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS pecha.groups (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        type pecha.group_type NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pecha.terms (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        slug VARCHAR(255) NOT NULL UNIQUE,
        titles JSONB NOT NULL DEFAULT '{}'::jsonb,
        descriptions JSONB NOT NULL DEFAULT '{}'::jsonb,
        parent_id UUID REFERENCES pecha.terms(id) ON DELETE SET NULL,
        has_child BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pecha.collections (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        slug VARCHAR(255) NOT NULL UNIQUE,
        titles JSONB NOT NULL DEFAULT '{}'::jsonb,
        descriptions JSONB NOT NULL DEFAULT '{}'::jsonb,
        parent_id UUID REFERENCES pecha.collections(id) ON DELETE SET NULL,
        has_child BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // categories hold term ids in display order, so they stay an array
    // rather than a join table.
    r#"
    CREATE TABLE IF NOT EXISTS pecha.texts (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        pecha_text_id VARCHAR(255),
        title TEXT NOT NULL,
        language VARCHAR(32) NOT NULL,
        group_id UUID NOT NULL REFERENCES pecha.groups(id),
        type pecha.text_type NOT NULL,
        categories UUID[] NOT NULL DEFAULT '{}',
        parent_id UUID REFERENCES pecha.texts(id) ON DELETE SET NULL,
        is_published BOOLEAN NOT NULL DEFAULT FALSE,
        published_by VARCHAR(255),
        published_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pecha.segments (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        pecha_segment_id VARCHAR(255),
        text_id UUID NOT NULL REFERENCES pecha.texts(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        type pecha.segment_type NOT NULL DEFAULT 'source',
        mapping JSONB NOT NULL DEFAULT '[]'::jsonb,
        revision INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

        UNIQUE(text_id, pecha_segment_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pecha.table_of_contents (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        text_id UUID NOT NULL REFERENCES pecha.texts(id) ON DELETE CASCADE,
        type pecha.table_of_content_type NOT NULL DEFAULT 'text',
        sections JSONB NOT NULL DEFAULT '[]'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for statement in ENUM_TYPES.iter().chain(TABLES) {
            db.execute_unprepared(statement).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for table in [
            "table_of_contents",
            "segments",
            "texts",
            "collections",
            "terms",
            "groups",
        ] {
            db.execute_unprepared(&format!("DROP TABLE IF EXISTS pecha.{table}"))
                .await?;
        }

        for enum_type in [
            "table_of_content_type",
            "segment_type",
            "text_type",
            "group_type",
        ] {
            db.execute_unprepared(&format!("DROP TYPE IF EXISTS pecha.{enum_type}"))
                .await?;
        }

        Ok(())
    }
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn pecha(table: &str) -> (Alias, Alias) {
    (Alias::new("pecha"), Alias::new(table))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("texts_group_id")
                    .table(pecha("texts"))
                    .col(Alias::new("group_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("texts_language")
                    .table(pecha("texts"))
                    .col(Alias::new("language"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("texts_parent_id")
                    .table(pecha("texts"))
                    .col(Alias::new("parent_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("texts_type")
                    .table(pecha("texts"))
                    .col(Alias::new("type"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("segments_text_id")
                    .table(pecha("segments"))
                    .col(Alias::new("text_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("table_of_contents_text_id")
                    .table(pecha("table_of_contents"))
                    .col(Alias::new("text_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("terms_parent_id")
                    .table(pecha("terms"))
                    .col(Alias::new("parent_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("collections_parent_id")
                    .table(pecha("collections"))
                    .col(Alias::new("parent_id"))
                    .to_owned(),
            )
            .await?;

        // Reverse mapping lookups and the term filter are containment queries
        // (`@>`), which only a GIN index serves.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS segments_mapping
                 ON pecha.segments USING GIN (mapping jsonb_path_ops)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS texts_categories
                 ON pecha.texts USING GIN (categories)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table) in [
            ("texts_categories", "texts"),
            ("segments_mapping", "segments"),
            ("collections_parent_id", "collections"),
            ("terms_parent_id", "terms"),
            ("table_of_contents_text_id", "table_of_contents"),
            ("segments_text_id", "segments"),
            ("texts_type", "texts"),
            ("texts_parent_id", "texts"),
            ("texts_language", "texts"),
            ("texts_group_id", "texts"),
        ] {
            manager
                .drop_index(Index::drop().name(name).table(pecha(table)).to_owned())
                .await?;
        }

        Ok(())
    }
}

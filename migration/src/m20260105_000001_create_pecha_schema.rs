use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS pecha;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO pecha, public;")
            .await?;

        // Role the API connects as. Creating it is left to the operator so the
        // migration also runs against managed databases without CREATEROLE.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    IF EXISTS (SELECT FROM pg_roles WHERE rolname = 'pecha') THEN
                        GRANT ALL ON SCHEMA pecha TO pecha;
                        ALTER DEFAULT PRIVILEGES IN SCHEMA pecha GRANT ALL ON TABLES TO pecha;
                        ALTER DEFAULT PRIVILEGES IN SCHEMA pecha GRANT ALL ON SEQUENCES TO pecha;
                    END IF;
                END $$;
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS pecha CASCADE;")
            .await?;

        Ok(())
    }
}

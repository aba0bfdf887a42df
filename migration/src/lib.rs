pub use sea_orm_migration::prelude::*;

mod m20260105_000001_create_pecha_schema;
mod m20260105_000002_create_corpus_tables;
mod m20260105_000003_add_corpus_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260105_000001_create_pecha_schema::Migration),
            Box::new(m20260105_000002_create_corpus_tables::Migration),
            Box::new(m20260105_000003_add_corpus_indexes::Migration),
        ]
    }
}

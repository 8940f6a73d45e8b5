use sqlx::PgPool;

use crate::error::Result;

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id BIGSERIAL PRIMARY KEY,
            filename TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size BIGINT NOT NULL,
            upload_date TIMESTAMPTZ NOT NULL DEFAULT now(),
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_chunks (
            id BIGSERIAL PRIMARY KEY,
            document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            chunk_text TEXT NOT NULL,
            chunk_index BIGINT NOT NULL,
            embedding BYTEA,
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            UNIQUE (document_id, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Query history outlives its document: the reference is severed, not
    // cascaded, when a document is deleted.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queries (
            id BIGSERIAL PRIMARY KEY,
            query_text TEXT NOT NULL,
            document_id BIGINT REFERENCES documents(id) ON DELETE SET NULL,
            result_text TEXT NOT NULL,
            query_date TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_document_chunks_document_id ON document_chunks(document_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_upload_date ON documents(upload_date DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

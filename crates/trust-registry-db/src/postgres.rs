//! PostgreSQL implementation of ArtifactRepository
//!
//! Artifact metadata and score records are stored as JSONB documents next to
//! the columns used for lookup. Edge inserts rely on the table constraints
//! and `ON CONFLICT DO NOTHING` for idempotency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use tracing::{debug, instrument};
use trust_registry_core::{
    Artifact, ArtifactId, ArtifactKind, ArtifactMetadata, DependencyEdge, DependencyType,
    EdgeSource, RelationshipEdge, RelationshipType, ScoreRecord,
};

use crate::error::{DbError, DbResult};
use crate::repository::{ArtifactRepository, NewArtifact};

const ARTIFACT_COLUMNS: &str = "id, kind, name, metadata, score, created_at";

/// PostgreSQL implementation of ArtifactRepository
#[derive(Debug, Clone)]
pub struct PostgresArtifactRepository {
    pool: PgPool,
}

impl PostgresArtifactRepository {
    /// Create a new PostgreSQL artifact repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ArtifactRepository for PostgresArtifactRepository {
    #[instrument(skip(self, artifact), fields(kind = %artifact.kind, name = %artifact.metadata.name))]
    async fn create_artifact(&self, artifact: NewArtifact) -> DbResult<Artifact> {
        debug!("Creating artifact in database");

        let metadata = serde_json::to_value(&artifact.metadata)?;
        let score = artifact
            .score
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO artifacts (kind, name, source_url, metadata, score)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ARTIFACT_COLUMNS
        ))
        .bind(artifact.kind.as_str())
        .bind(&artifact.metadata.name)
        .bind(&artifact.metadata.source_url)
        .bind(metadata)
        .bind(score)
        .fetch_one(&self.pool)
        .await?;

        let stored = row_to_artifact(row)?;
        debug!(artifact_id = %stored.id, "Artifact created successfully");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: ArtifactId) -> DbResult<Option<Artifact>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM artifacts WHERE id = $1",
            ARTIFACT_COLUMNS
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_artifact).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> DbResult<Vec<Artifact>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM artifacts WHERE name = $1 ORDER BY id",
            ARTIFACT_COLUMNS
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_artifact).collect()
    }

    #[instrument(skip(self))]
    async fn list_by_kind(&self, kind: ArtifactKind) -> DbResult<Vec<Artifact>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM artifacts WHERE kind = $1 ORDER BY id",
            ARTIFACT_COLUMNS
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_artifact).collect()
    }

    #[instrument(skip(self), fields(model_id = %edge.model_id, artifact_id = %edge.artifact_id))]
    async fn insert_dependency_edge(&self, edge: &DependencyEdge) -> DbResult<bool> {
        // Both the primary key and the per-type unique index resolve to DO NOTHING
        let result = sqlx::query(
            r#"
            INSERT INTO artifact_dependencies (model_id, artifact_id, dependency_type, source)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(edge.model_id.get())
        .bind(edge.artifact_id.get())
        .bind(edge.dependency_type.as_str())
        .bind(edge.source.as_str())
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(inserted, "Dependency edge insert finished");
        Ok(inserted)
    }

    #[instrument(skip(self))]
    async fn list_dependency_edges(&self, model_id: ArtifactId) -> DbResult<Vec<DependencyEdge>> {
        let rows = sqlx::query(
            r#"
            SELECT model_id, artifact_id, dependency_type, source
            FROM artifact_dependencies
            WHERE model_id = $1
            ORDER BY created_at, artifact_id
            "#,
        )
        .bind(model_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_dependency_edge).collect()
    }

    #[instrument(skip(self), fields(from = %edge.from_artifact_id, to = %edge.to_artifact_id))]
    async fn insert_relationship_edge(&self, edge: &RelationshipEdge) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO artifact_relationships (
                from_artifact_id, to_artifact_id, relationship_type, source
            )
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (from_artifact_id, to_artifact_id, relationship_type) DO NOTHING
            "#,
        )
        .bind(edge.from_artifact_id.get())
        .bind(edge.to_artifact_id.get())
        .bind(edge.relationship_type.as_str())
        .bind(edge.source.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_relationship_edges(&self, artifact_id: ArtifactId) -> DbResult<Vec<RelationshipEdge>> {
        let rows = sqlx::query(
            r#"
            SELECT from_artifact_id, to_artifact_id, relationship_type, source
            FROM artifact_relationships
            WHERE from_artifact_id = $1 OR to_artifact_id = $1
            ORDER BY created_at, from_artifact_id, to_artifact_id
            "#,
        )
        .bind(artifact_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_relationship_edge).collect()
    }

    #[instrument(skip(self, record), fields(net_score = record.net_score))]
    async fn update_score_record(&self, id: ArtifactId, record: &ScoreRecord) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE artifacts SET score = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.get())
        .bind(serde_json::to_value(record)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Artifact {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_artifact(&self, id: ArtifactId) -> DbResult<()> {
        debug!("Deleting artifact");

        let result = sqlx::query("DELETE FROM artifacts WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Artifact {} not found", id)));
        }
        Ok(())
    }

    async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(Into::into)
    }
}

fn row_to_artifact(row: PgRow) -> DbResult<Artifact> {
    let id: i64 = row.try_get("id")?;
    let kind_str: String = row.try_get("kind")?;
    let kind = ArtifactKind::from_str(&kind_str).map_err(DbError::InvalidData)?;

    let metadata_json: JsonValue = row.try_get("metadata")?;
    let mut metadata: ArtifactMetadata = serde_json::from_value(metadata_json)?;
    let name: String = row.try_get("name")?;
    if metadata.name.is_empty() {
        metadata.name = name;
    }

    let score_json: Option<JsonValue> = row.try_get("score")?;
    let score = score_json
        .map(serde_json::from_value::<ScoreRecord>)
        .transpose()?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Artifact {
        id: ArtifactId::new(id),
        kind,
        metadata,
        score,
        created_at,
    })
}

fn row_to_dependency_edge(row: PgRow) -> DbResult<DependencyEdge> {
    let dependency_type: String = row.try_get("dependency_type")?;
    let source: String = row.try_get("source")?;

    Ok(DependencyEdge {
        model_id: ArtifactId::new(row.try_get("model_id")?),
        artifact_id: ArtifactId::new(row.try_get("artifact_id")?),
        dependency_type: DependencyType::from_str(&dependency_type).map_err(DbError::InvalidData)?,
        source: EdgeSource::from_str(&source).map_err(DbError::InvalidData)?,
    })
}

fn row_to_relationship_edge(row: PgRow) -> DbResult<RelationshipEdge> {
    let relationship: String = row.try_get("relationship_type")?;
    let source: String = row.try_get("source")?;

    Ok(RelationshipEdge {
        from_artifact_id: ArtifactId::new(row.try_get("from_artifact_id")?),
        to_artifact_id: ArtifactId::new(row.try_get("to_artifact_id")?),
        relationship_type: RelationshipType::from(relationship),
        source: EdgeSource::from_str(&source).map_err(DbError::InvalidData)?,
    })
}

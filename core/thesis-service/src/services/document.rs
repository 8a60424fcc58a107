// core/thesis-service/src/services/document.rs

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thesis_common::validation::{validate_file_name, validate_text, MAX_TEXT_LENGTH};
use thesis_common::{CacheAside, Role, ServiceError, ThesisMetrics};

use super::topic::ensure_owner;
use super::{Actor, TopicService};
use crate::models::{
    Document, NewDocument, ReviewDocumentRequest, ReviewStatus, SelectionStatus,
    SubmitDocumentRequest,
};
use crate::repository::{DocumentRepository, SelectionRepository};
use crate::storage::{document_key, FileStorage, MAX_DOCUMENT_BYTES};

pub const NAMESPACE: &str = "document";

#[derive(Clone)]
pub struct DocumentService {
    repo: Arc<dyn DocumentRepository>,
    selections: Arc<dyn SelectionRepository>,
    topics: TopicService,
    storage: Arc<dyn FileStorage>,
    cache: CacheAside<Document>,
    metrics: Option<ThesisMetrics>,
}

impl DocumentService {
    pub fn new(
        repo: Arc<dyn DocumentRepository>,
        selections: Arc<dyn SelectionRepository>,
        topics: TopicService,
        storage: Arc<dyn FileStorage>,
        cache: CacheAside<Document>,
        metrics: Option<ThesisMetrics>,
    ) -> Self {
        Self {
            repo,
            selections,
            topics,
            storage,
            cache,
            metrics,
        }
    }

    async fn load(&self, id: i64) -> Result<Document, ServiceError> {
        let repo = &self.repo;
        self.cache
            .get_by_id(Some(id), |id| async move { repo.find_by_id(id).await })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("document {} not found", id)))
    }

    /// Visible to the submitting student, the topic's teacher and admins
    pub async fn get(&self, actor: &Actor, id: i64) -> Result<Document, ServiceError> {
        let document = self.load(id).await?;
        if actor.is_admin() || document.student_id == actor.id {
            return Ok(document);
        }
        let topic = self.topics.get(document.topic_id).await?;
        ensure_owner(actor, &topic)?;
        Ok(document)
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Document>, ServiceError> {
        actor.require(&[Role::Student])?;
        Ok(self.repo.list_by_student(actor.id).await?)
    }

    /// Store an upload for the student's approved topic. One document of
    /// each kind may wait for review at a time.
    pub async fn submit(&self, actor: &Actor, req: SubmitDocumentRequest) -> Result<Document, ServiceError> {
        if actor.role != Role::Student {
            return Err(ServiceError::Forbidden);
        }
        validate_file_name(&req.file_name)?;
        let content = decode_content(&req.content_base64)?;

        let selection = match self.selections.find_active_by_student(actor.id).await? {
            Some(s) if s.status == SelectionStatus::Approved => s,
            _ => {
                return Err(ServiceError::Conflict(
                    "documents can only be submitted for an approved topic".to_string(),
                ))
            }
        };
        if self.repo.has_pending(actor.id, req.kind).await? {
            return Err(ServiceError::Conflict(format!(
                "a {} document is already waiting for review",
                req.kind
            )));
        }

        let storage_key = document_key(actor.id, &req.file_name);
        self.storage.put(&storage_key, &content).await?;

        let inserted = self
            .repo
            .insert(&NewDocument {
                student_id: actor.id,
                topic_id: selection.topic_id,
                kind: req.kind,
                file_name: req.file_name,
                storage_key: storage_key.clone(),
                size_bytes: content.len() as i64,
                sha256: hex::encode(Sha256::digest(&content)),
            })
            .await;

        let document = match inserted {
            Ok(document) => document,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&storage_key).await {
                    tracing::warn!(storage_key = %storage_key, error = %cleanup, "Orphaned upload left behind");
                }
                return Err(e.into());
            }
        };
        self.cache.invalidate(&document.id).await;

        if let Some(metrics) = &self.metrics {
            metrics
                .documents_total
                .with_label_values(&[document.kind.as_str(), "submitted"])
                .inc();
            metrics.document_upload_bytes.observe(content.len() as f64);
        }
        tracing::info!(
            document_id = document.id,
            student_id = actor.id,
            kind = %document.kind,
            size_bytes = document.size_bytes,
            "Document submitted"
        );
        Ok(document)
    }

    /// The topic's teacher approves or rejects a pending document. A
    /// rejection must say why.
    pub async fn review(
        &self,
        actor: &Actor,
        id: i64,
        req: ReviewDocumentRequest,
    ) -> Result<Document, ServiceError> {
        let document = self.load(id).await?;
        let topic = self.topics.get(document.topic_id).await?;
        ensure_owner(actor, &topic)?;

        let comment = req
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(comment) = &comment {
            validate_text("comment", comment, MAX_TEXT_LENGTH)?;
        } else if !req.approved {
            return Err(ServiceError::ValidationError(
                "a rejection needs a comment".to_string(),
            ));
        }

        let status = if req.approved {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Rejected
        };
        let reviewed = self.repo.review(id, status, comment.as_deref(), actor.id).await?;
        self.cache.invalidate(&id).await;

        let document =
            reviewed.ok_or_else(|| ServiceError::Conflict(format!("document {} is not pending", id)))?;

        if let Some(metrics) = &self.metrics {
            metrics
                .documents_total
                .with_label_values(&[document.kind.as_str(), status.as_str()])
                .inc();
        }
        tracing::info!(document_id = id, status = %status, reviewer_id = actor.id, "Document reviewed");
        Ok(document)
    }

    /// Metadata plus the stored bytes
    pub async fn download(&self, actor: &Actor, id: i64) -> Result<(Document, Vec<u8>), ServiceError> {
        let document = self.get(actor, id).await?;
        let bytes = self.storage.get(&document.storage_key).await?;
        Ok((document, bytes))
    }
}

fn decode_content(encoded: &str) -> Result<Vec<u8>, ServiceError> {
    // base64 inflates by 4/3; refuse oversized payloads before decoding
    if encoded.len() > (MAX_DOCUMENT_BYTES / 3 + 1) * 4 {
        return Err(too_large());
    }
    let content = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ServiceError::BadRequest(format!("content is not valid base64: {}", e)))?;

    if content.is_empty() {
        return Err(ServiceError::ValidationError("document is empty".to_string()));
    }
    if content.len() > MAX_DOCUMENT_BYTES {
        return Err(too_large());
    }
    Ok(content)
}

fn too_large() -> ServiceError {
    ServiceError::ValidationError(format!(
        "document exceeds {} MiB",
        MAX_DOCUMENT_BYTES / (1024 * 1024)
    ))
}

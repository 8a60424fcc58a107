// core/thesis-service/src/services/department.rs

use std::sync::Arc;
use thesis_common::validation::{validate_text, validate_title, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};
use thesis_common::{CacheAside, Role, ServiceError};

use super::Actor;
use crate::models::{Department, DepartmentInput};
use crate::repository::DepartmentRepository;

pub const NAMESPACE: &str = "department";
/// Collection cache for the full department list
pub const ALL_DEPARTMENTS_KEY: &str = "departments:all";

#[derive(Clone)]
pub struct DepartmentService {
    repo: Arc<dyn DepartmentRepository>,
    cache: CacheAside<Department>,
}

impl DepartmentService {
    pub fn new(repo: Arc<dyn DepartmentRepository>, cache: CacheAside<Department>) -> Self {
        Self { repo, cache }
    }

    pub async fn get(&self, id: i64) -> Result<Department, ServiceError> {
        let repo = &self.repo;
        self.cache
            .get_by_id(Some(id), |id| async move { repo.find_by_id(id).await })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("department {} not found", id)))
    }

    /// `Ok(())` when the department exists; a validation error otherwise
    pub async fn ensure_exists(&self, id: i64) -> Result<(), ServiceError> {
        match self.get(id).await {
            Ok(_) => Ok(()),
            Err(ServiceError::NotFound(_)) => Err(ServiceError::ValidationError(format!(
                "department {} does not exist",
                id
            ))),
            Err(e) => Err(e),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Department>, ServiceError> {
        let repo = &self.repo;
        Ok(self
            .cache
            .get_collection(ALL_DEPARTMENTS_KEY, || async move { repo.list_all().await })
            .await?)
    }

    pub async fn create(&self, actor: &Actor, input: DepartmentInput) -> Result<Department, ServiceError> {
        actor.require(&[Role::Admin])?;
        let input = validate_input(input)?;

        if self.repo.find_by_name(&input.name).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "department {} already exists",
                input.name
            )));
        }

        let department = self.repo.insert(&input).await?;
        // An absent marker may be cached for the new id
        self.invalidate(department.id).await;

        tracing::info!(department_id = department.id, name = %department.name, "Department created");
        Ok(department)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i64,
        input: DepartmentInput,
    ) -> Result<Department, ServiceError> {
        actor.require(&[Role::Admin])?;
        let input = validate_input(input)?;

        if let Some(existing) = self.repo.find_by_name(&input.name).await? {
            if existing.id != id {
                return Err(ServiceError::Conflict(format!(
                    "department {} already exists",
                    input.name
                )));
            }
        }

        let department = self
            .repo
            .update(id, &input)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("department {} not found", id)))?;
        self.invalidate(id).await;

        Ok(department)
    }

    /// Refused while users or topics still belong to the department
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<(), ServiceError> {
        actor.require(&[Role::Admin])?;

        let references = self.repo.count_references(id).await?;
        if references > 0 {
            return Err(ServiceError::Conflict(format!(
                "department {} is still referenced by {} users or topics",
                id, references
            )));
        }

        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(format!("department {} not found", id)));
        }
        self.invalidate(id).await;

        tracing::info!(department_id = id, "Department deleted");
        Ok(())
    }

    async fn invalidate(&self, id: i64) {
        self.cache.invalidate(&id).await;
        self.cache.invalidate_collection(ALL_DEPARTMENTS_KEY).await;
    }
}

fn validate_input(input: DepartmentInput) -> Result<DepartmentInput, ServiceError> {
    let name = input.name.trim().to_string();
    validate_title("name", &name, MAX_NAME_LENGTH)?;

    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(description) = &description {
        validate_text("description", description, MAX_TEXT_LENGTH)?;
    }

    Ok(DepartmentInput { name, description })
}

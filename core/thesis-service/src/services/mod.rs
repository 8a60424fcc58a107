// core/thesis-service/src/services/mod.rs
// Entity services: cached reads, validated writes, invalidation after every write

pub mod auth;
pub mod department;
pub mod document;
pub mod grade;
pub mod notice;
pub mod selection;
pub mod topic;
pub mod user;

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thesis_common::{
    AuthError, CacheAside, CacheError, CacheMetrics, CacheStore, CacheTtlConfig, Claims,
    JwtManager, Role, ServiceError, ThesisMetrics,
};

use crate::repository::Repositories;
use crate::storage::FileStorage;

pub use auth::AuthService;
pub use department::DepartmentService;
pub use document::DocumentService;
pub use grade::GradeService;
pub use notice::NoticeService;
pub use selection::SelectionService;
pub use topic::TopicService;
pub use user::UserService;

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin always passes
    pub fn require(&self, allowed: &[Role]) -> Result<(), ServiceError> {
        if self.is_admin() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }

    /// The caller is `owner_id` or an admin
    pub fn require_self_or_admin(&self, owner_id: i64) -> Result<(), ServiceError> {
        if self.is_admin() || self.id == owner_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden)
        }
    }
}

impl TryFrom<&Claims> for Actor {
    type Error = AuthError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        Ok(Self::new(claims.user_id()?, claims.role))
    }
}

/// Everything the services are built from
pub struct ServiceContext {
    pub repositories: Repositories,
    pub cache: Arc<dyn CacheStore>,
    pub storage: Arc<dyn FileStorage>,
    pub ttl: CacheTtlConfig,
    pub jwt: JwtManager,
    pub cache_metrics: Option<CacheMetrics>,
    pub metrics: Option<ThesisMetrics>,
}

impl ServiceContext {
    fn cache_for<T>(&self, namespace: &'static str, positive_ttl: u64) -> Result<CacheAside<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
    {
        let aside = CacheAside::new(self.cache.clone(), namespace, self.ttl.policy(positive_ttl)?);
        Ok(match &self.cache_metrics {
            Some(metrics) => aside.with_metrics(metrics.clone()),
            None => aside,
        })
    }
}

#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub departments: DepartmentService,
    pub users: UserService,
    pub topics: TopicService,
    pub selections: SelectionService,
    pub documents: DocumentService,
    pub grades: GradeService,
    pub notices: NoticeService,
}

impl Services {
    /// Fails only when a TTL policy is invalid
    pub fn new(ctx: ServiceContext) -> Result<Self, CacheError> {
        let repos = &ctx.repositories;

        let departments = DepartmentService::new(
            repos.departments.clone(),
            ctx.cache_for(department::NAMESPACE, ctx.ttl.department)?,
        );
        let users = UserService::new(
            repos.users.clone(),
            departments.clone(),
            ctx.cache_for(user::NAMESPACE, ctx.ttl.user)?,
            ctx.cache.clone(),
        );
        let topics = TopicService::new(
            repos.topics.clone(),
            repos.selections.clone(),
            departments.clone(),
            ctx.cache_for(topic::NAMESPACE, ctx.ttl.topic)?,
            ctx.metrics.clone(),
        );
        let selections = SelectionService::new(
            repos.selections.clone(),
            topics.clone(),
            ctx.cache_for(selection::NAMESPACE, ctx.ttl.selection)?,
            ctx.metrics.clone(),
        );
        let documents = DocumentService::new(
            repos.documents.clone(),
            repos.selections.clone(),
            topics.clone(),
            ctx.storage.clone(),
            ctx.cache_for(document::NAMESPACE, ctx.ttl.document)?,
            ctx.metrics.clone(),
        );
        let grades = GradeService::new(
            repos.grades.clone(),
            repos.selections.clone(),
            topics.clone(),
            ctx.cache_for(grade::NAMESPACE, ctx.ttl.grade)?,
            ctx.metrics.clone(),
        );
        let notices = NoticeService::new(repos.notices.clone());
        let auth = AuthService::new(
            repos.users.clone(),
            ctx.cache.clone(),
            ctx.jwt.clone(),
            ctx.metrics.clone(),
        );

        Ok(Self {
            auth,
            departments,
            users,
            topics,
            selections,
            documents,
            grades,
            notices,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_permissions() {
        let student = Actor::new(1, Role::Student);
        let admin = Actor::new(2, Role::Admin);

        assert!(student.require(&[Role::Student]).is_ok());
        assert!(matches!(student.require(&[Role::Teacher]), Err(ServiceError::Forbidden)));
        assert!(admin.require(&[Role::Teacher]).is_ok());

        assert!(student.require_self_or_admin(1).is_ok());
        assert!(student.require_self_or_admin(9).is_err());
        assert!(admin.require_self_or_admin(9).is_ok());
    }

    #[test]
    fn test_actor_from_claims() {
        let claims = Claims::new(15, "li.na".to_string(), Role::Teacher, 1);
        let actor = Actor::try_from(&claims).unwrap();
        assert_eq!(actor, Actor::new(15, Role::Teacher));
    }

    #[test]
    fn test_services_refuse_invalid_ttls() {
        let ttl = CacheTtlConfig {
            topic: 60,
            ..CacheTtlConfig::default()
        };
        let result = Services::new(ServiceContext {
            repositories: Repositories::in_memory(),
            cache: Arc::new(thesis_common::MemoryCacheStore::new()),
            storage: Arc::new(crate::storage::MemoryFileStorage::new()),
            ttl,
            jwt: JwtManager::new("s".to_string(), 1),
            cache_metrics: None,
            metrics: None,
        });
        assert!(result.is_err());
    }
}

// core/thesis-service/src/services/user.rs

use std::sync::Arc;
use thesis_common::validation::{
    validate_email, validate_password, validate_phone, validate_title, validate_username,
    MAX_NAME_LENGTH,
};
use thesis_common::{
    generate_salt, hash_password, session_key, verify_password, CacheAside, CacheStore, Role,
    ServiceError,
};

use super::{Actor, DepartmentService};
use crate::models::{
    ChangePasswordRequest, CreateUserRequest, NewUser, Page, PageQuery, Paging, ProfileChanges,
    UserProfile, UserQuery,
};
use crate::repository::UserRepository;

pub const NAMESPACE: &str = "user";

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    departments: DepartmentService,
    cache: CacheAside<UserProfile>,
    sessions: Arc<dyn CacheStore>,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        departments: DepartmentService,
        cache: CacheAside<UserProfile>,
        sessions: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            repo,
            departments,
            cache,
            sessions,
        }
    }

    pub async fn get_profile(&self, id: i64) -> Result<UserProfile, ServiceError> {
        let repo = &self.repo;
        self.cache
            .get_by_id(Some(id), |id| async move {
                repo.find_by_id(id).await.map(|user| user.map(UserProfile::from))
            })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))
    }

    /// Students may look up themselves and staff, never other students
    pub async fn view_profile(&self, actor: &Actor, id: i64) -> Result<UserProfile, ServiceError> {
        let profile = self.get_profile(id).await?;
        if actor.role == Role::Student && actor.id != id && profile.role == Role::Student {
            return Err(ServiceError::Forbidden);
        }
        Ok(profile)
    }

    pub async fn create(&self, actor: &Actor, req: CreateUserRequest) -> Result<UserProfile, ServiceError> {
        actor.require(&[Role::Admin])?;

        let username = req.username.trim().to_string();
        validate_username(&username)?;
        validate_password(&req.password)?;
        validate_title("real_name", &req.real_name, MAX_NAME_LENGTH)?;
        validate_contact(req.email.as_deref(), req.phone.as_deref())?;
        if let Some(department_id) = req.department_id {
            self.departments.ensure_exists(department_id).await?;
        }

        if self.repo.find_by_username(&username).await?.is_some() {
            return Err(ServiceError::Conflict(format!("username {} is taken", username)));
        }

        let salt = generate_salt();
        let user = self
            .repo
            .insert(&NewUser {
                username,
                password_hash: hash_password(&req.password, &salt),
                salt,
                role: req.role,
                real_name: req.real_name.trim().to_string(),
                email: req.email,
                phone: req.phone,
                department_id: req.department_id,
                number: req.number,
                title: req.title,
                major: req.major,
            })
            .await?;
        self.cache.invalidate(&user.id).await;

        tracing::info!(user_id = user.id, role = %user.role, "User created");
        Ok(user.into())
    }

    /// The user themself or an admin
    pub async fn update_profile(
        &self,
        actor: &Actor,
        id: i64,
        changes: ProfileChanges,
    ) -> Result<UserProfile, ServiceError> {
        actor.require_self_or_admin(id)?;

        if let Some(real_name) = &changes.real_name {
            validate_title("real_name", real_name, MAX_NAME_LENGTH)?;
        }
        validate_contact(changes.email.as_deref(), changes.phone.as_deref())?;
        if let Some(department_id) = changes.department_id {
            self.departments.ensure_exists(department_id).await?;
        }

        let user = self
            .repo
            .update_profile(id, &changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))?;
        self.cache.invalidate(&id).await;

        Ok(user.into())
    }

    /// Users must confirm their old password; an admin may reset anyone's.
    /// Changing the password ends the user's current session.
    pub async fn change_password(
        &self,
        actor: &Actor,
        id: i64,
        req: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        actor.require_self_or_admin(id)?;
        validate_password(&req.new_password)?;

        let user = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))?;

        let resetting_other = actor.is_admin() && actor.id != id;
        if !resetting_other {
            let old = req.old_password.as_deref().unwrap_or_default();
            if !verify_password(old, &user.salt, &user.password_hash) {
                return Err(ServiceError::ValidationError(
                    "old password is incorrect".to_string(),
                ));
            }
        }

        let salt = generate_salt();
        self.repo
            .update_password(id, &hash_password(&req.new_password, &salt), &salt)
            .await?;
        self.end_session(id).await;

        tracing::info!(user_id = id, reset_by_admin = resetting_other, "Password changed");
        Ok(())
    }

    pub async fn set_enabled(&self, actor: &Actor, id: i64, enabled: bool) -> Result<UserProfile, ServiceError> {
        actor.require(&[Role::Admin])?;
        if actor.id == id && !enabled {
            return Err(ServiceError::BadRequest("cannot disable your own account".to_string()));
        }

        if !self.repo.set_enabled(id, enabled).await? {
            return Err(ServiceError::NotFound(format!("user {} not found", id)));
        }
        self.cache.invalidate(&id).await;
        if !enabled {
            self.end_session(id).await;
        }

        self.get_profile(id).await
    }

    /// Admins see everyone; teachers see students only
    pub async fn page(&self, actor: &Actor, mut query: UserQuery) -> Result<Page<UserProfile>, ServiceError> {
        actor.require(&[Role::Teacher])?;
        if actor.role == Role::Teacher {
            query.role = Some(Role::Student);
        }

        let paging = Paging::from(PageQuery {
            page: query.page,
            page_size: query.page_size,
        });
        let (users, total) = self.repo.page(&query, paging).await?;

        Ok(Page::new(users, total, paging).map(UserProfile::from))
    }

    async fn end_session(&self, user_id: i64) {
        if let Err(e) = self.sessions.delete(&session_key(user_id)).await {
            tracing::warn!(user_id = user_id, error = %e, "Could not end session");
        }
    }
}

fn validate_contact(email: Option<&str>, phone: Option<&str>) -> Result<(), ServiceError> {
    if let Some(email) = email {
        validate_email(email)?;
    }
    if let Some(phone) = phone {
        validate_phone(phone)?;
    }
    Ok(())
}

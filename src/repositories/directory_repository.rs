use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::DirectoryStore;
use crate::models::auth::UserRole;
use crate::models::school::{School, TenantLocks};
use crate::models::user::{Profile, UserCredentials};
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    uid: Uuid,
    email: String,
    display_name: String,
    role: String,
    tenant_id: Option<Uuid>,
    password_hash: String,
    must_change_password: bool,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserCredentials {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = UserRole::from_str(&row.role).ok_or_else(|| {
            AppError::Transport(format!("profile '{}' has unknown role '{}'", row.uid, row.role))
        })?;

        Ok(Self {
            profile: Profile {
                uid: row.uid,
                email: row.email,
                display_name: row.display_name,
                role,
                tenant_id: row.tenant_id,
                must_change_password: row.must_change_password,
                created_by: row.created_by,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SchoolRow {
    id: Uuid,
    name: String,
    locks: Json<TenantLocks>,
    created_at: DateTime<Utc>,
}

impl From<SchoolRow> for School {
    fn from(row: SchoolRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            locks: row.locks.0,
            created_at: row.created_at,
        }
    }
}

/// Directorio de perfiles y colegios
pub struct PgDirectoryRepository {
    pool: PgPool,
}

impl PgDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryRepository {
    async fn find_profile(&self, uid: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error finding profile: {}", e)))?;

        Ok(row
            .map(UserCredentials::try_from)
            .transpose()?
            .map(|c| c.profile))
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error finding credentials: {}", e)))?;

        row.map(UserCredentials::try_from).transpose()
    }

    async fn insert_user(&self, credentials: &UserCredentials) -> AppResult<()> {
        let profile = &credentials.profile;
        let result = sqlx::query(
            r#"
            INSERT INTO profiles (uid, email, display_name, role, tenant_id, password_hash, must_change_password, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(profile.uid)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.role.as_str())
        .bind(profile.tenant_id)
        .bind(&credentials.password_hash)
        .bind(profile.must_change_password)
        .bind(profile.created_by)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(AppError::Conflict(format!(
                    "user with email '{}' already exists",
                    profile.email
                )))
            }
            Err(e) => Err(AppError::Transport(format!("Error creating user: {}", e))),
        }
    }

    async fn find_school(&self, id: Uuid) -> AppResult<Option<School>> {
        let row = sqlx::query_as::<_, SchoolRow>("SELECT * FROM schools WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error finding school: {}", e)))?;

        Ok(row.map(School::from))
    }

    async fn insert_school(&self, school: &School) -> AppResult<()> {
        sqlx::query("INSERT INTO schools (id, name, locks, created_at) VALUES ($1, $2, $3, $4)")
            .bind(school.id)
            .bind(&school.name)
            .bind(Json(school.locks))
            .bind(school.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error creating school: {}", e)))?;

        Ok(())
    }

    async fn update_school_locks(&self, id: Uuid, locks: TenantLocks) -> AppResult<Option<School>> {
        let row = sqlx::query_as::<_, SchoolRow>(
            "UPDATE schools SET locks = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Json(locks))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Transport(format!("Error updating school locks: {}", e)))?;

        Ok(row.map(School::from))
    }
}

//! PostgreSQL Repository Implementation

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{age::Age, display_name::DisplayName, email::Email};
use crate::error::{AuthError, AuthResult};

const USER_COLUMNS: &str = r#"
    id,
    email,
    password_hash,
    name,
    age,
    selected_voice,
    total_points,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id,
                email,
                password_hash,
                name,
                age,
                selected_voice,
                total_points,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_phc_string())
        .bind(user.name.as_str())
        .bind(i16::from(user.age.years()))
        .bind(&user.selected_voice)
        .bind(user.total_points)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AuthError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                name = $2,
                selected_voice = $3,
                password_hash = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.name.as_str())
        .bind(&user.selected_voice)
        .bind(user.password_hash.as_phc_string())
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_points(&self, user_id: &UserId, points: i64) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                total_points = total_points + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(points)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    age: i16,
    selected_voice: String,
    total_points: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password_hash for {}: {e}", self.id)))?;

        Ok(User {
            id: UserId::from_uuid(self.id),
            email: Email::from_db(self.email),
            password_hash,
            name: DisplayName::from_db(self.name),
            age: Age::from_db(self.age),
            selected_voice: self.selected_voice,
            total_points: self.total_points,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

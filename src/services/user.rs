use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::config::AuthConfig;
use crate::entities::user::{self, hash_password, Entity as UserEntity, Role};
use crate::error::ApiError;
use crate::middleware::auth::{generate_token, Claims};

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_]{3,32}$").unwrap_or_else(|e| panic!("invalid username pattern: {e}"))
});

#[derive(Deserialize, Clone, Debug, Validate)]
pub struct Credentials {
    #[validate(regex(
        path = *USERNAME_REGEX,
        message = "Username must be 3-32 lowercase letters, digits or underscores"
    ))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl Credentials {
    /// Usernames are stored lowercase; surrounding whitespace is dropped from
    /// both fields.
    pub fn normalized(self) -> Self {
        Credentials {
            username: self.username.trim().to_lowercase(),
            password: self.password.trim().to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
}

impl From<user::Model> for UserSummary {
    fn from(value: user::Model) -> Self {
        UserSummary {
            username: value.username,
            role: value.role,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct Session {
    pub token: String,
    pub user: UserSummary,
}

pub async fn login(
    db: &DatabaseConnection,
    auth: &AuthConfig,
    credentials: Credentials,
) -> Result<Session, ApiError> {
    let credentials = credentials.normalized();
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let model = UserEntity::find()
        .filter(user::Column::Username.eq(credentials.username.as_str()))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    model.check_hash(&credentials.password).map_err(|_| invalid())?;

    session_for(auth, model)
}

pub async fn register(
    db: &DatabaseConnection,
    auth: &AuthConfig,
    credentials: Credentials,
) -> Result<Session, ApiError> {
    let credentials = credentials.normalized();
    credentials.validate()?;

    let password = hash_password(&credentials.password).map_err(ApiError::PasswordHashFailed)?;

    let new_user = user::ActiveModel {
        username: Set(credentials.username),
        password: Set(password),
        role: Set(Role::User),
        ..Default::default()
    };
    // The unique index on username decides races between two registrations.
    let created = new_user.insert(db).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::Conflict("Username already exists".into())
        }
        _ => ApiError::from(err),
    })?;
    info!(user_id = created.id, username = %created.username, "User registered");

    session_for(auth, created)
}

pub async fn profile(db: &DatabaseConnection, claims: &Claims) -> Result<UserSummary, ApiError> {
    UserEntity::find_by_id(claims.user_id)
        .one(db)
        .await?
        .map(UserSummary::from)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

fn session_for(auth: &AuthConfig, model: user::Model) -> Result<Session, ApiError> {
    let token = generate_token(&auth.jwt_secret, model.id, model.role, auth.token_ttl_hours)?;

    Ok(Session {
        token,
        user: model.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::test_db;
    use crate::middleware::auth::decode_token;

    fn auth() -> AuthConfig {
        AuthConfig {
            jwt_secret: "unit-test-secret".into(),
            token_ttl_hours: 1,
            require_auth: false,
        }
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn registered_users_can_log_in_case_insensitively() {
        let db = test_db().await;
        let auth = auth();

        let session = register(&db, &auth, credentials("Alice_1", "secret1")).await.unwrap();
        assert_eq!(session.user.username, "alice_1");
        assert_eq!(session.user.role, Role::User);

        let session = login(&db, &auth, credentials("  ALICE_1 ", " secret1 ")).await.unwrap();
        let claims = decode_token(&auth.jwt_secret, &session.token).unwrap();
        assert_eq!(claims.role, Role::User);
        assert_eq!(profile(&db, &claims).await.unwrap().username, "alice_1");
    }

    #[tokio::test]
    async fn wrong_passwords_and_unknown_users_are_unauthorized() {
        let db = test_db().await;
        let auth = auth();
        register(&db, &auth, credentials("bob", "secret1")).await.unwrap();

        assert!(matches!(
            login(&db, &auth, credentials("bob", "secret2")).await,
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            login(&db, &auth, credentials("carol", "secret1")).await,
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn registration_validates_and_rejects_duplicates() {
        let db = test_db().await;
        let auth = auth();

        let Err(ApiError::Validation(errors)) =
            register(&db, &auth, credentials("a!", "123")).await
        else {
            panic!("expected validation errors");
        };
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("password"));

        register(&db, &auth, credentials("dave", "secret1")).await.unwrap();
        assert!(matches!(
            register(&db, &auth, credentials("DAVE", "secret2")).await,
            Err(ApiError::Conflict(_))
        ));
    }
}

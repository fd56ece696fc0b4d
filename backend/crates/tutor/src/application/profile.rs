//! Profile Use Case
//!
//! Learners may change their display name and tutor voice. Email and age
//! are fixed at registration.

use std::sync::Arc;

use auth::domain::repository::UserRepository;
use auth::domain::value_object::display_name::DisplayName;
use auth::models::User;

use crate::domain::voice::voice_by_id;
use crate::error::{TutorError, TutorResult};

#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub selected_voice: Option<String>,
}

pub struct UpdateProfileUseCase<U> {
    user_repo: Arc<U>,
}

impl<U> UpdateProfileUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn execute(&self, mut user: User, input: UpdateProfileInput) -> TutorResult<User> {
        let name = input.name.as_deref().map(DisplayName::new).transpose()?;

        if let Some(voice) = input.selected_voice.as_deref() {
            if voice_by_id(voice).is_none() {
                return Err(TutorError::InvalidVoice(voice.to_string()));
            }
        }

        if name.is_none() && input.selected_voice.is_none() {
            return Ok(user);
        }

        if let Some(name) = name {
            user.rename(name);
        }
        if let Some(voice) = input.selected_voice {
            user.select_voice(voice);
        }

        self.user_repo.update(&user).await?;
        tracing::info!(user_id = %user.id, voice = %user.selected_voice, "Profile updated");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::domain::value_object::{age::Age, email::Email};
    use auth::infra::memory::InMemoryUserRepository;
    use auth::AuthError;
    use platform::password::HashedPassword;

    const HASH: &str = "$argon2id$v=19$m=64,t=1,p=1$c29tZXNhbHQ$ZmFrZWhhc2hmYWtlaGFzaA";

    async fn setup() -> (Arc<InMemoryUserRepository>, User) {
        let users = Arc::new(InMemoryUserRepository::new());
        let user = User::new(
            Email::new("katie@example.com").unwrap(),
            HashedPassword::from_phc_string(HASH).unwrap(),
            DisplayName::new("Katie").unwrap(),
            Age::new(11).unwrap(),
        );
        users.create(&user).await.unwrap();
        (users, user)
    }

    #[tokio::test]
    async fn test_update_name_and_voice() {
        let (users, user) = setup().await;
        let updated = UpdateProfileUseCase::new(users.clone())
            .execute(
                user.clone(),
                UpdateProfileInput {
                    name: Some("Kate".into()),
                    selected_voice: Some("sage".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_str(), "Kate");
        let stored = users.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.selected_voice, "sage");
        assert_eq!(stored.name.as_str(), "Kate");
    }

    #[tokio::test]
    async fn test_unknown_voice_is_rejected() {
        let (users, user) = setup().await;
        let err = UpdateProfileUseCase::new(users.clone())
            .execute(
                user.clone(),
                UpdateProfileInput {
                    name: Some("Kate".into()),
                    selected_voice: Some("nova".into()),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TutorError::InvalidVoice(ref v) if v == "nova"));
        // Nothing is written when any field is invalid
        let stored = users.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.name.as_str(), "Katie");
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let (users, user) = setup().await;
        let err = UpdateProfileUseCase::new(users)
            .execute(
                user,
                UpdateProfileInput {
                    name: Some("   ".into()),
                    selected_voice: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TutorError::Auth(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_update_is_noop() {
        let (users, user) = setup().await;
        let unchanged = UpdateProfileUseCase::new(users)
            .execute(user.clone(), UpdateProfileInput::default())
            .await
            .unwrap();
        assert_eq!(unchanged.updated_at, user.updated_at);
    }
}

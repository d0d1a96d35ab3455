use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::UserError;
use super::events::*;
use super::value_objects::{PasswordHash, UserRole, UserStatus};
use crate::domain::six_digit_code;
use crate::event_sourcing::AggregateRoot;

// ============================================================================
// User Aggregate - Business Logic
// ============================================================================
//
// An account starts as an invitation: created with an email, a role and
// a six-digit code but no credentials. The invitee later confirms the
// invitation and completes the profile, which is the moment the password
// is hashed and set.
//
// ============================================================================

/// Result of a user uniqueness lookup.
#[derive(Debug, Clone)]
pub struct UserLookupResult {
    pub uid: Uuid,
    pub email: String,
}

/// Uniqueness lookup injected into user operations; backed by the user
/// read model.
#[async_trait::async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserLookupResult>>;
}

#[derive(Debug, Clone)]
pub struct User {
    pub uid: Uuid,
    pub email: String,
    pub password: Option<PasswordHash>,
    pub role: UserRole,
    pub status: UserStatus,
    pub organization_uid: Uuid,
    pub invitation_code: i32,
    pub reset_password_code: i32,

    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,

    pub created_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    // Events
    version: i64,
    uncommitted_events: Vec<UserEvent>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            uid: Uuid::nil(),
            email: String::new(),
            password: None,
            role: UserRole::User,
            status: UserStatus::PendingConfirmation,
            organization_uid: Uuid::nil(),
            invitation_code: 0,
            reset_password_code: 0,
            name: None,
            gender: None,
            birth_date: None,
            created_date: DateTime::UNIX_EPOCH,
            last_updated: DateTime::UNIX_EPOCH,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }
}

impl User {
    /// Invite a new user into an organization. Admins come in confirmed;
    /// plain users must verify their invitation code first.
    pub async fn create(
        lookup: &dyn UserLookup,
        organization_uid: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<Self, UserError> {
        if email.trim().is_empty() {
            return Err(UserError::EmailEmpty);
        }

        if lookup
            .find_by_email(email)
            .await
            .map_err(UserError::Lookup)?
            .is_some()
        {
            return Err(UserError::EmailExists);
        }

        let status = match role {
            UserRole::Admin => UserStatus::Confirmed,
            UserRole::User => UserStatus::PendingConfirmation,
        };

        let now = Utc::now();
        let mut user = User::default();
        user.track_change(UserEvent::Created(UserCreated {
            uid: Uuid::new_v4(),
            email: email.to_string(),
            password: None,
            organization_uid,
            invitation_code: six_digit_code(),
            role,
            status,
            created_date: now,
            last_updated: now,
        }));

        Ok(user)
    }

    pub fn change_password(
        &mut self,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), UserError> {
        let current = self.password.as_ref().ok_or(UserError::WrongOldPassword)?;
        if !current.verify(old_password)? {
            return Err(UserError::WrongOldPassword);
        }

        validate_password(new_password, confirm_password)?;

        let hash = PasswordHash::generate(new_password)?;
        self.track_change(UserEvent::PasswordChanged(PasswordChanged {
            uid: self.uid,
            new_password: hash,
            date_changed: Utc::now(),
        }));

        Ok(())
    }

    pub fn is_password_valid(&self, password: &str) -> Result<bool, UserError> {
        let current = self.password.as_ref().ok_or(UserError::WrongPassword)?;
        if !current.verify(password)? {
            return Err(UserError::WrongPassword);
        }
        Ok(true)
    }

    pub fn change_profile(
        &mut self,
        name: &str,
        gender: &str,
        birth_date: DateTime<Utc>,
    ) -> Result<(), UserError> {
        validate_profile(name, gender)?;

        self.track_change(UserEvent::ProfileChanged(UserProfileChanged {
            uid: self.uid,
            name: name.to_string(),
            gender: gender.to_string(),
            birth_date,
        }));

        Ok(())
    }

    /// Complete the invitation flow: fill the profile and set the first
    /// password. Once completed, the values can only be changed through
    /// the dedicated profile and password operations.
    pub fn set_initial_profile(
        &mut self,
        name: &str,
        gender: &str,
        birth_date: DateTime<Utc>,
        password: &str,
    ) -> Result<(), UserError> {
        if self.status == UserStatus::Completed {
            return Err(UserError::ProfileAlreadyCompleted);
        }

        validate_profile(name, gender)?;
        if password.is_empty() {
            return Err(UserError::PasswordEmpty);
        }

        let hash = PasswordHash::generate(password)?;
        self.track_change(UserEvent::InitialProfileSet(InitialUserProfileSet {
            uid: self.uid,
            name: name.to_string(),
            gender: gender.to_string(),
            birth_date,
            password: hash,
            status: UserStatus::Completed,
            date_changed: Utc::now(),
        }));

        Ok(())
    }

    pub fn verify_invitation(&mut self) -> Result<(), UserError> {
        if self.status == UserStatus::Confirmed {
            return Err(UserError::AlreadyConfirmed);
        }

        self.track_change(UserEvent::Verified(UserVerified {
            uid: self.uid,
            email: self.email.clone(),
            status: UserStatus::Confirmed,
        }));

        Ok(())
    }

    pub fn request_reset_password(&mut self) -> Result<(), UserError> {
        self.track_change(UserEvent::ResetPasswordRequested(ResetPasswordRequested {
            uid: self.uid,
            email: self.email.clone(),
            reset_password_code: six_digit_code(),
        }));

        Ok(())
    }

    pub fn reset_password(&mut self, new_password: &str) -> Result<(), UserError> {
        if new_password.is_empty() {
            return Err(UserError::PasswordEmpty);
        }

        let hash = PasswordHash::generate(new_password)?;
        self.track_change(UserEvent::PasswordChanged(PasswordChanged {
            uid: self.uid,
            new_password: hash,
            date_changed: Utc::now(),
        }));

        Ok(())
    }
}

fn validate_password(password: &str, confirm_password: &str) -> Result<(), UserError> {
    if password.is_empty() {
        return Err(UserError::PasswordEmpty);
    }
    if password != confirm_password {
        return Err(UserError::PasswordConfirmationNotMatch);
    }
    Ok(())
}

fn validate_profile(name: &str, gender: &str) -> Result<(), UserError> {
    if name.trim().is_empty() {
        return Err(UserError::NameEmpty);
    }
    if gender.trim().is_empty() {
        return Err(UserError::GenderEmpty);
    }
    Ok(())
}

impl AggregateRoot for User {
    type Event = UserEvent;
    type Error = UserError;

    fn aggregate_id(&self) -> Uuid {
        self.uid
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[UserEvent] {
        &self.uncommitted_events
    }

    fn uncommitted_events_mut(&mut self) -> &mut Vec<UserEvent> {
        &mut self.uncommitted_events
    }

    fn transition(&mut self, event: &UserEvent) {
        match event {
            UserEvent::Created(e) => {
                self.uid = e.uid;
                self.email = e.email.clone();
                self.password = e.password.clone();
                self.role = e.role;
                self.status = e.status;
                self.organization_uid = e.organization_uid;
                self.invitation_code = e.invitation_code;
                self.created_date = e.created_date;
                self.last_updated = e.last_updated;
            }
            UserEvent::PasswordChanged(e) => {
                self.password = Some(e.new_password.clone());
                self.last_updated = e.date_changed;
            }
            UserEvent::ProfileChanged(e) => {
                self.name = Some(e.name.clone());
                self.gender = Some(e.gender.clone());
                self.birth_date = Some(e.birth_date);
            }
            UserEvent::Verified(e) => {
                self.status = e.status;
            }
            UserEvent::ResetPasswordRequested(e) => {
                self.reset_password_code = e.reset_password_code;
            }
            UserEvent::InitialProfileSet(e) => {
                self.name = Some(e.name.clone());
                self.gender = Some(e.gender.clone());
                self.birth_date = Some(e.birth_date);
                self.password = Some(e.password.clone());
                self.status = e.status;
                self.last_updated = e.date_changed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{DomainEvent, StoredEvent};

    struct NoUsers;

    #[async_trait::async_trait]
    impl UserLookup for NoUsers {
        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<UserLookupResult>> {
            Ok(None)
        }
    }

    struct KnownEmail(&'static str);

    #[async_trait::async_trait]
    impl UserLookup for KnownEmail {
        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserLookupResult>> {
            Ok((email == self.0).then(|| UserLookupResult {
                uid: Uuid::new_v4(),
                email: email.to_string(),
            }))
        }
    }

    async fn invited_user(role: UserRole) -> User {
        User::create(&NoUsers, Uuid::new_v4(), "farmer@example.com", role)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn admin_is_created_confirmed_with_an_invitation_code() {
        let user = invited_user(UserRole::Admin).await;

        assert_eq!(user.status, UserStatus::Confirmed);
        assert!(user.password.is_none());
        assert!((100_000..1_000_000).contains(&user.invitation_code));
        assert_eq!(user.uncommitted_events().len(), 1);
        assert_eq!(user.uncommitted_events()[0].event_name(), "UserCreated");
    }

    #[tokio::test]
    async fn plain_user_starts_pending_confirmation() {
        let user = invited_user(UserRole::User).await;
        assert_eq!(user.status, UserStatus::PendingConfirmation);
    }

    #[tokio::test]
    async fn create_with_existing_email_produces_no_event() {
        let lookup = KnownEmail("farmer@example.com");

        let err = User::create(&lookup, Uuid::new_v4(), "farmer@example.com", UserRole::User)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailExists));
    }

    #[tokio::test]
    async fn create_with_empty_email_fails() {
        let err = User::create(&NoUsers, Uuid::new_v4(), " ", UserRole::User)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailEmpty));
    }

    #[tokio::test]
    async fn initial_profile_completes_the_account() {
        let mut user = invited_user(UserRole::User).await;

        user.set_initial_profile("Jata", "female", "1990-01-02T00:00:00Z".parse().unwrap(), "s3cret")
            .unwrap();

        assert_eq!(user.status, UserStatus::Completed);
        assert_eq!(user.name.as_deref(), Some("Jata"));
        assert!(user.is_password_valid("s3cret").unwrap());
        assert!(matches!(
            user.is_password_valid("not-it").unwrap_err(),
            UserError::WrongPassword
        ));
    }

    #[tokio::test]
    async fn initial_profile_cannot_be_set_twice() {
        let mut user = invited_user(UserRole::User).await;
        let birth_date = "1990-01-02T00:00:00Z".parse().unwrap();

        user.set_initial_profile("Jata", "female", birth_date, "s3cret").unwrap();

        let err = user
            .set_initial_profile("Jata", "female", birth_date, "other")
            .unwrap_err();
        assert!(matches!(err, UserError::ProfileAlreadyCompleted));
        assert_eq!(user.uncommitted_events().len(), 2);
    }

    #[tokio::test]
    async fn change_password_verifies_the_old_one() {
        let mut user = invited_user(UserRole::User).await;
        user.set_initial_profile("Jata", "female", "1990-01-02T00:00:00Z".parse().unwrap(), "s3cret")
            .unwrap();

        let err = user
            .change_password("wrong", "newpass", "newpass")
            .unwrap_err();
        assert!(matches!(err, UserError::WrongOldPassword));

        let err = user
            .change_password("s3cret", "newpass", "different")
            .unwrap_err();
        assert!(matches!(err, UserError::PasswordConfirmationNotMatch));

        user.change_password("s3cret", "newpass", "newpass").unwrap();
        assert!(user.is_password_valid("newpass").unwrap());
    }

    #[tokio::test]
    async fn change_password_without_any_password_set_fails() {
        let mut user = invited_user(UserRole::User).await;

        let err = user.change_password("", "newpass", "newpass").unwrap_err();
        assert!(matches!(err, UserError::WrongOldPassword));
    }

    #[tokio::test]
    async fn verify_invitation_confirms_once() {
        let mut user = invited_user(UserRole::User).await;

        user.verify_invitation().unwrap();
        assert_eq!(user.status, UserStatus::Confirmed);

        let err = user.verify_invitation().unwrap_err();
        assert!(matches!(err, UserError::AlreadyConfirmed));
    }

    #[tokio::test]
    async fn reset_flow_issues_code_then_replaces_password() {
        let mut user = invited_user(UserRole::User).await;
        user.set_initial_profile("Jata", "female", "1990-01-02T00:00:00Z".parse().unwrap(), "s3cret")
            .unwrap();

        user.request_reset_password().unwrap();
        assert!((100_000..1_000_000).contains(&user.reset_password_code));

        user.reset_password("brand-new").unwrap();
        assert!(user.is_password_valid("brand-new").unwrap());
    }

    #[tokio::test]
    async fn change_profile_validates_inputs() {
        let mut user = invited_user(UserRole::User).await;
        let birth_date = "1990-01-02T00:00:00Z".parse().unwrap();

        let err = user.change_profile("", "female", birth_date).unwrap_err();
        assert!(matches!(err, UserError::NameEmpty));

        let err = user.change_profile("Jata", " ", birth_date).unwrap_err();
        assert!(matches!(err, UserError::GenderEmpty));

        user.change_profile("Jata", "female", birth_date).unwrap();
        assert_eq!(user.gender.as_deref(), Some("female"));
    }

    #[tokio::test]
    async fn replay_reproduces_the_full_account_lifecycle() {
        let mut user = invited_user(UserRole::User).await;
        user.verify_invitation().unwrap();
        user.set_initial_profile("Jata", "female", "1990-01-02T00:00:00Z".parse().unwrap(), "s3cret")
            .unwrap();

        let uid = user.uid;
        let history: Vec<StoredEvent<UserEvent>> = user
            .take_uncommitted_events()
            .into_iter()
            .enumerate()
            .map(|(i, event)| StoredEvent {
                aggregate_uid: uid,
                version: (i + 1) as i64,
                created_date: Utc::now(),
                event,
            })
            .collect();

        let replayed = User::load_from_history(&history);
        assert_eq!(replayed.uid, uid);
        assert_eq!(replayed.status, UserStatus::Completed);
        assert_eq!(replayed.name.as_deref(), Some("Jata"));
        assert_eq!(replayed.version(), 3);
        assert!(replayed.is_password_valid("s3cret").unwrap());

        // Folding the same history again yields the same state.
        let again = User::load_from_history(&history);
        assert_eq!(again.email, replayed.email);
        assert_eq!(again.status, replayed.status);
        assert_eq!(again.password, replayed.password);
        assert_eq!(again.version(), replayed.version());
    }
}

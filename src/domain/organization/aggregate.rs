use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::OrganizationError;
use super::events::*;
use super::value_objects::{OrganizationProfile, OrganizationStatus};
use crate::domain::six_digit_code;
use crate::event_sourcing::AggregateRoot;

// ============================================================================
// Organization Aggregate - Business Logic
// ============================================================================

/// Uniqueness lookup injected into organization operations; backed by
/// the organization read model.
#[async_trait::async_trait]
pub trait OrganizationLookup: Send + Sync {
    async fn is_email_exists(&self, email: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone)]
pub struct Organization {
    pub uid: Uuid,
    pub name: String,
    pub email: String,
    pub verification_code: i32,
    pub status: OrganizationStatus,
    pub profile: OrganizationProfile,
    pub created_date: DateTime<Utc>,

    // Events
    version: i64,
    uncommitted_events: Vec<OrganizationEvent>,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            uid: Uuid::nil(),
            name: String::new(),
            email: String::new(),
            verification_code: 0,
            status: OrganizationStatus::PendingConfirmation,
            profile: OrganizationProfile::default(),
            created_date: DateTime::UNIX_EPOCH,
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }
}

impl Organization {
    /// Sign up a new organization. The email must be unique; a six-digit
    /// verification code is issued for the confirmation mail.
    pub async fn create(
        lookup: &dyn OrganizationLookup,
        name: &str,
        email: &str,
    ) -> Result<Self, OrganizationError> {
        if email.trim().is_empty() {
            return Err(OrganizationError::EmailEmpty);
        }

        if lookup
            .is_email_exists(email)
            .await
            .map_err(OrganizationError::Lookup)?
        {
            return Err(OrganizationError::EmailExists);
        }

        if name.trim().is_empty() {
            return Err(OrganizationError::NameEmpty);
        }

        let mut org = Organization::default();
        org.track_change(OrganizationEvent::Created(OrganizationCreated {
            uid: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            verification_code: six_digit_code(),
            status: OrganizationStatus::PendingConfirmation,
            created_date: Utc::now(),
        }));

        Ok(org)
    }

    pub fn change_name(&mut self, name: &str) -> Result<(), OrganizationError> {
        if name.trim().is_empty() {
            return Err(OrganizationError::NameEmpty);
        }

        self.track_change(OrganizationEvent::NameChanged(OrganizationNameChanged {
            uid: self.uid,
            name: name.to_string(),
        }));

        Ok(())
    }

    pub fn change_profile(
        &mut self,
        name: &str,
        profile: OrganizationProfile,
    ) -> Result<(), OrganizationError> {
        if name.trim().is_empty() {
            return Err(OrganizationError::NameEmpty);
        }

        self.track_change(OrganizationEvent::ProfileChanged(OrganizationProfileChanged {
            uid: self.uid,
            name: name.to_string(),
            org_type: profile.org_type,
            total_member: profile.total_member,
            province: profile.province,
            city: profile.city,
        }));

        Ok(())
    }

    pub fn verify(&mut self) -> Result<(), OrganizationError> {
        if self.status == OrganizationStatus::Confirmed {
            return Err(OrganizationError::AlreadyConfirmed);
        }

        self.track_change(OrganizationEvent::Verified(OrganizationVerified {
            uid: self.uid,
            email: self.email.clone(),
            status: OrganizationStatus::Confirmed,
        }));

        Ok(())
    }
}

impl AggregateRoot for Organization {
    type Event = OrganizationEvent;
    type Error = OrganizationError;

    fn aggregate_id(&self) -> Uuid {
        self.uid
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[OrganizationEvent] {
        &self.uncommitted_events
    }

    fn uncommitted_events_mut(&mut self) -> &mut Vec<OrganizationEvent> {
        &mut self.uncommitted_events
    }

    fn transition(&mut self, event: &OrganizationEvent) {
        match event {
            OrganizationEvent::Created(e) => {
                self.uid = e.uid;
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.verification_code = e.verification_code;
                self.status = e.status;
                self.created_date = e.created_date;
            }
            OrganizationEvent::NameChanged(e) => {
                self.name = e.name.clone();
            }
            OrganizationEvent::ProfileChanged(e) => {
                self.name = e.name.clone();
                self.profile = OrganizationProfile {
                    org_type: e.org_type.clone(),
                    total_member: e.total_member.clone(),
                    province: e.province.clone(),
                    city: e.city.clone(),
                };
            }
            OrganizationEvent::Verified(e) => {
                self.status = e.status;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::{DomainEvent, StoredEvent};

    struct NoOrganizations;

    #[async_trait::async_trait]
    impl OrganizationLookup for NoOrganizations {
        async fn is_email_exists(&self, _email: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    struct EmailTaken;

    #[async_trait::async_trait]
    impl OrganizationLookup for EmailTaken {
        async fn is_email_exists(&self, _email: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    async fn new_org() -> Organization {
        Organization::create(&NoOrganizations, "Greenfield Farm", "admin@greenfield.example")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_organization_starts_pending_with_a_code() {
        let org = new_org().await;

        assert_eq!(org.name, "Greenfield Farm");
        assert_eq!(org.status, OrganizationStatus::PendingConfirmation);
        assert!((100_000..1_000_000).contains(&org.verification_code));
        assert_eq!(org.uncommitted_events().len(), 1);
        assert_eq!(org.uncommitted_events()[0].event_name(), "OrganizationCreated");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let err = Organization::create(&EmailTaken, "Greenfield Farm", "admin@greenfield.example")
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::EmailExists));
    }

    #[tokio::test]
    async fn create_rejects_empty_fields() {
        let err = Organization::create(&NoOrganizations, "Greenfield Farm", "")
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::EmailEmpty));

        let err = Organization::create(&NoOrganizations, " ", "admin@greenfield.example")
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::NameEmpty));
    }

    #[tokio::test]
    async fn verify_confirms_once() {
        let mut org = new_org().await;

        org.verify().unwrap();
        assert_eq!(org.status, OrganizationStatus::Confirmed);

        let err = org.verify().unwrap_err();
        assert!(matches!(err, OrganizationError::AlreadyConfirmed));
    }

    #[tokio::test]
    async fn profile_change_carries_all_descriptive_fields() {
        let mut org = new_org().await;

        org.change_profile(
            "Greenfield Cooperative",
            OrganizationProfile {
                org_type: Some("cooperative".to_string()),
                total_member: Some("11-50".to_string()),
                province: Some("West Java".to_string()),
                city: Some("Bandung".to_string()),
            },
        )
        .unwrap();

        assert_eq!(org.name, "Greenfield Cooperative");
        assert_eq!(org.profile.city.as_deref(), Some("Bandung"));
    }

    #[tokio::test]
    async fn replay_reproduces_state_deterministically() {
        let mut org = new_org().await;
        org.change_name("Greenfield Cooperative").unwrap();
        org.verify().unwrap();

        let uid = org.uid;
        let history: Vec<StoredEvent<OrganizationEvent>> = org
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

        let replayed = Organization::load_from_history(&history);
        assert_eq!(replayed.uid, uid);
        assert_eq!(replayed.name, "Greenfield Cooperative");
        assert_eq!(replayed.status, OrganizationStatus::Confirmed);
        assert_eq!(replayed.version(), 3);

        let again = Organization::load_from_history(&history);
        assert_eq!(again.name, replayed.name);
        assert_eq!(again.status, replayed.status);
        assert_eq!(again.version(), replayed.version());
    }
}

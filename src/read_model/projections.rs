use std::sync::Arc;

use uuid::Uuid;

use super::store::{DeviceReadStore, OrganizationReadStore, UserAuthStore, UserReadStore};
use super::structures::{DeviceRead, OrganizationRead, UserAuth, UserRead};
use crate::domain::device::{DeviceEvent, DeviceStatus};
use crate::domain::organization::OrganizationEvent;
use crate::domain::user::UserEvent;
use crate::domain::PublishedEvent;
use crate::event_sourcing::{handler, EventBus};

// ============================================================================
// Projection Handlers
// ============================================================================
//
// Bus subscribers that keep the read models eventually consistent with
// the event log. A "created" event builds a fresh row from the event's
// fields; every other event loads the current row, applies only the
// fields it carries, and upserts the result. Re-delivering the same
// event therefore converges to the same row.
//
// Handlers assume events for one aggregate arrive in version order,
// which the bus guarantees by publishing synchronously right after a
// single append completes.
//
// ============================================================================

pub struct DeviceProjection {
    devices: Arc<dyn DeviceReadStore>,
}

impl DeviceProjection {
    pub fn new(devices: Arc<dyn DeviceReadStore>) -> Arc<Self> {
        Arc::new(Self { devices })
    }

    /// Subscribe this projection to every device event name.
    pub async fn register(self: Arc<Self>, bus: &EventBus<PublishedEvent>) {
        for event_name in DeviceEvent::NAMES {
            let projection = Arc::clone(&self);
            bus.subscribe(
                event_name,
                "device-read-model",
                handler(move |event| {
                    let projection = Arc::clone(&projection);
                    async move { projection.save_to_read_model(event).await }
                }),
            )
            .await;
        }
    }

    async fn save_to_read_model(&self, event: PublishedEvent) -> anyhow::Result<()> {
        let PublishedEvent::Device(event) = event else {
            return Ok(());
        };

        let row = match event {
            DeviceEvent::Created(e) => DeviceRead {
                uid: e.uid,
                device_id: e.device_id,
                name: e.name,
                topic_name: e.topic_name,
                status: e.status,
                description: e.description,
                created_date: e.created_date,
            },
            DeviceEvent::IDChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.device_id = e.device_id;
                row.topic_name = e.topic_name;
                row
            }
            DeviceEvent::NameChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.name = e.name;
                row
            }
            DeviceEvent::DescriptionChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.description = Some(e.description);
                row
            }
            DeviceEvent::StatusChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.status = e.status;
                row
            }
            DeviceEvent::Removed(e) => {
                let mut row = self.require(e.uid).await?;
                row.status = DeviceStatus::Removed;
                row
            }
        };

        self.devices.save(row).await
    }

    async fn require(&self, uid: Uuid) -> anyhow::Result<DeviceRead> {
        self.devices
            .find_by_id(uid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("device read model row missing: {uid}"))
    }
}

pub struct UserProjection {
    users: Arc<dyn UserReadStore>,
    auth: Arc<dyn UserAuthStore>,
}

impl UserProjection {
    pub fn new(users: Arc<dyn UserReadStore>, auth: Arc<dyn UserAuthStore>) -> Arc<Self> {
        Arc::new(Self { users, auth })
    }

    /// Subscribe the user read model to every user event name, and the
    /// auth model to profile completion.
    pub async fn register(self: Arc<Self>, bus: &EventBus<PublishedEvent>) {
        for event_name in UserEvent::NAMES {
            let projection = Arc::clone(&self);
            bus.subscribe(
                event_name,
                "user-read-model",
                handler(move |event| {
                    let projection = Arc::clone(&projection);
                    async move { projection.save_to_read_model(event).await }
                }),
            )
            .await;
        }

        let projection = Arc::clone(&self);
        bus.subscribe(
            "InitialUserProfileSet",
            "user-auth-model",
            handler(move |event| {
                let projection = Arc::clone(&projection);
                async move { projection.save_to_auth_model(event).await }
            }),
        )
        .await;
    }

    async fn save_to_read_model(&self, event: PublishedEvent) -> anyhow::Result<()> {
        let PublishedEvent::User(event) = event else {
            return Ok(());
        };

        let row = match event {
            UserEvent::Created(e) => UserRead {
                uid: e.uid,
                email: e.email,
                password: e.password,
                role: e.role,
                status: e.status,
                organization_uid: e.organization_uid,
                invitation_code: e.invitation_code,
                reset_password_code: 0,
                name: None,
                gender: None,
                birth_date: None,
                created_date: e.created_date,
                last_updated: e.last_updated,
            },
            UserEvent::PasswordChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.password = Some(e.new_password);
                row.last_updated = e.date_changed;
                row
            }
            UserEvent::ProfileChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.name = Some(e.name);
                row.gender = Some(e.gender);
                row.birth_date = Some(e.birth_date);
                row
            }
            UserEvent::Verified(e) => {
                let mut row = self.require(e.uid).await?;
                row.status = e.status;
                row
            }
            UserEvent::ResetPasswordRequested(e) => {
                let mut row = self.require(e.uid).await?;
                row.reset_password_code = e.reset_password_code;
                row
            }
            UserEvent::InitialProfileSet(e) => {
                let mut row = self.require(e.uid).await?;
                row.name = Some(e.name);
                row.gender = Some(e.gender);
                row.birth_date = Some(e.birth_date);
                row.password = Some(e.password);
                row.status = e.status;
                row.last_updated = e.date_changed;
                row
            }
        };

        self.users.save(row).await
    }

    async fn save_to_auth_model(&self, event: PublishedEvent) -> anyhow::Result<()> {
        let PublishedEvent::User(UserEvent::InitialProfileSet(e)) = event else {
            return Ok(());
        };

        // Opaque access token; a UUID stands in until a real token
        // scheme lands.
        self.auth
            .save(UserAuth {
                user_uid: e.uid,
                access_token: Uuid::new_v4().to_string(),
                token_expires: 0,
                created_date: e.date_changed,
                last_updated: e.date_changed,
            })
            .await
    }

    async fn require(&self, uid: Uuid) -> anyhow::Result<UserRead> {
        self.users
            .find_by_id(uid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user read model row missing: {uid}"))
    }
}

pub struct OrganizationProjection {
    organizations: Arc<dyn OrganizationReadStore>,
}

impl OrganizationProjection {
    pub fn new(organizations: Arc<dyn OrganizationReadStore>) -> Arc<Self> {
        Arc::new(Self { organizations })
    }

    /// Subscribe this projection to every organization event name.
    pub async fn register(self: Arc<Self>, bus: &EventBus<PublishedEvent>) {
        for event_name in OrganizationEvent::NAMES {
            let projection = Arc::clone(&self);
            bus.subscribe(
                event_name,
                "organization-read-model",
                handler(move |event| {
                    let projection = Arc::clone(&projection);
                    async move { projection.save_to_read_model(event).await }
                }),
            )
            .await;
        }
    }

    async fn save_to_read_model(&self, event: PublishedEvent) -> anyhow::Result<()> {
        let PublishedEvent::Organization(event) = event else {
            return Ok(());
        };

        let row = match event {
            OrganizationEvent::Created(e) => OrganizationRead {
                uid: e.uid,
                name: e.name,
                email: e.email,
                verification_code: e.verification_code,
                status: e.status,
                org_type: None,
                total_member: None,
                province: None,
                city: None,
                created_date: e.created_date,
            },
            OrganizationEvent::NameChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.name = e.name;
                row
            }
            OrganizationEvent::ProfileChanged(e) => {
                let mut row = self.require(e.uid).await?;
                row.name = e.name;
                row.org_type = e.org_type;
                row.total_member = e.total_member;
                row.province = e.province;
                row.city = e.city;
                row
            }
            OrganizationEvent::Verified(e) => {
                let mut row = self.require(e.uid).await?;
                row.status = e.status;
                row
            }
        };

        self.organizations.save(row).await
    }

    async fn require(&self, uid: Uuid) -> anyhow::Result<OrganizationRead> {
        self.organizations
            .find_by_id(uid)
            .await?
            .ok_or_else(|| anyhow::anyhow!("organization read model row missing: {uid}"))
    }
}

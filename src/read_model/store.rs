use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::structures::{DeviceRead, OrganizationRead, UserAuth, UserRead};
use crate::domain::device::{DeviceLookup, DeviceLookupResult, DeviceStatus};
use crate::domain::organization::OrganizationLookup;
use crate::domain::user::{UserLookup, UserLookupResult};

// ============================================================================
// Read Model Stores
// ============================================================================
//
// One store per read model with upsert-by-uid semantics plus the
// documented secondary-key finders. The stores never originate state;
// they only reflect events the projections hand them.
//
// The aggregate-facing lookup capabilities are implemented on top of
// these stores, so uniqueness checks read the same rows queries do.
//
// ============================================================================

#[async_trait::async_trait]
pub trait DeviceReadStore: Send + Sync {
    /// Insert the row or overwrite all projected fields if it exists.
    async fn save(&self, device: DeviceRead) -> anyhow::Result<()>;

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<DeviceRead>>;

    /// Secondary natural key: unique among non-removed devices.
    async fn find_by_device_id(&self, device_id: &str) -> anyhow::Result<Option<DeviceRead>>;

    async fn find_all(&self) -> anyhow::Result<Vec<DeviceRead>>;
}

#[async_trait::async_trait]
pub trait UserReadStore: Send + Sync {
    async fn save(&self, user: UserRead) -> anyhow::Result<()>;

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<UserRead>>;

    /// Secondary natural key: unique among users.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRead>>;
}

#[async_trait::async_trait]
pub trait OrganizationReadStore: Send + Sync {
    async fn save(&self, org: OrganizationRead) -> anyhow::Result<()>;

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<OrganizationRead>>;

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<OrganizationRead>>;

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<OrganizationRead>>;
}

#[async_trait::async_trait]
pub trait UserAuthStore: Send + Sync {
    async fn save(&self, auth: UserAuth) -> anyhow::Result<()>;

    async fn find_by_user_id(&self, user_uid: Uuid) -> anyhow::Result<Option<UserAuth>>;
}

// ----------------------------------------------------------------------------
// In-memory implementations
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryDeviceReadStore {
    rows: RwLock<HashMap<Uuid, DeviceRead>>,
}

#[async_trait::async_trait]
impl DeviceReadStore for InMemoryDeviceReadStore {
    async fn save(&self, device: DeviceRead) -> anyhow::Result<()> {
        self.rows.write().await.insert(device.uid, device);
        Ok(())
    }

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<DeviceRead>> {
        Ok(self.rows.read().await.get(&uid).cloned())
    }

    async fn find_by_device_id(&self, device_id: &str) -> anyhow::Result<Option<DeviceRead>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| row.device_id == device_id && row.status != DeviceStatus::Removed)
            .cloned())
    }

    async fn find_all(&self) -> anyhow::Result<Vec<DeviceRead>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserReadStore {
    rows: RwLock<HashMap<Uuid, UserRead>>,
}

#[async_trait::async_trait]
impl UserReadStore for InMemoryUserReadStore {
    async fn save(&self, user: UserRead) -> anyhow::Result<()> {
        self.rows.write().await.insert(user.uid, user);
        Ok(())
    }

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<UserRead>> {
        Ok(self.rows.read().await.get(&uid).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRead>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| row.email == email)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryOrganizationReadStore {
    rows: RwLock<HashMap<Uuid, OrganizationRead>>,
}

#[async_trait::async_trait]
impl OrganizationReadStore for InMemoryOrganizationReadStore {
    async fn save(&self, org: OrganizationRead) -> anyhow::Result<()> {
        self.rows.write().await.insert(org.uid, org);
        Ok(())
    }

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<OrganizationRead>> {
        Ok(self.rows.read().await.get(&uid).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<OrganizationRead>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| row.email == email)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<OrganizationRead>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| row.name == name)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryUserAuthStore {
    rows: RwLock<HashMap<Uuid, UserAuth>>,
}

#[async_trait::async_trait]
impl UserAuthStore for InMemoryUserAuthStore {
    async fn save(&self, auth: UserAuth) -> anyhow::Result<()> {
        self.rows.write().await.insert(auth.user_uid, auth);
        Ok(())
    }

    async fn find_by_user_id(&self, user_uid: Uuid) -> anyhow::Result<Option<UserAuth>> {
        Ok(self.rows.read().await.get(&user_uid).cloned())
    }
}

// ----------------------------------------------------------------------------
// Lookup capabilities backed by the read stores
// ----------------------------------------------------------------------------

pub struct DeviceLookupFromReadModel(pub Arc<dyn DeviceReadStore>);

#[async_trait::async_trait]
impl DeviceLookup for DeviceLookupFromReadModel {
    async fn find_by_device_id(
        &self,
        device_id: &str,
    ) -> anyhow::Result<Option<DeviceLookupResult>> {
        Ok(self
            .0
            .find_by_device_id(device_id)
            .await?
            .map(|row| DeviceLookupResult {
                uid: row.uid,
                device_id: row.device_id,
            }))
    }
}

pub struct UserLookupFromReadModel(pub Arc<dyn UserReadStore>);

#[async_trait::async_trait]
impl UserLookup for UserLookupFromReadModel {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserLookupResult>> {
        Ok(self
            .0
            .find_by_email(email)
            .await?
            .map(|row| UserLookupResult {
                uid: row.uid,
                email: row.email,
            }))
    }
}

pub struct OrganizationLookupFromReadModel(pub Arc<dyn OrganizationReadStore>);

#[async_trait::async_trait]
impl OrganizationLookup for OrganizationLookupFromReadModel {
    async fn is_email_exists(&self, email: &str) -> anyhow::Result<bool> {
        Ok(self.0.find_by_email(email).await?.is_some())
    }
}

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::store::{DeviceReadStore, OrganizationReadStore, UserAuthStore, UserReadStore};
use super::structures::{DeviceRead, OrganizationRead, UserAuth, UserRead};
use crate::domain::device::DeviceStatus;
use crate::domain::organization::OrganizationStatus;
use crate::domain::user::{PasswordHash, UserRole, UserStatus};

// ============================================================================
// PostgreSQL Read Model Stores
// ============================================================================
//
// One table per read model, written exclusively through native upserts
// (INSERT ... ON CONFLICT (uid) DO UPDATE) so redelivered events
// converge on the same row.
//
// ============================================================================

/// Create all read model tables if they do not exist yet.
pub async fn ensure_read_model_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS device_read (
            uid UUID PRIMARY KEY,
            device_id TEXT NOT NULL,
            name TEXT NOT NULL,
            topic_name TEXT NOT NULL,
            status TEXT NOT NULL,
            description TEXT,
            created_date TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_read (
            uid UUID PRIMARY KEY,
            email TEXT NOT NULL,
            password TEXT,
            role TEXT NOT NULL,
            status TEXT NOT NULL,
            organization_uid UUID NOT NULL,
            invitation_code INT NOT NULL,
            reset_password_code INT NOT NULL,
            name TEXT,
            gender TEXT,
            birth_date TIMESTAMPTZ,
            created_date TIMESTAMPTZ NOT NULL,
            last_updated TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS organization_read (
            uid UUID PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            verification_code INT NOT NULL,
            status TEXT NOT NULL,
            org_type TEXT,
            total_member TEXT,
            province TEXT,
            city TEXT,
            created_date TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_auth (
            user_uid UUID PRIMARY KEY,
            access_token TEXT NOT NULL,
            token_expires BIGINT NOT NULL,
            created_date TIMESTAMPTZ NOT NULL,
            last_updated TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn parse_column<T>(value: String, column: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {column} column: {e}"))
}

pub struct PostgresDeviceReadStore {
    pool: PgPool,
}

impl PostgresDeviceReadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> anyhow::Result<DeviceRead> {
        Ok(DeviceRead {
            uid: row.try_get("uid")?,
            device_id: row.try_get("device_id")?,
            name: row.try_get("name")?,
            topic_name: row.try_get("topic_name")?,
            status: parse_column::<DeviceStatus>(row.try_get("status")?, "status")?,
            description: row.try_get("description")?,
            created_date: row.try_get("created_date")?,
        })
    }
}

#[async_trait::async_trait]
impl DeviceReadStore for PostgresDeviceReadStore {
    async fn save(&self, device: DeviceRead) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO device_read
                (uid, device_id, name, topic_name, status, description, created_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (uid) DO UPDATE SET
                device_id = EXCLUDED.device_id,
                name = EXCLUDED.name,
                topic_name = EXCLUDED.topic_name,
                status = EXCLUDED.status,
                description = EXCLUDED.description,
                created_date = EXCLUDED.created_date",
        )
        .bind(device.uid)
        .bind(&device.device_id)
        .bind(&device.name)
        .bind(&device.topic_name)
        .bind(device.status.as_str())
        .bind(&device.description)
        .bind(device.created_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<DeviceRead>> {
        let row = sqlx::query("SELECT * FROM device_read WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }

    async fn find_by_device_id(&self, device_id: &str) -> anyhow::Result<Option<DeviceRead>> {
        let row = sqlx::query(
            "SELECT * FROM device_read WHERE device_id = $1 AND status <> 'REMOVED'",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_row).transpose()
    }

    async fn find_all(&self) -> anyhow::Result<Vec<DeviceRead>> {
        let rows = sqlx::query("SELECT * FROM device_read ORDER BY created_date ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::map_row).collect()
    }
}

pub struct PostgresUserReadStore {
    pool: PgPool,
}

impl PostgresUserReadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> anyhow::Result<UserRead> {
        let password: Option<String> = row.try_get("password")?;
        let password = match password {
            Some(hash) => Some(
                PasswordHash::from_hash(&hash)
                    .ok_or_else(|| anyhow::anyhow!("stored password is not a bcrypt hash"))?,
            ),
            None => None,
        };

        Ok(UserRead {
            uid: row.try_get("uid")?,
            email: row.try_get("email")?,
            password,
            role: parse_column::<UserRole>(row.try_get("role")?, "role")?,
            status: parse_column::<UserStatus>(row.try_get("status")?, "status")?,
            organization_uid: row.try_get("organization_uid")?,
            invitation_code: row.try_get("invitation_code")?,
            reset_password_code: row.try_get("reset_password_code")?,
            name: row.try_get("name")?,
            gender: row.try_get("gender")?,
            birth_date: row.try_get::<Option<DateTime<Utc>>, _>("birth_date")?,
            created_date: row.try_get("created_date")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

#[async_trait::async_trait]
impl UserReadStore for PostgresUserReadStore {
    async fn save(&self, user: UserRead) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO user_read
                (uid, email, password, role, status, organization_uid, invitation_code,
                 reset_password_code, name, gender, birth_date, created_date, last_updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (uid) DO UPDATE SET
                email = EXCLUDED.email,
                password = EXCLUDED.password,
                role = EXCLUDED.role,
                status = EXCLUDED.status,
                organization_uid = EXCLUDED.organization_uid,
                invitation_code = EXCLUDED.invitation_code,
                reset_password_code = EXCLUDED.reset_password_code,
                name = EXCLUDED.name,
                gender = EXCLUDED.gender,
                birth_date = EXCLUDED.birth_date,
                created_date = EXCLUDED.created_date,
                last_updated = EXCLUDED.last_updated",
        )
        .bind(user.uid)
        .bind(&user.email)
        .bind(user.password.as_ref().map(|hash| hash.as_str().to_string()))
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.organization_uid)
        .bind(user.invitation_code)
        .bind(user.reset_password_code)
        .bind(&user.name)
        .bind(&user.gender)
        .bind(user.birth_date)
        .bind(user.created_date)
        .bind(user.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<UserRead>> {
        let row = sqlx::query("SELECT * FROM user_read WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserRead>> {
        let row = sqlx::query("SELECT * FROM user_read WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }
}

pub struct PostgresOrganizationReadStore {
    pool: PgPool,
}

impl PostgresOrganizationReadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> anyhow::Result<OrganizationRead> {
        Ok(OrganizationRead {
            uid: row.try_get("uid")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            verification_code: row.try_get("verification_code")?,
            status: parse_column::<OrganizationStatus>(row.try_get("status")?, "status")?,
            org_type: row.try_get("org_type")?,
            total_member: row.try_get("total_member")?,
            province: row.try_get("province")?,
            city: row.try_get("city")?,
            created_date: row.try_get("created_date")?,
        })
    }
}

#[async_trait::async_trait]
impl OrganizationReadStore for PostgresOrganizationReadStore {
    async fn save(&self, org: OrganizationRead) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO organization_read
                (uid, name, email, verification_code, status, org_type,
                 total_member, province, city, created_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (uid) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                verification_code = EXCLUDED.verification_code,
                status = EXCLUDED.status,
                org_type = EXCLUDED.org_type,
                total_member = EXCLUDED.total_member,
                province = EXCLUDED.province,
                city = EXCLUDED.city,
                created_date = EXCLUDED.created_date",
        )
        .bind(org.uid)
        .bind(&org.name)
        .bind(&org.email)
        .bind(org.verification_code)
        .bind(org.status.as_str())
        .bind(&org.org_type)
        .bind(&org.total_member)
        .bind(&org.province)
        .bind(&org.city)
        .bind(org.created_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, uid: Uuid) -> anyhow::Result<Option<OrganizationRead>> {
        let row = sqlx::query("SELECT * FROM organization_read WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<OrganizationRead>> {
        let row = sqlx::query("SELECT * FROM organization_read WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<OrganizationRead>> {
        let row = sqlx::query("SELECT * FROM organization_read WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::map_row).transpose()
    }
}

pub struct PostgresUserAuthStore {
    pool: PgPool,
}

impl PostgresUserAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserAuthStore for PostgresUserAuthStore {
    async fn save(&self, auth: UserAuth) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO user_auth
                (user_uid, access_token, token_expires, created_date, last_updated)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_uid) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                token_expires = EXCLUDED.token_expires,
                created_date = EXCLUDED.created_date,
                last_updated = EXCLUDED.last_updated",
        )
        .bind(auth.user_uid)
        .bind(&auth.access_token)
        .bind(auth.token_expires)
        .bind(auth.created_date)
        .bind(auth.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_user_id(&self, user_uid: Uuid) -> anyhow::Result<Option<UserAuth>> {
        let row = sqlx::query("SELECT * FROM user_auth WHERE user_uid = $1")
            .bind(user_uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(UserAuth {
                user_uid: row.try_get("user_uid")?,
                access_token: row.try_get("access_token")?,
                token_expires: row.try_get("token_expires")?,
                created_date: row.try_get("created_date")?,
                last_updated: row.try_get("last_updated")?,
            })
        })
        .transpose()
    }
}

// Row mapping and upsert behavior against a live database is covered by
// integration runs; the in-memory stores cover the store contract in
// unit tests.

use std::sync::Arc;

use sqlx::postgres::PgPool;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod event_sourcing;
mod metrics;
mod notification;
mod read_model;
mod utils;

use config::FarmConfig;
use domain::device::{self, DeviceCommand, DeviceCommandHandler, DeviceEvent, DeviceStatus};
use domain::organization::{
    self, OrganizationCommand, OrganizationCommandHandler, OrganizationEvent,
};
use domain::user::{self, UserCommand, UserCommandHandler, UserEvent, UserRole};
use domain::PublishedEvent;
use event_sourcing::{EventBus, EventStore, InMemoryEventStore, PostgresEventStore};
use notification::{LogMailer, Mailer, NotificationSubscriber};
use read_model::{
    ensure_read_model_schema, DeviceLookupFromReadModel, DeviceProjection, DeviceReadStore,
    InMemoryDeviceReadStore, InMemoryOrganizationReadStore, InMemoryUserAuthStore,
    InMemoryUserReadStore, OrganizationLookupFromReadModel, OrganizationProjection,
    OrganizationReadStore, PostgresDeviceReadStore, PostgresOrganizationReadStore,
    PostgresUserAuthStore, PostgresUserReadStore, UserAuthStore, UserLookupFromReadModel,
    UserProjection, UserReadStore,
};
use utils::RetryConfig;

struct AppStores {
    device_events: Arc<dyn EventStore<DeviceEvent>>,
    user_events: Arc<dyn EventStore<UserEvent>>,
    organization_events: Arc<dyn EventStore<OrganizationEvent>>,
    devices: Arc<dyn DeviceReadStore>,
    users: Arc<dyn UserReadStore>,
    organizations: Arc<dyn OrganizationReadStore>,
    auth: Arc<dyn UserAuthStore>,
}

async fn build_stores(config: &FarmConfig) -> anyhow::Result<AppStores> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let pool = PgPool::connect(url).await?;

            let device_events =
                PostgresEventStore::new(pool.clone(), "device_event", device::events::codec());
            device_events.ensure_schema().await?;

            let user_events =
                PostgresEventStore::new(pool.clone(), "user_event", user::events::codec());
            user_events.ensure_schema().await?;

            let organization_events = PostgresEventStore::new(
                pool.clone(),
                "organization_event",
                organization::events::codec(),
            );
            organization_events.ensure_schema().await?;

            ensure_read_model_schema(&pool).await?;

            Ok(AppStores {
                device_events: Arc::new(device_events),
                user_events: Arc::new(user_events),
                organization_events: Arc::new(organization_events),
                devices: Arc::new(PostgresDeviceReadStore::new(pool.clone())),
                users: Arc::new(PostgresUserReadStore::new(pool.clone())),
                organizations: Arc::new(PostgresOrganizationReadStore::new(pool.clone())),
                auth: Arc::new(PostgresUserAuthStore::new(pool)),
            })
        }
        None => {
            tracing::info!("No DATABASE_URL set, using in-memory stores");
            Ok(AppStores {
                device_events: Arc::new(InMemoryEventStore::new(device::events::codec())),
                user_events: Arc::new(InMemoryEventStore::new(user::events::codec())),
                organization_events: Arc::new(InMemoryEventStore::new(
                    organization::events::codec(),
                )),
                devices: Arc::new(InMemoryDeviceReadStore::default()),
                users: Arc::new(InMemoryUserReadStore::default()),
                organizations: Arc::new(InMemoryOrganizationReadStore::default()),
                auth: Arc::new(InMemoryUserAuthStore::default()),
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,farmcore=debug")),
        )
        .init();

    tracing::info!("🚀 Starting farmcore");

    let config = FarmConfig::from_env();

    // === 1. Prometheus metrics + exporter ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to start metrics runtime: {}", e);
                return;
            }
        };
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 2. Event stores and read model stores ===
    let stores = build_stores(&config).await?;

    // === 3. Event bus with projection + notification subscribers ===
    let bus: Arc<EventBus<PublishedEvent>> =
        Arc::new(EventBus::new().with_metrics(Arc::clone(&metrics)));

    DeviceProjection::new(Arc::clone(&stores.devices))
        .register(&bus)
        .await;
    UserProjection::new(Arc::clone(&stores.users), Arc::clone(&stores.auth))
        .register(&bus)
        .await;
    OrganizationProjection::new(Arc::clone(&stores.organizations))
        .register(&bus)
        .await;

    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(config.mail_sender.clone()));
    NotificationSubscriber::new(mailer).register(&bus).await;

    // === 4. Command handlers ===
    let retry = RetryConfig {
        max_attempts: config.command_retry_attempts,
        ..RetryConfig::conservative()
    };

    let organization_handler = OrganizationCommandHandler::new(
        Arc::clone(&stores.organization_events),
        Arc::clone(&bus),
        Arc::new(OrganizationLookupFromReadModel(Arc::clone(
            &stores.organizations,
        ))),
    )
    .with_retry(retry.clone())
    .with_metrics(Arc::clone(&metrics));

    let user_handler = UserCommandHandler::new(
        Arc::clone(&stores.user_events),
        Arc::clone(&bus),
        Arc::new(UserLookupFromReadModel(Arc::clone(&stores.users))),
    )
    .with_retry(retry.clone())
    .with_metrics(Arc::clone(&metrics));

    let device_handler = DeviceCommandHandler::new(
        Arc::clone(&stores.device_events),
        Arc::clone(&bus),
        Arc::new(DeviceLookupFromReadModel(Arc::clone(&stores.devices))),
    )
    .with_retry(retry)
    .with_metrics(Arc::clone(&metrics));

    // === 5. Walk one full lifecycle across the three aggregates ===
    let (org_uid, _) = organization_handler
        .handle(OrganizationCommand::Create {
            name: "Greenfield Farm".to_string(),
            email: "admin@greenfield.example".to_string(),
        })
        .await?;
    tracing::info!("✅ Organization created: {}", org_uid);

    organization_handler
        .handle(OrganizationCommand::Verify { uid: org_uid })
        .await?;
    tracing::info!("✅ Organization verified: {}", org_uid);

    let (user_uid, _) = user_handler
        .handle(UserCommand::Create {
            organization_uid: org_uid,
            email: "jata@greenfield.example".to_string(),
            role: UserRole::Admin,
        })
        .await?;
    tracing::info!("✅ User invited: {}", user_uid);

    user_handler
        .handle(UserCommand::SetInitialProfile {
            uid: user_uid,
            name: "Jata".to_string(),
            gender: "female".to_string(),
            birth_date: "1990-01-02T00:00:00Z".parse()?,
            password: "s3cret".to_string(),
        })
        .await?;
    let password_ok = user_handler.is_password_valid(user_uid, "s3cret").await?;
    tracing::info!("✅ User profile completed, password valid: {}", password_ok);

    let (device_uid, _) = device_handler
        .handle(DeviceCommand::Create {
            device_id: "dev-1".to_string(),
            name: "Sensor A".to_string(),
            description: Some("greenhouse 2".to_string()),
        })
        .await?;
    tracing::info!("✅ Device created: {}", device_uid);

    device_handler
        .handle(DeviceCommand::ChangeName {
            uid: device_uid,
            name: "Sensor B".to_string(),
        })
        .await?;

    device_handler
        .handle(DeviceCommand::ChangeStatus {
            uid: device_uid,
            status: DeviceStatus::NodeRedCreated,
        })
        .await?;

    let (_, version) = device_handler
        .handle(DeviceCommand::Remove { uid: device_uid })
        .await?;
    tracing::info!("✅ Device removed at version {}", version);

    // === 6. Query the projections ===
    if let Some(device) = stores.devices.find_by_id(device_uid).await? {
        tracing::info!(
            device_id = %device.device_id,
            name = %device.name,
            status = %device.status,
            "device read model"
        );
    }
    tracing::info!(
        devices = stores.devices.find_all().await?.len(),
        "device read model rows"
    );

    if let Some(user) = stores.users.find_by_email("jata@greenfield.example").await? {
        tracing::info!(
            uid = %user.uid,
            status = %user.status,
            name = user.name.as_deref().unwrap_or("-"),
            "user read model"
        );
    }

    if let Some(org) = stores.organizations.find_by_name("Greenfield Farm").await? {
        tracing::info!(uid = %org.uid, status = %org.status, "organization read model");
    }

    if let Some(auth) = stores.auth.find_by_user_id(user_uid).await? {
        tracing::info!(access_token = %auth.access_token, "auth read model");
    }

    tracing::info!("🎉 Done");

    Ok(())
}

use std::sync::Arc;

use elgg_cache::InMemoryPool;
use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::app::{
    BatchUpgrader, DatabaseQueue, EmailService, NotificationsService, Plugins, Sendmail,
    SubscriptionsService, UpgradeLocator, UpgradeService,
};

use super::{config, SEEDED};
use crate::names;

/// Plugins, upgrades, email and notifications
pub struct ApplicationModule;

impl ServiceModule for ApplicationModule {
    fn name(&self) -> &'static str {
        "application"
    }

    fn priority(&self) -> u32 {
        80
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define(names::PLUGINS, |c| {
            let plugins = Plugins::new(
                Arc::new(InMemoryPool::new()),
                c.resolve(names::PLUGIN_SETTINGS_CACHE)?,
            );
            if config(c)?.enable_profiling {
                return Ok(Arc::new(plugins.with_timer(c.resolve(names::TIMER)?)));
            }
            Ok(Arc::new(plugins))
        })?;

        container.define(names::UPGRADES, |c| {
            Ok(Arc::new(UpgradeService::new(
                c.resolve(names::TRANSLATOR)?,
                c.resolve(names::HOOKS)?,
                config(c)?,
                c.resolve(names::LOGGER)?,
                c.resolve(names::MUTEX)?,
            )))
        })?;

        container.define(names::UPGRADE_LOCATOR, |c| {
            Ok(Arc::new(UpgradeLocator::new(
                c.resolve(names::PLUGINS)?,
                c.resolve(names::LOGGER)?,
                c.resolve(names::PRIVATE_SETTINGS)?,
            )))
        })?;

        container.define(names::BATCH_UPGRADER, |c| {
            Ok(Arc::new(BatchUpgrader::new(config(c)?)))
        })?;

        container.define_type::<Sendmail>(names::MAILER)?;

        container.define(names::EMAILS, |c| {
            Ok(Arc::new(EmailService::new(
                config(c)?,
                c.resolve(names::HOOKS)?,
                c.resolve(names::MAILER)?,
                c.resolve(names::LOGGER)?,
            )))
        })?;

        container.define(names::NOTIFICATIONS, |c| {
            let db = c.resolve(names::DB)?;
            let queue = DatabaseQueue::new(NotificationsService::QUEUE_NAME, Arc::clone(&db));
            Ok(Arc::new(NotificationsService::new(
                Arc::new(SubscriptionsService::new(db)),
                Arc::new(queue),
                c.resolve(names::HOOKS)?,
                c.resolve(names::SESSION)?,
                c.resolve(names::TRANSLATOR)?,
                c.resolve(names::ENTITY_TABLE)?,
                c.resolve(names::LOGGER)?,
            )))
        })?;

        Ok(())
    }
}

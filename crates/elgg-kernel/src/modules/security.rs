use std::sync::Arc;

use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::database::ConfigTable;
use elgg_services::http::Request;
use elgg_services::security::{ActionsService, UrlSigner};
use elgg_services::session::{PersistentLoginService, StickyForms, SystemMessagesService};
use elgg_services::{Crypto, HmacFactory, PasswordService, Session, SiteSecret};

use super::{built, config, SEEDED};
use crate::names;

/// Secrets, tokens and the session
pub struct SecurityModule;

impl ServiceModule for SecurityModule {
    fn name(&self) -> &'static str {
        "security"
    }

    fn priority(&self) -> u32 {
        40
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define_type::<Crypto>(names::CRYPTO)?;

        container.define(names::SITE_SECRET, |c| {
            if let Some(key) = config(c)?.site_secret.as_deref().filter(|k| !k.is_empty()) {
                return Ok(Arc::new(SiteSecret::from_value(key)));
            }
            let table = c.resolve::<ConfigTable>(names::CONFIG_TABLE)?;
            let crypto = c.resolve::<Crypto>(names::CRYPTO)?;
            built(names::SITE_SECRET, SiteSecret::from_config_table(&table, &crypto))
        })?;

        container.define(names::HMAC, |c| {
            Ok(Arc::new(HmacFactory::new(
                c.resolve(names::SITE_SECRET)?,
                c.resolve(names::CRYPTO)?,
            )))
        })?;

        container.define_type::<UrlSigner>(names::URL_SIGNER)?;
        container.define_type::<PasswordService>(names::PASSWORDS)?;

        container.define(names::SESSION, |c| {
            Ok(Arc::new(Session::from_database(config(c)?, c.resolve(names::DB)?)))
        })?;

        container.define(names::ACTIONS, |c| {
            Ok(Arc::new(ActionsService::new(
                config(c)?,
                c.resolve(names::SESSION)?,
                c.resolve(names::CRYPTO)?,
            )))
        })?;

        container.define(names::PERSISTENT_LOGIN, |c| {
            let cookie = config(c)?.cookie_config().remember_me.clone();
            let request = c.resolve::<Request>(names::REQUEST)?;
            let token = request.cookie(&cookie.name).unwrap_or_default().to_string();
            Ok(Arc::new(PersistentLoginService::new(
                c.resolve(names::DB)?,
                c.resolve(names::SESSION)?,
                c.resolve(names::CRYPTO)?,
                cookie,
                token,
            )))
        })?;

        container.define(names::SYSTEM_MESSAGES, |c| {
            Ok(Arc::new(SystemMessagesService::new(c.resolve(names::SESSION)?)))
        })?;

        container.define_type::<StickyForms>(names::STICKY_FORMS)?;

        Ok(())
    }
}

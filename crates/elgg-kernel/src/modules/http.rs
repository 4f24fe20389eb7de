use std::sync::Arc;

use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::database::ConfigTable;
use elgg_services::http::{
    AjaxService, CacheHandler, Input, RedirectService, Router, ServeFileHandler,
};
use elgg_services::{
    HttpProtocolTransport, OutputBufferTransport, Request, ResponseFactory, ResponseTransport,
};

use super::{config, runtime, SEEDED};
use crate::names;

/// Request handling and response delivery
pub struct HttpModule;

impl ServiceModule for HttpModule {
    fn name(&self) -> &'static str {
        "http"
    }

    fn priority(&self) -> u32 {
        50
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define(names::REQUEST, |_| Ok(Arc::new(Request::from_environment())))?;
        container.define_type::<Input>(names::INPUT)?;

        container.define(names::AJAX, |c| {
            Ok(Arc::new(AjaxService {
                hooks: c.resolve(names::HOOKS)?,
                system_messages: c.resolve(names::SYSTEM_MESSAGES)?,
                input: c.resolve(names::INPUT)?,
                amd_config: c.resolve(names::AMD_CONFIG)?,
            }))
        })?;

        container.define(names::RESPONSE_FACTORY, |c| {
            let transport: Box<dyn ResponseTransport> = if runtime(c)?.is_cli() {
                Box::new(OutputBufferTransport::default())
            } else {
                Box::new(HttpProtocolTransport::default())
            };
            Ok(Arc::new(ResponseFactory::new(
                c.resolve(names::REQUEST)?,
                c.resolve(names::HOOKS)?,
                c.resolve(names::AJAX)?,
                transport,
            )))
        })?;

        container.define(names::ROUTER, |c| {
            let router = Router::new(c.resolve(names::HOOKS)?);
            if config(c)?.enable_profiling {
                return Ok(Arc::new(router.with_timer(c.resolve(names::TIMER)?)));
            }
            Ok(Arc::new(router))
        })?;

        container.define(names::REDIRECTS, |c| {
            let config = config(c)?;
            let request = c.resolve::<Request>(names::REQUEST)?;
            let current_url = format!(
                "{}{}",
                config.wwwroot,
                request.path.trim_start_matches('/')
            );
            Ok(Arc::new(RedirectService::new(
                c.resolve(names::SESSION)?,
                request.is_xml_http_request(),
                config.wwwroot.clone(),
                current_url,
            )))
        })?;

        // The config file wins over the stored setting; both missing means off
        container.define(names::CACHE_HANDLER, |c| {
            let config = config(c)?;
            let enabled = match config.simplecache_enabled {
                Some(enabled) => enabled,
                None => c
                    .resolve::<ConfigTable>(names::CONFIG_TABLE)?
                    .get("simplecache_enabled")
                    .and_then(|value| value.as_bool())
                    .unwrap_or(false),
            };
            Ok(Arc::new(CacheHandler::new(
                config,
                c.resolve(names::REQUEST)?,
                enabled,
            )))
        })?;

        container.define(names::SERVE_FILE_HANDLER, |c| {
            Ok(Arc::new(ServeFileHandler::new(
                c.resolve(names::HMAC)?,
                config(c)?,
            )))
        })?;

        Ok(())
    }
}

use std::sync::Arc;

use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::app::{BootService, DeprecationService};
use elgg_services::http::{Cli, Context, Request};
use elgg_services::{
    CliPrinter, EventsService, HandlersService, HtmlPrinter, Logger, PluginHooksService,
    SharedPrinter, Timer, Translator,
};

use super::{config, runtime, SEEDED};
use crate::names;

/// Boot, events, logging and translation
pub struct CoreModule;

impl ServiceModule for CoreModule {
    fn name(&self) -> &'static str {
        "core"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define_type::<Timer>(names::TIMER)?;
        container.define_type::<HandlersService>(names::HANDLERS)?;

        container.define(names::BOOT, |c| {
            let boot = BootService::new();
            if config(c)?.enable_profiling {
                return Ok(Arc::new(boot.with_timer(c.resolve(names::TIMER)?)));
            }
            Ok(Arc::new(boot))
        })?;

        container.define(names::HOOKS, |c| {
            let mut events = EventsService::new(c.resolve(names::HANDLERS)?);
            if config(c)?.enable_profiling {
                events = events.with_timer(c.resolve(names::TIMER)?);
            }
            Ok(Arc::new(PluginHooksService::new(Arc::new(events))))
        })?;

        container.define(names::PRINTER, |c| {
            let printer: SharedPrinter = if runtime(c)?.is_cli() {
                Box::new(CliPrinter)
            } else {
                Box::new(HtmlPrinter)
            };
            Ok(Arc::new(printer))
        })?;

        container.define(names::CONTEXT, |c| {
            let request = c.resolve::<Request>(names::REQUEST)?;
            Ok(Arc::new(Context::from_request(&request)))
        })?;

        container.define(names::LOGGER, |c| {
            Ok(Arc::new(Logger::new(
                c.resolve(names::HOOKS)?,
                c.resolve(names::CONTEXT)?,
                config(c)?,
                c.resolve(names::PRINTER)?,
            )))
        })?;

        container.define(names::TRANSLATOR, |c| Ok(Arc::new(Translator::new(config(c)?))))?;

        container.define(names::DEPRECATION, |c| {
            Ok(Arc::new(DeprecationService::new(c.resolve(names::LOGGER)?)))
        })?;

        container.define(names::CLI, |c| Ok(Arc::new(Cli::new(c.resolve(names::HOOKS)?))))?;

        Ok(())
    }
}

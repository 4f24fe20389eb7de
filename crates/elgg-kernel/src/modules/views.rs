use std::sync::Arc;

use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::caches::SimpleCache;
use elgg_services::views::{
    AmdConfig, AutoP, ColumnFactory, ExternalFiles, FormsService, MenuService, ViewCacher,
    ViewsService, WidgetsService,
};

use super::{config, SEEDED};
use crate::names;

/// Rendering and the assets pages pull in
pub struct ViewsModule;

impl ServiceModule for ViewsModule {
    fn name(&self) -> &'static str {
        "views"
    }

    fn priority(&self) -> u32 {
        70
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define(names::VIEWS, |c| {
            Ok(Arc::new(ViewsService::new(
                c.resolve(names::HOOKS)?,
                c.resolve(names::LOGGER)?,
                c.resolve(names::INPUT)?,
            )))
        })?;

        container.define(names::FORMS, |c| {
            Ok(Arc::new(FormsService::new(
                c.resolve(names::VIEWS)?,
                c.resolve(names::LOGGER)?,
            )))
        })?;

        container.define(names::VIEW_CACHER, |c| {
            Ok(Arc::new(ViewCacher::new(c.resolve(names::VIEWS)?, config(c)?)))
        })?;

        container.define(names::MENUS, |c| {
            Ok(Arc::new(MenuService::new(c.resolve(names::HOOKS)?, config(c)?)))
        })?;

        container.define(names::AMD_CONFIG, |c| {
            let amd = AmdConfig::new(c.resolve(names::HOOKS)?);
            let simple_cache = c.resolve::<SimpleCache>(names::SIMPLE_CACHE)?;
            amd.set_base_url(simple_cache.root());
            Ok(Arc::new(amd))
        })?;

        container.define_type::<AutoP>(names::AUTO_P)?;
        container.define_type::<ColumnFactory>(names::TABLE_COLUMNS)?;
        container.define_type::<ExternalFiles>(names::EXTERNAL_FILES)?;
        container.define_type::<WidgetsService>(names::WIDGETS)?;

        Ok(())
    }
}

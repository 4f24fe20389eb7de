//! The service provider of the Elgg kernel
//!
//! [`ServiceProvider`] owns a [`DIContainer`] seeded with the application
//! [`Config`] and the detected [`Runtime`]. Every other service is declared
//! by the kernel modules and built on first access.
//!
//! ```rust,no_run
//! use elgg_config::Config;
//! use elgg_kernel::{Runtime, ServiceProvider};
//!
//! let provider = ServiceProvider::with_runtime(Config::new(), Runtime::cli()).unwrap();
//! let db = provider.db().unwrap();
//! assert!(std::sync::Arc::ptr_eq(&db, &provider.db().unwrap()));
//! ```

use std::sync::Arc;

use elgg_cache::{FileCache, NullPool, ServerPool, StaticVariableCache};
use elgg_config::Config;
use elgg_di::{DIContainer, DIResult};
use elgg_services::app::{
    BatchUpgrader, BootService, DeprecationService, EmailService, EntityPreloader,
    NotificationsService, Plugins, Sendmail, UpgradeLocator, UpgradeService,
};
use elgg_services::caches::{
    AutoloadManager, ClassLoader, EntityCache, MetadataCache, PluginSettingsCache, SimpleCache,
    SystemCache,
};
use elgg_services::database::{AdminNotices, ConfigTable, DatabaseMutex, PublicDatabase, Seeder};
use elgg_services::http::{
    AjaxService, CacheHandler, Cli, Context, Input, RedirectService, Router, ServeFileHandler,
};
use elgg_services::media::{DiskFilestore, EntityIconService, TempDiskFilestore, UploadService};
use elgg_services::security::{ActionsService, UrlSigner};
use elgg_services::session::{
    PersistentLoginService, StickyForms, SystemMessagesService, UserCapabilities,
};
use elgg_services::tables::{
    AccessCollections, AnnotationsTable, EntityTable, MetadataTable, PrivateSettingsTable,
    RelationshipsTable, UsersTable,
};
use elgg_services::views::{
    AmdConfig, AutoP, ColumnFactory, ExternalFiles, FormsService, MenuService, ViewCacher,
    ViewsService, WidgetsService,
};
use elgg_services::{
    Crypto, Database, DbConfig, HandlersService, HmacFactory, ImageService, Logger,
    PasswordService, PluginHooksService, QueryCounter, Request, ResponseFactory, Session,
    SharedPrinter, SiteSecret, Timer, Translator,
};
use tracing::info;

use crate::modules::default_registry;
use crate::names;
use crate::runtime::Runtime;

/// Container holding every framework service of one application boot
pub struct ServiceProvider {
    container: DIContainer,
    config: Arc<Config>,
    runtime: Arc<Runtime>,
}

impl ServiceProvider {
    /// Boot a provider for the environment the process runs in
    pub fn new(config: Config) -> DIResult<Self> {
        Self::with_runtime(config, Runtime::detect())
    }

    pub fn with_runtime(mut config: Config, runtime: Runtime) -> DIResult<Self> {
        config.normalize();
        let config = Arc::new(config);
        let runtime = Arc::new(runtime);

        let container = DIContainer::new();
        container.define_value(names::CONFIG, Arc::clone(&config))?;
        container.define_value(names::RUNTIME, Arc::clone(&runtime))?;
        default_registry().register_all(&container)?;

        info!(
            "Service provider ready in {} mode ({} services)",
            runtime.mode,
            container.service_count()
        );

        Ok(Self {
            container,
            config,
            runtime,
        })
    }

    pub fn container(&self) -> &DIContainer {
        &self.container
    }

    /// Resolve a service by name
    pub fn resolve<T>(&self, name: &str) -> DIResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.container.resolve(name)
    }

    /// The configuration the provider was seeded with
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

macro_rules! accessors {
    ($($(#[$meta:meta])* $method:ident => $name:ident: $ty:ty;)*) => {
        impl ServiceProvider {
            $(
                $(#[$meta])*
                pub fn $method(&self) -> DIResult<Arc<$ty>> {
                    self.container.resolve::<$ty>(names::$name)
                }
            )*
        }
    };
}

accessors! {
    access_cache => ACCESS_CACHE: StaticVariableCache;
    access_collections => ACCESS_COLLECTIONS: AccessCollections;
    actions => ACTIONS: ActionsService;
    admin_notices => ADMIN_NOTICES: AdminNotices;
    ajax => AJAX: AjaxService;
    amd_config => AMD_CONFIG: AmdConfig;
    annotations_table => ANNOTATIONS_TABLE: AnnotationsTable;
    autoload_manager => AUTOLOAD_MANAGER: AutoloadManager;
    auto_p => AUTO_P: AutoP;
    batch_upgrader => BATCH_UPGRADER: BatchUpgrader;
    boot => BOOT: BootService;
    cache_handler => CACHE_HANDLER: CacheHandler;
    class_loader => CLASS_LOADER: ClassLoader;
    cli => CLI: Cli;
    config_table => CONFIG_TABLE: ConfigTable;
    context => CONTEXT: Context;
    crypto => CRYPTO: Crypto;
    db => DB: Database;
    db_config => DB_CONFIG: DbConfig;
    deprecation => DEPRECATION: DeprecationService;
    emails => EMAILS: EmailService;
    entity_cache => ENTITY_CACHE: EntityCache;
    entity_preloader => ENTITY_PRELOADER: EntityPreloader;
    entity_table => ENTITY_TABLE: EntityTable;
    external_files => EXTERNAL_FILES: ExternalFiles;
    file_cache => FILE_CACHE: FileCache;
    filestore => FILESTORE: DiskFilestore;
    forms => FORMS: FormsService;
    handlers => HANDLERS: HandlersService;
    hmac => HMAC: HmacFactory;
    hooks => HOOKS: PluginHooksService;
    icon_service => ICON_SERVICE: EntityIconService;
    image_service => IMAGE_SERVICE: ImageService;
    input => INPUT: Input;
    logger => LOGGER: Logger;
    mailer => MAILER: Sendmail;
    /// `None` unless memcache is enabled with at least one server
    memcache_stash_pool => MEMCACHE_STASH_POOL: Option<ServerPool>;
    menus => MENUS: MenuService;
    metadata_cache => METADATA_CACHE: MetadataCache;
    metadata_table => METADATA_TABLE: MetadataTable;
    mutex => MUTEX: DatabaseMutex;
    notifications => NOTIFICATIONS: NotificationsService;
    null_cache => NULL_CACHE: NullPool;
    passwords => PASSWORDS: PasswordService;
    persistent_login => PERSISTENT_LOGIN: PersistentLoginService;
    plugins => PLUGINS: Plugins;
    plugin_settings_cache => PLUGIN_SETTINGS_CACHE: PluginSettingsCache;
    /// Plain text on the command line, HTML otherwise
    printer => PRINTER: SharedPrinter;
    private_settings => PRIVATE_SETTINGS: PrivateSettingsTable;
    public_db => PUBLIC_DB: PublicDatabase;
    /// Built fresh on every call
    query_counter => QUERY_COUNTER: QueryCounter;
    redirects => REDIRECTS: RedirectService;
    relationships_table => RELATIONSHIPS_TABLE: RelationshipsTable;
    request => REQUEST: Request;
    response_factory => RESPONSE_FACTORY: ResponseFactory;
    router => ROUTER: Router;
    seeder => SEEDER: Seeder;
    serve_file_handler => SERVE_FILE_HANDLER: ServeFileHandler;
    session => SESSION: Session;
    simple_cache => SIMPLE_CACHE: SimpleCache;
    site_secret => SITE_SECRET: SiteSecret;
    sticky_forms => STICKY_FORMS: StickyForms;
    system_cache => SYSTEM_CACHE: SystemCache;
    system_messages => SYSTEM_MESSAGES: SystemMessagesService;
    table_columns => TABLE_COLUMNS: ColumnFactory;
    temp_filestore => TEMP_FILESTORE: TempDiskFilestore;
    timer => TIMER: Timer;
    translator => TRANSLATOR: Translator;
    upgrade_locator => UPGRADE_LOCATOR: UpgradeLocator;
    upgrades => UPGRADES: UpgradeService;
    uploads => UPLOADS: UploadService;
    url_signer => URL_SIGNER: UrlSigner;
    user_capabilities => USER_CAPABILITIES: UserCapabilities;
    users_table => USERS_TABLE: UsersTable;
    view_cacher => VIEW_CACHER: ViewCacher;
    views => VIEWS: ViewsService;
    widgets => WIDGETS: WidgetsService;
}

//! Names the provider registers its services under

pub const ACCESS_CACHE: &str = "accessCache";
pub const ACCESS_COLLECTIONS: &str = "accessCollections";
pub const ACTIONS: &str = "actions";
pub const ADMIN_NOTICES: &str = "adminNotices";
pub const AJAX: &str = "ajax";
pub const AMD_CONFIG: &str = "amdConfig";
pub const ANNOTATIONS_TABLE: &str = "annotationsTable";
pub const AUTOLOAD_MANAGER: &str = "autoloadManager";
pub const AUTO_P: &str = "autoP";
pub const BATCH_UPGRADER: &str = "batchUpgrader";
pub const BOOT: &str = "boot";
pub const CACHE_HANDLER: &str = "cacheHandler";
pub const CLASS_LOADER: &str = "classLoader";
pub const CLI: &str = "cli";
pub const CONFIG: &str = "config";
pub const CONFIG_TABLE: &str = "configTable";
pub const CONTEXT: &str = "context";
pub const CRYPTO: &str = "crypto";
pub const DB: &str = "db";
pub const DB_CONFIG: &str = "dbConfig";
pub const DEPRECATION: &str = "deprecation";
pub const EMAILS: &str = "emails";
pub const ENTITY_CACHE: &str = "entityCache";
pub const ENTITY_PRELOADER: &str = "entityPreloader";
pub const ENTITY_TABLE: &str = "entityTable";
pub const EXTERNAL_FILES: &str = "externalFiles";
pub const FILE_CACHE: &str = "fileCache";
pub const FILESTORE: &str = "filestore";
pub const FORMS: &str = "forms";
pub const HANDLERS: &str = "handlers";
pub const HMAC: &str = "hmac";
pub const HOOKS: &str = "hooks";
pub const ICON_SERVICE: &str = "iconService";
pub const IMAGE_SERVICE: &str = "imageService";
pub const INPUT: &str = "input";
pub const LOGGER: &str = "logger";
pub const MAILER: &str = "mailer";
pub const MEMCACHE_STASH_POOL: &str = "memcacheStashPool";
pub const MENUS: &str = "menus";
pub const METADATA_CACHE: &str = "metadataCache";
pub const METADATA_TABLE: &str = "metadataTable";
pub const MUTEX: &str = "mutex";
pub const NOTIFICATIONS: &str = "notifications";
pub const NULL_CACHE: &str = "nullCache";
pub const PASSWORDS: &str = "passwords";
pub const PERSISTENT_LOGIN: &str = "persistentLogin";
pub const PLUGINS: &str = "plugins";
pub const PLUGIN_SETTINGS_CACHE: &str = "pluginSettingsCache";
pub const PRINTER: &str = "printer";
pub const PRIVATE_SETTINGS: &str = "privateSettings";
pub const PUBLIC_DB: &str = "publicDb";
pub const QUERY_COUNTER: &str = "queryCounter";
pub const REDIRECTS: &str = "redirects";
pub const RELATIONSHIPS_TABLE: &str = "relationshipsTable";
pub const REQUEST: &str = "request";
pub const RESPONSE_FACTORY: &str = "responseFactory";
pub const ROUTER: &str = "router";
pub const RUNTIME: &str = "runtime";
pub const SEEDER: &str = "seeder";
pub const SERVE_FILE_HANDLER: &str = "serveFileHandler";
pub const SESSION: &str = "session";
pub const SIMPLE_CACHE: &str = "simpleCache";
pub const SITE_SECRET: &str = "siteSecret";
pub const STICKY_FORMS: &str = "stickyForms";
pub const SYSTEM_CACHE: &str = "systemCache";
pub const SYSTEM_MESSAGES: &str = "systemMessages";
pub const TABLE_COLUMNS: &str = "table_columns";
pub const TEMP_FILESTORE: &str = "temp_filestore";
pub const TIMER: &str = "timer";
pub const TRANSLATOR: &str = "translator";
pub const UPGRADE_LOCATOR: &str = "upgradeLocator";
pub const UPGRADES: &str = "upgrades";
pub const UPLOADS: &str = "uploads";
pub const URL_SIGNER: &str = "urlSigner";
pub const USER_CAPABILITIES: &str = "userCapabilities";
pub const USERS_TABLE: &str = "usersTable";
pub const VIEW_CACHER: &str = "viewCacher";
pub const VIEWS: &str = "views";
pub const WIDGETS: &str = "widgets";

/// Every name above, in alphabetical order
pub const ALL: &[&str] = &[
    ACCESS_CACHE,
    ACCESS_COLLECTIONS,
    ACTIONS,
    ADMIN_NOTICES,
    AJAX,
    AMD_CONFIG,
    ANNOTATIONS_TABLE,
    AUTOLOAD_MANAGER,
    AUTO_P,
    BATCH_UPGRADER,
    BOOT,
    CACHE_HANDLER,
    CLASS_LOADER,
    CLI,
    CONFIG,
    CONFIG_TABLE,
    CONTEXT,
    CRYPTO,
    DB,
    DB_CONFIG,
    DEPRECATION,
    EMAILS,
    ENTITY_CACHE,
    ENTITY_PRELOADER,
    ENTITY_TABLE,
    EXTERNAL_FILES,
    FILE_CACHE,
    FILESTORE,
    FORMS,
    HANDLERS,
    HMAC,
    HOOKS,
    ICON_SERVICE,
    IMAGE_SERVICE,
    INPUT,
    LOGGER,
    MAILER,
    MEMCACHE_STASH_POOL,
    MENUS,
    METADATA_CACHE,
    METADATA_TABLE,
    MUTEX,
    NOTIFICATIONS,
    NULL_CACHE,
    PASSWORDS,
    PERSISTENT_LOGIN,
    PLUGINS,
    PLUGIN_SETTINGS_CACHE,
    PRINTER,
    PRIVATE_SETTINGS,
    PUBLIC_DB,
    QUERY_COUNTER,
    REDIRECTS,
    RELATIONSHIPS_TABLE,
    REQUEST,
    RESPONSE_FACTORY,
    ROUTER,
    RUNTIME,
    SEEDER,
    SERVE_FILE_HANDLER,
    SESSION,
    SIMPLE_CACHE,
    SITE_SECRET,
    STICKY_FORMS,
    SYSTEM_CACHE,
    SYSTEM_MESSAGES,
    TABLE_COLUMNS,
    TEMP_FILESTORE,
    TIMER,
    TRANSLATOR,
    UPGRADE_LOCATOR,
    UPGRADES,
    UPLOADS,
    URL_SIGNER,
    USER_CAPABILITIES,
    USERS_TABLE,
    VIEW_CACHER,
    VIEWS,
    WIDGETS,
];

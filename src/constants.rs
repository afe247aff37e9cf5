// src/constants.rs

/// The root directory for everything the controller writes or mounts.
pub const WORKING_DIR: &str = "working_dir";

/// Subdirectory of the working dir holding generated harness configuration.
pub const CONFIG_DIR: &str = "config";

/// Subdirectory of the working dir holding per-executor run logs.
pub const RUN_LOGS_DIR: &str = "run_logs";

/// Subdirectory of the working dir holding control files (stop sentinel).
pub const CONTROL_DIR: &str = "control";

/// Subdirectory of the working dir holding CSV fixtures for ingestion mode.
pub const INGEST_DIR: &str = "ingest";

/// The generated properties file consumed by the external harness.
pub const PROPERTIES_FILENAME: &str = "systems.properties";

/// The seeded extraction query, created once inside the config dir.
pub const BASE_QUERY_FILENAME: &str = "base_query.sql";

/// The sentinel file the harness polls for a cooperative stop request.
pub const STOP_SENTINEL_FILENAME: &str = "stop_simulation";

/// Default path of the JSON settings file, next to the binary's working dir.
pub const SETTINGS_FILENAME: &str = "config.json";

/// The container image that ships the load-test harness.
pub const DEFAULT_DOCKER_IMAGE: &str = "rwidjaja/atscale-gatling:latest";

/// The Maven wrapper script used for local (non-container) harness runs.
pub const MAVEN_WRAPPER: &str = "./mvnw";

/// Port of the XMLA discovery/query endpoint.
pub const XMLA_PORT: u16 = 10502;

/// Port of the XMLA authentication endpoint.
pub const XMLA_AUTH_PORT: u16 = 10500;

/// Port of the per-catalog JDBC endpoint.
pub const JDBC_PORT: u16 = 15432;

/// Port of the shared postgres repository.
pub const POSTGRES_PORT: u16 = 10520;

/// Namespace of the rowset elements in XMLA discovery responses.
pub const XMLA_ROWSET_NS: &str = "urn:schemas-microsoft-com:xml-analysis:rowset";

/// How many trailing log lines are surfaced when an executor fails.
pub const LOG_EXCERPT_LINES: usize = 10;

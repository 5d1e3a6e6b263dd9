//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! The label and annotation keys are part of the public protocol with other
//! components (webhooks, dashboards, the workspace/user controllers) and must
//! not change.

/// API group of every custom resource served by this controller
pub const API_GROUP: &str = "cosmo-workspace.github.io";

/// API version of every custom resource served by this controller
pub const API_VERSION: &str = "v1alpha1";

/// Label carrying the owning instance name
pub const LABEL_INSTANCE: &str = "cosmo-workspace.github.io/instance";

/// Label carrying the source template name
pub const LABEL_TEMPLATE: &str = "cosmo-workspace.github.io/template";

/// Marker label stamped on every object the controller manages
pub const LABEL_CONTROLLER_MANAGED: &str = "cosmo-workspace.github.io/controller-managed";

/// Value of [`LABEL_CONTROLLER_MANAGED`]
pub const LABEL_CONTROLLER_MANAGED_VALUE: &str = "1";

/// Delete-policy annotation honoured by ownership injection and GC
pub const ANNOTATION_DELETE_POLICY: &str = "cosmo-workspace.github.io/delete-policy";

/// Value of [`ANNOTATION_DELETE_POLICY`] that detaches an object from the instance lifecycle
pub const DELETE_POLICY_KEEP: &str = "keep";

/// Template annotation that disables instance-name prefixing
pub const ANNOTATION_DISABLE_NAME_PREFIX: &str = "cosmo-workspace.github.io/disable-nameprefix";

/// Built-in template variable resolved to the instance name
pub const VAR_INSTANCE: &str = "{{INSTANCE}}";

/// Built-in template variable resolved to the instance namespace
pub const VAR_NAMESPACE: &str = "{{NAMESPACE}}";

/// Built-in template variable resolved to the template name
pub const VAR_TEMPLATE: &str = "{{TEMPLATE}}";

/// Field manager used for server-side apply
pub const DEFAULT_FIELD_MANAGER: &str = "instance-controller";

/// Reporting component on published events
pub const EVENT_REPORTER: &str = "instance-controller";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default interval between successful reconciliations of the same instance (seconds)
/// Level-triggered drift correction relies on this resync
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Default Fibonacci backoff floor (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Default Fibonacci backoff ceiling (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default number of instances reconciled concurrently per kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Initial watch backoff after API server throttling (milliseconds)
pub const WATCH_BACKOFF_START_MS: u64 = 1_000;

/// Ceiling of the watch throttling backoff (milliseconds)
pub const WATCH_BACKOFF_MAX_MS: u64 = 30_000;

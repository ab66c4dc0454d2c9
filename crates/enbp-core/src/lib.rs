// enbp-core: Blueprint packaging and site/device synchronization between
// enbp-api and the CLI.

pub mod client;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod manifest;
pub mod model;
pub mod packager;
pub mod repository;
pub mod service;
pub mod source;
pub mod store;
pub mod tasks;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoreConfig, TlsVerification};
pub use context::{AppContext, Pollers};
pub use error::CoreError;
pub use manifest::{BlueprintSpec, Manifest, ManifestError};
pub use packager::{ArchiveEntry, BlueprintPackager, PackageError, read_entries};
pub use repository::SiteRepository;
pub use service::{
    ActiveDeviceEvent, ActiveDeviceService, DevicesOnSiteService, SiteEvent,
    SitesConnectionsService,
};
pub use source::{LocalFs, SourceStore};
pub use store::{
    MemorySecretStore, MemoryStateStore, SecretStore, StateStore, StoreError,
};

pub use model::{CLOUD_API_URL, ConnectivityStatus, Device, Site, SiteKind};

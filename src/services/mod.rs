pub mod catalog_client;
pub mod franchise;
pub mod profile;
pub mod providers;
pub mod queue;
pub mod ranking;
pub mod recommendations;
pub mod tiering;
pub mod title_search;

pub use catalog_client::CatalogClient;
pub use providers::{CatalogGateway, ExternalCatalog};
pub use queue::{HttpTransport, QueueWorkerHandle, ReqwestTransport};
pub use recommendations::{RecommendationQuery, RecommendationService};
pub use title_search::TitleSearchService;

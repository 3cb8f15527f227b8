pub mod error;
pub mod models;
pub mod store;

pub use error::{CatalogError, CatalogResult};
pub use models::{ChannelRecord, IdeaRecord, NewChannel, VideoDraft, VideoRecord};
pub use store::{SqliteCatalogStore, SqliteCatalogStoreBuilder};

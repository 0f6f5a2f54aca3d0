pub mod entity;
pub mod manager;
pub mod reference_store;
pub mod window;

pub use entity::{EntityAssociation, EntityType};
pub use manager::{ContextSummary, ExportedState, MemoryManager, SearchOptions, TimestampedMessage};
pub use reference_store::{
    ContentReference, ContentReferenceStore, ContentSource, ContentType, ErrorType, ReferenceMetadata,
    ReferenceState, ResolveError, StoreOptions, StoreStats,
};
pub use window::{AddMessageResult, Importance, MemoryWindow};

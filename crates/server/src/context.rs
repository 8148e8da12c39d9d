use std::sync::Arc;

use mcft_store::{ConversionQueue, MetadataStore};
use mcft_transfer::ContentLayout;

use crate::directory::DirectoryResolver;

/// Collaborators shared by every session on a server.
pub struct Services {
    pub store: Arc<dyn MetadataStore>,
    pub conversions: Arc<dyn ConversionQueue>,
    pub layout: ContentLayout,
    pub resolver: DirectoryResolver,
}

impl Services {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        conversions: Arc<dyn ConversionQueue>,
        layout: ContentLayout,
    ) -> Self {
        let resolver = DirectoryResolver::new(Arc::clone(&store));
        Self {
            store,
            conversions,
            layout,
            resolver,
        }
    }
}

//! Badge renderers and the registry that routes to them.
//!
//! A renderer implements [`BadgeService`] for one category (the first path
//! segment), or for paths with no category at all. Integrations that fetch
//! live data plug in here; the crate ships only the static renderers whose
//! content is carried in the request itself.

mod static_badge;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::badge::Badge;
use crate::error::RenderError;
use crate::request::RenderParams;

pub use static_badge::{
    parse_badge_content, QueryStaticBadgeService, RootStaticBadgeService, StaticBadgeService,
};

/// Future returned by [`BadgeService::render`].
pub type RenderFuture<'a> = BoxFuture<'a, Result<Badge, RenderError>>;

/// A renderer for one badge category.
pub trait BadgeService: Send + Sync + 'static {
    /// Leading path segment this renderer answers to, matched
    /// case-sensitively. `None` answers single-segment paths such as
    /// `/:label-message-color.svg`.
    fn category(&self) -> Option<&str>;

    /// Whether the subject path is one this renderer can render. Must not
    /// suspend or perform I/O.
    fn accepts(&self, subject: &[String]) -> bool;

    /// Produce the badge. Runs after dispatch, possibly suspending on I/O.
    fn render<'a>(&'a self, subject: &'a [String], params: &'a RenderParams) -> RenderFuture<'a>;
}

/// Renderers by category. Immutable once the server is built.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Vec<Arc<dyn BadgeService>>>,
    root: Vec<Arc<dyn BadgeService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the renderers shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(StaticBadgeService);
        registry.register(RootStaticBadgeService);
        registry.register(QueryStaticBadgeService);
        registry
    }

    pub fn register(&mut self, service: impl BadgeService) {
        self.register_arc(Arc::new(service));
    }

    pub fn register_arc(&mut self, service: Arc<dyn BadgeService>) {
        match service.category().map(str::to_string) {
            Some(category) => self.services.entry(category).or_default().push(service),
            None => self.root.push(service),
        }
    }

    /// First renderer registered for `category` that accepts `subject`.
    /// `None` searches the renderers without a category.
    pub fn resolve(
        &self,
        category: Option<&str>,
        subject: &[String],
    ) -> Option<Arc<dyn BadgeService>> {
        let candidates = match category {
            Some(category) => self.services.get(category)?,
            None => &self.root,
        };
        candidates
            .iter()
            .find(|service| service.accepts(subject))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.services.values().map(Vec::len).sum::<usize>() + self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.services.keys().map(String::as_str).collect();
        categories.sort_unstable();
        categories
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("categories", &self.categories())
            .field("root_services", &self.root.len())
            .field("service_count", &self.len())
            .finish()
    }
}

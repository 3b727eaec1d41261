//! Statistics built on top of the query builder.
//!
//! [`Analyzer`] owns the store and the query defaults. Each group of
//! statistics is a thin consumer borrowing it: the consumer picks fields,
//! grouping and ordering, builds the statement and decodes the rows.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::backends::Store;
use crate::config::QueryConfig;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::fields::Field;
use crate::filter::Filter;
use crate::query_builder::{build_query, QuerySpec};
use crate::sql_ast::Statement;

mod demographics;
mod device;
mod events;
mod options;
mod pages;
mod sessions;
mod tags;
mod utm;
mod visitors;

pub use demographics::Demographics;
pub use device::Device;
pub use events::Events;
pub use options::FilterOptions;
pub use pages::Pages;
pub use sessions::Sessions;
pub use tags::Tags;
pub use utm::Utm;
pub use visitors::Visitors;

/// Entry point for all statistics of one store.
#[derive(Clone)]
pub struct Analyzer {
    store: Arc<dyn Store>,
    defaults: QueryConfig,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("dialect", &self.store.dialect().name())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Analyzer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            defaults: QueryConfig::default(),
        }
    }

    /// Uses `config` for filter fields the caller leaves unset.
    pub fn with_config(store: Arc<dyn Store>, config: &QueryConfig) -> Result<Self> {
        config.timezone()?;
        Ok(Self {
            store,
            defaults: config.clone(),
        })
    }

    pub fn visitors(&self) -> Visitors<'_> {
        Visitors::new(self)
    }

    pub fn pages(&self) -> Pages<'_> {
        Pages::new(self)
    }

    pub fn events(&self) -> Events<'_> {
        Events::new(self)
    }

    pub fn tags(&self) -> Tags<'_> {
        Tags::new(self)
    }

    pub fn sessions(&self) -> Sessions<'_> {
        Sessions::new(self)
    }

    pub fn demographics(&self) -> Demographics<'_> {
        Demographics::new(self)
    }

    pub fn device(&self) -> Device<'_> {
        Device::new(self)
    }

    pub fn utm(&self) -> Utm<'_> {
        Utm::new(self)
    }

    /// Distinct values to offer in filter pickers.
    pub fn options(&self) -> FilterOptions<'_> {
        FilterOptions::new(self)
    }

    /// A validated copy of `filter`, or a filter for the default client.
    ///
    /// The caller's filter is never modified.
    pub fn get_filter(&self, filter: Option<&Filter>) -> Filter {
        let mut filter = match filter {
            Some(filter) => filter.clone(),
            None => Filter::new(self.defaults.default_client_id),
        };
        self.apply_defaults(&mut filter);
        filter.validate();
        filter
    }

    fn apply_defaults(&self, filter: &mut Filter) {
        if filter.timezone.is_none() {
            // validated in with_config
            filter.timezone = self.defaults.timezone().ok();
        }
        if filter.max_time_on_page_seconds == 0 {
            filter.max_time_on_page_seconds = self.defaults.max_time_on_page_seconds;
        }
        if filter.sample == 0 {
            filter.sample = self.defaults.sample;
        }
        if filter.ctx.timeout().is_none() {
            if let Some(timeout) = self.defaults.timeout() {
                filter.ctx = filter.ctx.clone().with_timeout(timeout);
            }
        }
    }

    pub(crate) fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        self.store.dialect()
    }

    pub(crate) fn build(&self, filter: &Filter, spec: &QuerySpec) -> Statement {
        build_query(filter, spec, self.dialect())
    }

    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        filter: &Filter,
        spec: &QuerySpec,
    ) -> Result<Vec<T>> {
        let statement = self.build(filter, spec);
        self.fetch(filter, &statement).await
    }

    pub(crate) async fn select_one<T: DeserializeOwned + Default>(
        &self,
        filter: &Filter,
        spec: &QuerySpec,
    ) -> Result<T> {
        let statement = self.build(filter, spec);
        self.store.select_one(&filter.ctx, &statement).await
    }

    /// Visitors and their share per combination of `attributes`, most visited first.
    pub(crate) async fn select_by_attribute<T: DeserializeOwned>(
        &self,
        filter: Option<&Filter>,
        attributes: &[Field],
    ) -> Result<Vec<T>> {
        let filter = self.get_filter(filter);
        let mut fields = attributes.to_vec();
        fields.extend([Field::Visitors, Field::RelativeVisitors]);
        let mut order_by = vec![Field::Visitors];
        order_by.extend_from_slice(attributes);
        let spec = QuerySpec::new(&fields)
            .group_by(attributes)
            .order_by(&order_by);
        self.select(&filter, &spec).await
    }

    /// Runs a statement built outside the planner.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        filter: &Filter,
        statement: &Statement,
    ) -> Result<Vec<T>> {
        self.store.select(&filter.ctx, statement).await
    }

    pub(crate) async fn count(&self, filter: &Filter, statement: &Statement) -> Result<i64> {
        self.store.count(&filter.ctx, statement).await
    }
}

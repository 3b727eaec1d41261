use crate::error::Result;
use crate::fields::Field;
use crate::filter::Filter;
use crate::models::{
    BrowserStats, BrowserVersionStats, OsStats, OsVersionStats, PlatformStats, ScreenClassStats,
};

use super::Analyzer;

/// Visitors by platform, browser, operating system and screen size.
#[derive(Debug, Clone, Copy)]
pub struct Device<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> Device<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    /// Visitors per platform. Visitors flagged neither desktop nor mobile count as `unknown`.
    pub async fn platform(&self, filter: Option<&Filter>) -> Result<Vec<PlatformStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Platform])
            .await
    }

    pub async fn browser(&self, filter: Option<&Filter>) -> Result<Vec<BrowserStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Browser])
            .await
    }

    pub async fn browser_version(
        &self,
        filter: Option<&Filter>,
    ) -> Result<Vec<BrowserVersionStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Browser, Field::BrowserVersion])
            .await
    }

    pub async fn os(&self, filter: Option<&Filter>) -> Result<Vec<OsStats>> {
        self.analyzer.select_by_attribute(filter, &[Field::Os]).await
    }

    pub async fn os_version(&self, filter: Option<&Filter>) -> Result<Vec<OsVersionStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Os, Field::OsVersion])
            .await
    }

    pub async fn screen_class(&self, filter: Option<&Filter>) -> Result<Vec<ScreenClassStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::ScreenClass])
            .await
    }
}

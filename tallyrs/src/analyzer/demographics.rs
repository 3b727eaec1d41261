use crate::error::Result;
use crate::fields::Field;
use crate::filter::Filter;
use crate::models::{CityStats, CountryStats, LanguageStats, RegionStats};

use super::Analyzer;

/// Visitors by language and location.
#[derive(Debug, Clone, Copy)]
pub struct Demographics<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> Demographics<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    pub async fn languages(&self, filter: Option<&Filter>) -> Result<Vec<LanguageStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Language])
            .await
    }

    pub async fn countries(&self, filter: Option<&Filter>) -> Result<Vec<CountryStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Country])
            .await
    }

    /// Regions are grouped together with their country, as names repeat across countries.
    pub async fn regions(&self, filter: Option<&Filter>) -> Result<Vec<RegionStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Country, Field::Region])
            .await
    }

    pub async fn cities(&self, filter: Option<&Filter>) -> Result<Vec<CityStats>> {
        self.analyzer
            .select_by_attribute(filter, &[Field::Country, Field::Region, Field::City])
            .await
    }
}

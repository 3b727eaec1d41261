use crate::error::Result;
use crate::fields::Field;
use crate::filter::Filter;
use crate::models::UtmStats;

use super::Analyzer;

/// Visitors per UTM parameter value.
#[derive(Debug, Clone, Copy)]
pub struct Utm<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> Utm<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    pub async fn source(&self, filter: Option<&Filter>) -> Result<Vec<UtmStats>> {
        self.by(filter, Field::UtmSource).await
    }

    pub async fn medium(&self, filter: Option<&Filter>) -> Result<Vec<UtmStats>> {
        self.by(filter, Field::UtmMedium).await
    }

    pub async fn campaign(&self, filter: Option<&Filter>) -> Result<Vec<UtmStats>> {
        self.by(filter, Field::UtmCampaign).await
    }

    pub async fn content(&self, filter: Option<&Filter>) -> Result<Vec<UtmStats>> {
        self.by(filter, Field::UtmContent).await
    }

    pub async fn term(&self, filter: Option<&Filter>) -> Result<Vec<UtmStats>> {
        self.by(filter, Field::UtmTerm).await
    }

    async fn by(&self, filter: Option<&Filter>, parameter: Field) -> Result<Vec<UtmStats>> {
        self.analyzer.select_by_attribute(filter, &[parameter]).await
    }
}

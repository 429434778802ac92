//! Database models
//!
//! JSON field names follow the public API (`Town`, `Region`,
//! `Number_of_Galamsay_Sites`), which predates this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A persisted site observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: i64,
    #[serde(rename = "Town")]
    pub town: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Number_of_Galamsay_Sites")]
    pub site_count: i64,
    /// Owning upload batch; `None` for records created directly
    pub batch_id: Option<i64>,
}

/// Body of `POST /gsites/`
#[derive(Debug, Clone, Deserialize)]
pub struct NewSiteRecord {
    #[serde(rename = "Town")]
    pub town: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Number_of_Galamsay_Sites")]
    pub site_count: i64,
}

impl NewSiteRecord {
    /// Trim names and check the same rules the CSV rows obey
    pub fn normalized(self) -> Result<Self> {
        let town = self.town.trim().to_string();
        let region = self.region.trim().to_string();

        if town.is_empty() {
            return Err(Error::InvalidInput("Town must not be empty".to_string()));
        }
        if region.is_empty() {
            return Err(Error::InvalidInput("Region must not be empty".to_string()));
        }
        if self.site_count < 0 {
            return Err(Error::InvalidInput(
                "Number_of_Galamsay_Sites must not be negative".to_string(),
            ));
        }

        Ok(Self {
            town,
            region,
            site_count: self.site_count,
        })
    }
}

/// Metadata for one CSV import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBatch {
    pub id: i64,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub record_count: i64,
}

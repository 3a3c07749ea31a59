//! Sample method summary accessors
//!
//! Each sample method exposes per-project observations plus the same
//! observations aggregated by sample unit and by sample event.

use crate::client::{Client, ListQuery};
use crate::error::Result;
use crate::table::Table;

/// Accessor for Fish Belt Transect data
pub struct FishBelt<'a> {
    pub(crate) client: &'a Client,
}

impl FishBelt<'_> {
    /// A project's Fish Belt Transect observations
    pub async fn observations(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/beltfishes/obstransectbeltfishes/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample unit
    pub async fn sample_units(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/beltfishes/sampleunits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample event
    pub async fn sample_events(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/beltfishes/sampleevents/");
        self.client.table(&ListQuery::new(path)).await
    }
}

/// Accessor for Benthic Point Intercept Transect data
pub struct BenthicPit<'a> {
    pub(crate) client: &'a Client,
}

impl BenthicPit<'_> {
    /// A project's Benthic PIT observations
    pub async fn observations(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthicpits/obstransectbenthicpits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample unit
    pub async fn sample_units(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthicpits/sampleunits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample event
    pub async fn sample_events(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthicpits/sampleevents/");
        self.client.table(&ListQuery::new(path)).await
    }
}

/// Accessor for Benthic Line Intercept Transect data
pub struct BenthicLit<'a> {
    pub(crate) client: &'a Client,
}

impl BenthicLit<'_> {
    /// A project's Benthic LIT observations
    pub async fn observations(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthiclits/obstransectbenthiclits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample unit
    pub async fn sample_units(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthiclits/sampleunits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample event
    pub async fn sample_events(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthiclits/sampleevents/");
        self.client.table(&ListQuery::new(path)).await
    }
}

/// Accessor for Benthic Photo Quadrat data
pub struct BenthicPhotoQuadrat<'a> {
    pub(crate) client: &'a Client,
}

impl BenthicPhotoQuadrat<'_> {
    /// A project's Benthic Photo Quadrat observations
    pub async fn observations(&self, project_id: &str) -> Result<Table> {
        let path =
            format!("/projects/{project_id}/benthicpqts/obstransectbenthicpqts/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample unit
    pub async fn sample_units(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthicpqts/sampleunits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample event
    pub async fn sample_events(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/benthicpqts/sampleevents/");
        self.client.table(&ListQuery::new(path)).await
    }
}

/// Accessor for coral bleaching data
pub struct Bleaching<'a> {
    pub(crate) client: &'a Client,
}

impl Bleaching<'_> {
    /// A project's bleached-colony observations
    pub async fn colonies_bleached_observations(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/bleachingqcs/obscoloniesbleacheds/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// A project's percent-cover observations of hard coral, macroalgae and
    /// soft coral
    pub async fn percent_cover_observations(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/bleachingqcs/obsquadratbenthicpercents/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample unit
    pub async fn sample_units(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/bleachingqcs/sampleunits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample event
    pub async fn sample_events(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/bleachingqcs/sampleevents/");
        self.client.table(&ListQuery::new(path)).await
    }
}

/// Accessor for Habitat Complexity data
pub struct HabitatComplexity<'a> {
    pub(crate) client: &'a Client,
}

impl HabitatComplexity<'_> {
    /// A project's Habitat Complexity observations
    pub async fn observations(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/habitatcomplexities/obshabitatcomplexities/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample unit
    pub async fn sample_units(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/habitatcomplexities/sampleunits/");
        self.client.table(&ListQuery::new(path)).await
    }

    /// Observations aggregated by sample event
    pub async fn sample_events(&self, project_id: &str) -> Result<Table> {
        let path = format!("/projects/{project_id}/habitatcomplexities/sampleevents/");
        self.client.table(&ListQuery::new(path)).await
    }
}

/// Accessor for cross-project sample event summaries
pub struct SampleEvents<'a> {
    pub(crate) client: &'a Client,
}

/// Columns kept when the summary is fetched with `limit_columns`
const SUMMARY_COLUMNS: [&str; 22] = [
    "project",
    "tags",
    "country",
    "site",
    "latitude",
    "longitude",
    "reef_type",
    "reef_zone",
    "reef_exposure",
    "management",
    "sample_date",
    "data_policy_beltfish",
    "data_policy_benthiclit",
    "data_policy_benthicpit",
    "data_policy_benthicpqt",
    "data_policy_habitatcomplexity",
    "data_policy_bleachingqc",
    "project_notes",
    "site_notes",
    "management_notes",
    "contact_link",
    "protocols",
];

impl SampleEvents<'_> {
    /// Summary of sample events across all visible projects.
    ///
    /// `limit_columns` trims the table to the usual analysis columns and
    /// tidies their names; `flatten_protocols` promotes the per-protocol
    /// aggregates nested under `protocols` into top-level columns.
    pub async fn summary(&self, limit_columns: bool, flatten_protocols: bool) -> Result<Table> {
        let mut query = ListQuery::new("/summarysampleevents/");
        if limit_columns {
            query = query
                .columns(SUMMARY_COLUMNS)
                .rename("project_name", "project")
                .rename("country_name", "country")
                .rename("site_name", "site")
                .rename("management_name", "management");
        }
        let table = self.client.table(&query).await?;
        if flatten_protocols {
            table.flatten("protocols", None)
        } else {
            Ok(table)
        }
    }
}

//! Resource accessors
//!
//! Thin, stateless wrappers over the fetch engine. Each wrapper supplies the
//! URL paths for one resource family and, where the API's column names need
//! tidying, a projection and rename map; everything else is delegated to
//! [`Client::table`](crate::Client::table).

mod projects;
mod summaries;

pub use projects::{
    ProjectSearch, Projects, PROJECT_STATUS_LOCKED, PROJECT_STATUS_OPEN, PROJECT_STATUS_TEST,
};
pub use summaries::{
    BenthicLit, BenthicPhotoQuadrat, BenthicPit, Bleaching, FishBelt, HabitatComplexity,
    SampleEvents,
};

use crate::client::Client;

impl Client {
    /// MERMAID projects
    pub fn projects(&self) -> Projects<'_> {
        Projects { client: self }
    }

    /// Fish Belt Transect sample method
    pub fn fish_belt(&self) -> FishBelt<'_> {
        FishBelt { client: self }
    }

    /// Benthic Point Intercept Transect sample method
    pub fn benthic_pit(&self) -> BenthicPit<'_> {
        BenthicPit { client: self }
    }

    /// Benthic Line Intercept Transect sample method
    pub fn benthic_lit(&self) -> BenthicLit<'_> {
        BenthicLit { client: self }
    }

    /// Benthic Photo Quadrat sample method
    pub fn benthic_photo_quadrat(&self) -> BenthicPhotoQuadrat<'_> {
        BenthicPhotoQuadrat { client: self }
    }

    /// Coral bleaching sample method
    pub fn bleaching(&self) -> Bleaching<'_> {
        Bleaching { client: self }
    }

    /// Habitat Complexity sample method
    pub fn habitat_complexity(&self) -> HabitatComplexity<'_> {
        HabitatComplexity { client: self }
    }

    /// Cross-project sample event summaries
    pub fn sample_events(&self) -> SampleEvents<'_> {
        SampleEvents { client: self }
    }
}

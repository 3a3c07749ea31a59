//! Project listing and search

use crate::client::{Client, ListQuery};
use crate::error::Result;
use crate::table::Table;

/// Status value of open projects
pub const PROJECT_STATUS_OPEN: u32 = 90;
/// Status value of test projects
pub const PROJECT_STATUS_TEST: u32 = 80;
/// Status value of locked projects
pub const PROJECT_STATUS_LOCKED: u32 = 10;

/// Search criteria for [`Projects::search`]
#[derive(Debug, Clone, Default)]
pub struct ProjectSearch {
    /// Restrict to projects carrying any of these tags
    pub tags: Vec<String>,
    /// Include test projects in the results
    pub include_test_projects: bool,
}

/// Accessor for MERMAID projects
pub struct Projects<'a> {
    pub(crate) client: &'a Client,
}

impl Projects<'_> {
    /// List the projects the authenticated user belongs to
    pub async fn my_projects(&self) -> Result<Table> {
        self.client.table(&ListQuery::new("/projects/")).await
    }

    /// Search all projects, filtered by the given criteria
    pub async fn search(&self, search: &ProjectSearch) -> Result<Table> {
        let mut query = ListQuery::new("/projects/").param("showall", "t");
        if !search.tags.is_empty() {
            query = query.param("tags", search.tags.join(","));
        }
        if !search.include_test_projects {
            query = query.param("status", PROJECT_STATUS_OPEN.to_string());
        }
        self.client.table(&query).await
    }
}

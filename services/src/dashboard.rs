use client::{ApiClient, ClientError, ListQuery, Page};
use serde::de::IgnoredAny;

/// Collection sizes shown on the landing screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub students: u64,
    pub courses: u64,
    pub instructors: u64,
    pub classes: u64,
}

async fn count(client: &ApiClient, path: &str) -> Result<u64, ClientError> {
    let page: Page<IgnoredAny> = client.list(path, &ListQuery::new().page_size(1)).await?;
    Ok(page.count)
}

/// Four one-row list calls issued together; only their `count` is kept.
pub async fn dashboard_counts(client: &ApiClient) -> Result<DashboardCounts, ClientError> {
    let (students, courses, instructors, classes) = futures::try_join!(
        count(client, "/students/"),
        count(client, "/courses/"),
        count(client, "/instructors/"),
        count(client, "/classes/"),
    )?;
    Ok(DashboardCounts {
        students,
        courses,
        instructors,
        classes,
    })
}

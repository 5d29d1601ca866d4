//! [`ProjectBoard`] over the Projects V2 GraphQL API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use pipeline::{
    BoardSource, GitHubError, IssueNumber, ProjectBoard, ProjectItemId, StatusOptionId, WorkItem,
};

use crate::GitHubClient;

/// Items fetched per GraphQL page.
const ITEMS_PAGE_SIZE: u32 = 50;

/// Upper bound on pages read per poll, so a huge board cannot stall a cycle.
const MAX_ITEM_PAGES: usize = 20;

/// Field values fetched per item, the GraphQL page maximum. The status value
/// is looked up among these; an item with more set field values than this
/// may have its status fall outside the page and be treated as not ready.
const FIELD_VALUES_PER_ITEM: u32 = 100;

const READY_ITEMS_QUERY: &str = r#"
query($projectId: ID!, $first: Int!, $cursor: String, $fieldValues: Int!) {
  node(id: $projectId) {
    ... on ProjectV2 {
      items(first: $first, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          fieldValues(first: $fieldValues) {
            nodes {
              ... on ProjectV2ItemFieldSingleSelectValue {
                field { ... on ProjectV2SingleSelectField { id } }
                optionId
              }
            }
          }
          content {
            ... on Issue {
              number
              title
              body
            }
          }
        }
      }
    }
  }
}
"#;

const SET_STATUS_MUTATION: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId
    itemId: $itemId
    fieldId: $fieldId
    value: { singleSelectOptionId: $optionId }
  }) {
    projectV2Item { id }
  }
}
"#;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ItemsData {
    node: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
    // Absent when the id resolves to something other than a ProjectV2.
    items: Option<ItemConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemConnection {
    page_info: PageInfo,
    nodes: Vec<Option<ItemNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemNode {
    id: String,
    field_values: FieldValueConnection,
    // Null for deleted issues; `{}` for drafts and pull requests.
    content: Option<IssueContent>,
}

#[derive(Debug, Deserialize)]
struct FieldValueConnection {
    nodes: Vec<Option<FieldValue>>,
}

// Non-single-select values come back as `{}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    field: Option<FieldRef>,
    option_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueContent {
    number: Option<u64>,
    title: Option<String>,
    body: Option<String>,
}

impl ItemNode {
    fn status_option(&self, source: &BoardSource) -> Option<&str> {
        self.field_values.nodes.iter().flatten().find_map(|fv| {
            let field_id = fv.field.as_ref()?.id.as_deref()?;
            if field_id == source.status_field_id.as_str() {
                fv.option_id.as_deref()
            } else {
                None
            }
        })
    }

    /// Converts a board item into a work item if it is a ready issue.
    fn into_ready_item(self, source: &BoardSource) -> Option<WorkItem> {
        if self.status_option(source) != Some(source.status_options.ready.as_str()) {
            return None;
        }
        let Some(content) = self.content else {
            debug!(item_id = %self.id, "skipping ready item without content");
            return None;
        };
        let Some(number) = content.number else {
            debug!(item_id = %self.id, "skipping ready item that is not an issue");
            return None;
        };
        Some(WorkItem {
            id: ProjectItemId::new(self.id)?,
            number: IssueNumber::new(number),
            title: content.title.unwrap_or_default(),
            body: content.body.unwrap_or_default(),
            source: source.name.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// ProjectBoard
// ---------------------------------------------------------------------------

#[async_trait]
impl ProjectBoard for GitHubClient {
    #[instrument(skip_all, fields(source = %source.name, board = %source.board_id))]
    async fn list_ready_items(&self, source: &BoardSource) -> Result<Vec<WorkItem>, GitHubError> {
        let mut ready = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=MAX_ITEM_PAGES {
            let data: ItemsData = self
                .graphql(
                    READY_ITEMS_QUERY,
                    json!({
                        "projectId": source.board_id.as_str(),
                        "first": ITEMS_PAGE_SIZE,
                        "cursor": cursor,
                        "fieldValues": FIELD_VALUES_PER_ITEM,
                    }),
                )
                .await?;

            let items = data
                .node
                .and_then(|node| node.items)
                .ok_or_else(|| GitHubError::BoardNotFound(source.board_id.to_string()))?;

            ready.extend(
                items
                    .nodes
                    .into_iter()
                    .flatten()
                    .filter_map(|node| node.into_ready_item(source)),
            );

            match (items.page_info.has_next_page, items.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => return Ok(ready),
            }
            if page == MAX_ITEM_PAGES {
                warn!(pages = MAX_ITEM_PAGES, "board has more items than the page cap; remaining items ignored this poll");
            }
        }
        Ok(ready)
    }

    #[instrument(skip_all, fields(source = %source.name, item_id = %item, option = %option))]
    async fn set_status(
        &self,
        item: &ProjectItemId,
        option: &StatusOptionId,
        source: &BoardSource,
    ) -> Result<(), GitHubError> {
        let _: serde_json::Value = self
            .graphql(
                SET_STATUS_MUTATION,
                json!({
                    "projectId": source.board_id.as_str(),
                    "itemId": item.as_str(),
                    "fieldId": source.status_field_id.as_str(),
                    "optionId": option.as_str(),
                }),
            )
            .await?;
        debug!("status updated");
        Ok(())
    }
}

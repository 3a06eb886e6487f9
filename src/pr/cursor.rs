use serde::Deserialize;
use serde_json::Value;

use crate::github::GraphQlRequest;

/// The `pageInfo` of one page of a GraphQL connection.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

impl PageCursor {
    /// Points the named cursor variable of `request` past this page and
    /// returns true if more pages follow.
    ///
    /// On the last page the cursor is still moved to the end, so a combined
    /// query that keeps paging another connection gets empty pages here.
    pub fn advance(&self, request: &mut GraphQlRequest, variable: &str) -> bool {
        if let Some(end) = &self.end_cursor {
            request.set_var(variable, Value::String(end.clone()));
            return self.has_next_page;
        }
        false
    }
}

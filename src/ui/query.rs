use std::str::FromStr;

use serde::Deserialize;

use crate::shared::search::SearchQuery;
use crate::shared::{AgentsClient, ClientConfig, ListParams, SortOrder};
use crate::ui::error::{UiError, UiResult};
use crate::ui::state::UiState;

/// Query parameters understood by every proxy route.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyQuery {
    pub project: Option<String>,
    pub api_version: Option<String>,
    pub limit: Option<String>,
    pub order: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub mode: Option<String>,
    pub debug: Option<String>,
    pub q: Option<String>,
    pub max_results: Option<String>,
    pub scan_limit: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ProxyQuery {
    pub fn legacy(&self) -> bool {
        self.mode.as_deref() == Some("legacy")
    }

    pub fn client(&self, state: &UiState) -> UiResult<AgentsClient> {
        let project = present(&self.project)
            .or(state.default_project.as_deref())
            .ok_or_else(|| {
                UiError::BadRequest("Set AZA_PROJECT or supply ?project=<endpoint>".to_string())
            })?;

        let config = ClientConfig::new(project)
            .with_api_version(self.api_version.clone())
            .with_debug(state.debug || self.debug.as_deref() == Some("true"));
        Ok(AgentsClient::new(
            state.http.clone(),
            &config,
            state.credential.clone(),
        )?)
    }

    fn order(&self) -> UiResult<Option<SortOrder>> {
        present(&self.order)
            .map(SortOrder::from_str)
            .transpose()
            .map_err(UiError::from)
    }

    pub fn list_params(&self) -> UiResult<ListParams> {
        let limit = present(&self.limit)
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| UiError::BadRequest(format!("Invalid limit '{raw}'")))
            })
            .transpose()?;

        Ok(ListParams {
            limit,
            order: self.order()?,
            after: present(&self.after).map(str::to_string),
            before: present(&self.before).map(str::to_string),
        })
    }

    /// `maxResults` falls back to `limit`, which is also the page size.
    pub fn search_query(&self) -> UiResult<SearchQuery> {
        let query = SearchQuery::from_raw(
            self.q.clone().unwrap_or_default(),
            present(&self.max_results).or(present(&self.limit)),
            present(&self.scan_limit),
            present(&self.limit),
        );
        Ok(query.with_order(self.order()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Credential;
    use reqwest::Client;

    fn state(default_project: Option<&str>) -> UiState {
        UiState::new(
            Client::new(),
            Credential::from_token(Some("test-token".into())),
            default_project.map(str::to_string),
            "dist",
        )
    }

    fn query(pairs: &str) -> ProxyQuery {
        let uri: axum::http::Uri = format!("/x?{pairs}").parse().unwrap();
        axum::extract::Query::<ProxyQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn project_comes_from_query_or_environment() {
        let err = query("limit=5").client(&state(None)).err().unwrap();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);

        assert!(query("").client(&state(Some("https://env.example/api/projects/p"))).is_ok());
        assert!(query("project=https%3A%2F%2Fq.example%2Fapi%2Fprojects%2Fp")
            .client(&state(None))
            .is_ok());
    }

    #[test]
    fn list_params_validate_limit_and_order() {
        let params = query("limit=20&order=desc&after=conv_1&before=").list_params().unwrap();
        assert_eq!(params.limit, Some(20));
        assert_eq!(params.order, Some(SortOrder::Desc));
        assert_eq!(params.after.as_deref(), Some("conv_1"));
        assert_eq!(params.before, None);

        assert!(query("limit=ten").list_params().is_err());
        assert!(query("order=sideways").list_params().is_err());
    }

    #[test]
    fn search_bounds_follow_query_aliases() {
        let search = query("q=abc&limit=50&scanLimit=999999").search_query().unwrap();
        assert_eq!(search.max_results, 50);
        assert_eq!(search.page_size, 50);
        assert_eq!(search.scan_limit, 50_000);

        let search = query("q=abc&maxResults=0&limit=500").search_query().unwrap();
        assert_eq!(search.max_results, 200);
        assert_eq!(search.page_size, 200);
    }

    #[test]
    fn legacy_mode_is_opt_in() {
        assert!(query("mode=legacy").legacy());
        assert!(!query("mode=v2").legacy());
    }
}

use serde::{Deserialize, Serialize};

/// Request body for `POST /search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    pub q: &'a str,
    /// Number of organic results to ask for.
    pub num: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// Absent when Google found nothing.
    #[serde(default)]
    pub organic: Vec<SearchResult>,
}

/// One organic hit. Fields Serper leaves out come back as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_empty() {
        let resp: SearchResponse = serde_json::from_str(
            r#"{"organic":[{"title":"T","link":"https://a.test","position":1}],"searchParameters":{"q":"x"}}"#,
        )
        .unwrap();
        assert_eq!(resp.organic.len(), 1);
        assert_eq!(resp.organic[0].snippet, "");
        assert_eq!(resp.organic[0].link, "https://a.test");
    }

    #[test]
    fn missing_organic_means_no_results() {
        let resp: SearchResponse = serde_json::from_str(r#"{"knowledgeGraph":{}}"#).unwrap();
        assert!(resp.organic.is_empty());
    }
}

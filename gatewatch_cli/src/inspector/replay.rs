//! Replay execution for the active draft

use super::draft::Inspector;
use crate::api::ApiClient;

/// Executes one replay round trip for the inspector's active draft
pub struct ReplayExecutor<'a> {
    api: &'a ApiClient,
}

impl<'a> ReplayExecutor<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Serialize the draft and send it to the replay endpoint, applying the
    /// outcome through the inspector so validation, the in-flight guard,
    /// and stale-response discarding all live in one place. Returns whether
    /// a send actually started; when it did not, the inspector's draft
    /// carries the validation error (if any).
    pub async fn execute(&self, inspector: &mut Inspector) -> bool {
        let Some(payload) = inspector.to_payload() else {
            return false;
        };
        let Some(ticket) = inspector.begin_send() else {
            return false;
        };

        let outcome = self
            .api
            .replay(&payload)
            .await
            .map_err(|e| e.to_string());
        inspector.finish_send(ticket, outcome);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatewatch_common::CapturedRequest;

    #[tokio::test]
    async fn test_empty_url_never_reaches_the_network() {
        // an unroutable backend: any actual send would error loudly
        let api = ApiClient::new("http://127.0.0.1:1");
        let executor = ReplayExecutor::new(&api);

        let request: CapturedRequest =
            serde_json::from_str(r#"{"id":1,"method":"GET","url":""}"#).unwrap();
        let mut inspector = Inspector::new();
        inspector.select(Some(&request));

        assert!(!executor.execute(&mut inspector).await);
        let draft = inspector.draft().unwrap();
        assert_eq!(draft.error.as_deref(), Some("URL is required"));
        assert!(!draft.sending);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_draft_error() {
        let api = ApiClient::new("http://127.0.0.1:1");
        let executor = ReplayExecutor::new(&api);

        let request: CapturedRequest =
            serde_json::from_str(r#"{"id":1,"method":"GET","url":"https://example.com/"}"#)
                .unwrap();
        let mut inspector = Inspector::new();
        inspector.select(Some(&request));

        assert!(executor.execute(&mut inspector).await);
        let draft = inspector.draft().unwrap();
        assert!(draft.response.is_none());
        assert!(draft.error.is_some());
        assert!(!draft.sending);
    }
}

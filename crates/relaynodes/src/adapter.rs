use async_trait::async_trait;
use relaycore::{ComponentAdapter, ComponentDescriptor, ComponentOutcome, InvocationContext};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Component adapter reached over HTTP
///
/// `GET {base}/components/{name}` describes a component and
/// `POST {base}/components/{name}/actions/{action}` runs one of its actions.
pub struct RemoteComponentAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteComponentAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn component_url(&self, name: &str) -> String {
        format!("{}/components/{}", self.base_url, name)
    }
}

#[async_trait]
impl ComponentAdapter for RemoteComponentAdapter {
    fn is_initialized(&self) -> bool {
        !self.base_url.is_empty()
    }

    async fn get_component_details(&self, name: &str) -> Option<ComponentDescriptor> {
        let url = self.component_url(name);
        tracing::debug!("GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Component lookup for {} failed: {}", name, e);
                return None;
            }
        };

        if response.status() == StatusCode::NOT_FOUND {
            return None;
        }
        if !response.status().is_success() {
            tracing::warn!("Component lookup for {} returned {}", name, response.status());
            return None;
        }

        match response.json::<ComponentDescriptor>().await {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                tracing::warn!("Invalid descriptor for component {}: {}", name, e);
                None
            }
        }
    }

    async fn execute_component(
        &self,
        component: &str,
        action: &str,
        params: Value,
        invocation: InvocationContext,
    ) -> ComponentOutcome {
        let url = format!("{}/actions/{}", self.component_url(component), action);
        tracing::debug!("POST {}", url);

        let body = json!({
            "parameters": params,
            "userId": invocation.user_id,
            "executionId": invocation.execution_id,
        });

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return ComponentOutcome::failed(format!("Adapter request failed: {}", e)),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return ComponentOutcome::failed(format!("Failed to read adapter response: {}", e))
            }
        };

        match serde_json::from_str::<ComponentOutcome>(&text) {
            Ok(outcome) => outcome,
            Err(_) if !status.is_success() => {
                ComponentOutcome::failed(format!("Adapter returned status {}", status.as_u16()))
            }
            Err(e) => ComponentOutcome::failed(format!("Invalid adapter response: {}", e)),
        }
    }
}

/// Adapter used when none is configured; every action node fails cleanly
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAdapter;

#[async_trait]
impl ComponentAdapter for DisabledAdapter {
    fn is_initialized(&self) -> bool {
        false
    }

    async fn get_component_details(&self, _name: &str) -> Option<ComponentDescriptor> {
        None
    }

    async fn execute_component(
        &self,
        _component: &str,
        _action: &str,
        _params: Value,
        _invocation: InvocationContext,
    ) -> ComponentOutcome {
        ComponentOutcome::failed("No component adapter configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let adapter = RemoteComponentAdapter::new("http://localhost:9000/");
        assert_eq!(adapter.base_url(), "http://localhost:9000");
        assert_eq!(
            adapter.component_url("gmail"),
            "http://localhost:9000/components/gmail"
        );
        assert!(adapter.is_initialized());
        assert!(!DisabledAdapter.is_initialized());
    }
}

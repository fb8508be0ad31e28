use async_trait::async_trait;
use chatpulse_core::{
    ActivityGraph, ChatPulseError, GraphLink, GraphNode, GraphResource, GraphStore, Result,
    StoreConfig,
};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Graph resource representation returned by `GET /twiglets/{name}`.
#[derive(Debug, Deserialize)]
struct ResourceResponse {
    url: String,
    #[serde(rename = "_rev")]
    rev: String,
    events_url: String,
}

impl From<ResourceResponse> for GraphResource {
    fn from(r: ResourceResponse) -> Self {
        GraphResource {
            revision: r.rev,
            url: r.url,
            events_url: r.events_url,
        }
    }
}

#[derive(Serialize)]
struct PatchRequest<'a> {
    #[serde(rename = "_rev")]
    rev: &'a str,
    #[serde(rename = "commitMessage")]
    commit_message: &'a str,
    nodes: &'a [GraphNode],
    links: &'a [GraphLink],
}

#[derive(Serialize)]
struct EventRequest<'a> {
    name: &'a str,
}

/// REST client for the graph store. Holds the session cookie set by [`GraphStore::login`].
pub struct GraphStoreClient {
    client: Client,
    api_base: String,
    graph_name: String,
    email: String,
    password: SecretString,
}

impl GraphStoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.email.trim().is_empty() {
            return Err(ChatPulseError::Config("store.email is not set".to_string()));
        }
        let password = config
            .password
            .clone()
            .ok_or_else(|| ChatPulseError::Config("store.password is not set".to_string()))?;
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ChatPulseError::Network(format!("building graph store client: {}", e)))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            graph_name: config.graph_name.clone(),
            email: config.email.clone(),
            password,
        })
    }

    fn resource_url(&self) -> String {
        format!("{}/twiglets/{}", self.api_base, self.graph_name)
    }
}

fn request_error(context: &str, e: reqwest::Error) -> ChatPulseError {
    if e.is_timeout() {
        ChatPulseError::Timeout(format!("{}: {}", context, e))
    } else {
        ChatPulseError::Network(format!("{}: {}", context, e))
    }
}

pub(crate) fn status_error(context: &str, status: StatusCode, body: &str) -> ChatPulseError {
    let detail = format!("{} returned HTTP {}: {}", context, status, body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatPulseError::Auth(detail),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            ChatPulseError::StaleRevision(detail)
        }
        _ => ChatPulseError::External(detail),
    }
}

async fn ensure_success(context: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(context, status, &body))
}

#[async_trait]
impl GraphStore for GraphStoreClient {
    async fn login(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/login", self.api_base))
            .json(&LoginRequest {
                email: &self.email,
                password: self.password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| request_error("login", e))?;
        ensure_success("login", response).await?;
        debug!("Logged in to graph store as {}", self.email);
        Ok(())
    }

    async fn fetch_resource(&self) -> Result<GraphResource> {
        let response = self
            .client
            .get(self.resource_url())
            .send()
            .await
            .map_err(|e| request_error("fetch graph", e))?;
        let response = ensure_success("fetch graph", response).await?;
        let resource: ResourceResponse = response
            .json()
            .await
            .map_err(|e| ChatPulseError::Parse(format!("graph resource: {}", e)))?;
        Ok(resource.into())
    }

    async fn submit(&self, resource: &GraphResource, graph: &ActivityGraph) -> Result<()> {
        let response = self
            .client
            .patch(&resource.url)
            .json(&PatchRequest {
                rev: &resource.revision,
                commit_message: &graph.commit_message,
                nodes: &graph.nodes,
                links: &graph.links,
            })
            .send()
            .await
            .map_err(|e| request_error("patch graph", e))?;
        ensure_success("patch graph", response).await?;
        info!(
            "Patched {} ({} nodes, {} links) over revision {}",
            self.graph_name,
            graph.nodes.len(),
            graph.links.len(),
            resource.revision
        );
        Ok(())
    }

    async fn create_event(&self, resource: &GraphResource, name: &str) -> Result<()> {
        let response = self
            .client
            .post(&resource.events_url)
            .json(&EventRequest { name })
            .send()
            .await
            .map_err(|e| request_error("create event", e))?;
        ensure_success("create event", response).await?;
        Ok(())
    }
}

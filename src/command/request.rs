use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::graph::{
    ApiVersion, GraphClient, GraphRequest, GraphTransport, HttpMethod, Projection,
};

/// Arguments of `entra-lab request`
#[derive(Debug, Default)]
pub struct RequestArgs {
    pub method: String,
    pub uri: String,
    pub body: Option<String>,
    pub api_version: Option<String>,
    pub all: bool,
    pub page_size: Option<i64>,
    pub expand: Option<String>,
    /// `Name: value` pairs
    pub headers: Vec<String>,
    pub content_type: Option<String>,
}

impl RequestArgs {
    /// Turn command-line arguments into a request on `client`'s defaults.
    pub fn into_request<T: GraphTransport>(self, client: &GraphClient<T>) -> Result<GraphRequest> {
        let method: HttpMethod = self.method.parse()?;
        let mut request = client
            .build(method, self.uri)
            .fetch_all(self.all)
            .operation("cli_request");

        if let Some(body) = self.body {
            let body: Value =
                serde_json::from_str(&body).context("--body must be a JSON document")?;
            request = request.body(body);
        }
        if let Some(version) = self.api_version {
            request = request.api_version(version.parse::<ApiVersion>()?);
        }
        if let Some(page_size) = self.page_size {
            request = request.page_size(page_size);
        }
        if let Some(field) = self.expand {
            request = request.expand(Projection::field(field));
        }
        for header in self.headers {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("--header must look like 'Name: value', got '{}'", header))?;
            let name = name.trim();
            if name.is_empty() {
                bail!("--header '{}' has no name", header);
            }
            request = request.header(name, value.trim());
        }
        if let Some(content_type) = self.content_type {
            request = request.content_type(content_type);
        }
        Ok(request)
    }
}

pub async fn run_request<T: GraphTransport>(client: &GraphClient<T>, args: RequestArgs) -> Result<()> {
    let request = args.into_request(client)?;
    let response = client.request(request).await?;

    let output = serde_json::to_string_pretty(&response.into_value())
        .context("Failed to format response")?;
    println!("{}", output);
    Ok(())
}

//! Tests for the Graph request wrapper.

#[cfg(test)]
mod tests {
    use crate::config::LabConfig;
    use crate::graph::mock::MockTransport;
    use crate::graph::{
        ApiVersion, GraphClient, GraphError, GraphRequest, GraphResponse, GraphTransport,
        HttpMethod, Projection, ReqwestTransport, RetryPolicy, TransportCall, TransportError,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tracing_test::traced_test;

    const HOST: &str = "graph.microsoft.com";

    /// Answers by URI from a fixed table.
    struct StaticTransport {
        routes: HashMap<String, Value>,
    }

    impl GraphTransport for StaticTransport {
        async fn send(&self, call: TransportCall) -> Result<Value, TransportError> {
            self.routes
                .get(&call.uri)
                .cloned()
                .ok_or_else(|| TransportError::Status {
                    status: 404,
                    body: String::new(),
                })
        }
    }

    fn page(values: Value, next: Option<&str>) -> Result<Value, TransportError> {
        let mut body = json!({
            "@odata.context": "https://graph.microsoft.com/beta/$metadata#users",
            "value": values,
        });
        if let Some(next) = next {
            body["@odata.nextLink"] = json!(next);
        }
        Ok(body)
    }

    fn client(transport: MockTransport) -> GraphClient<MockTransport> {
        GraphClient::with_host(transport, HOST)
    }

    #[tokio::test]
    async fn test_non_get_ignores_fetch_all() {
        for method in [
            HttpMethod::Post,
            HttpMethod::Patch,
            HttpMethod::Put,
            HttpMethod::Delete,
        ] {
            let raw = json!({
                "id": "1",
                "value": ["not", "unwrapped"],
                "@odata.nextLink": "https://graph.microsoft.com/beta/groups?$skiptoken=2"
            });
            let graph = client(MockTransport::with_responses(vec![Ok(raw.clone())]));

            let request = GraphRequest::new(method, "groups")
                .body(json!({"displayName": "Lab"}))
                .fetch_all(true);
            let response = graph.request(request).await.unwrap();

            let calls = graph.transport().calls();
            assert_eq!(calls.len(), 1, "{} should make exactly one call", method);
            assert_eq!(calls[0].uri, "https://graph.microsoft.com/beta/groups");
            assert_eq!(calls[0].method, method);
            assert_eq!(calls[0].body, Some(json!({"displayName": "Lab"})));
            assert_eq!(response, GraphResponse::Single(raw));
        }
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_pages_in_order() {
        let graph = client(MockTransport::with_responses(vec![
            page(json!([{"id": "1"}, {"id": "2"}]), Some("https://graph.microsoft.com/beta/users?$skiptoken=a")),
            page(json!([{"id": "3"}]), Some("https://graph.microsoft.com/beta/users?$skiptoken=b")),
            page(json!([{"id": "4"}, {"id": "5"}]), Some("https://graph.microsoft.com/beta/users?$skiptoken=c")),
            page(json!([]), None),
        ]));

        let response = graph
            .request(GraphRequest::get("users").fetch_all(true))
            .await
            .unwrap();

        assert_eq!(
            response,
            GraphResponse::Collection(vec![
                json!({"id": "1"}),
                json!({"id": "2"}),
                json!({"id": "3"}),
                json!({"id": "4"}),
                json!({"id": "5"}),
            ])
        );

        let uris: Vec<String> = graph.transport().calls().into_iter().map(|c| c.uri).collect();
        assert_eq!(
            uris,
            vec![
                "https://graph.microsoft.com/beta/users?$top=100",
                "https://graph.microsoft.com/beta/users?$skiptoken=a",
                "https://graph.microsoft.com/beta/users?$skiptoken=b",
                "https://graph.microsoft.com/beta/users?$skiptoken=c",
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_all_without_page_size() {
        let graph = client(MockTransport::with_responses(vec![page(json!([1]), None)]));

        let response = graph
            .request(
                GraphRequest::get("users?$filter=accountEnabled eq true")
                    .fetch_all(true)
                    .page_size(0),
            )
            .await
            .unwrap();

        assert_eq!(response, GraphResponse::Collection(vec![json!(1)]));
        assert_eq!(
            graph.transport().calls()[0].uri,
            "https://graph.microsoft.com/beta/users?$filter=accountEnabled eq true"
        );
    }

    #[tokio::test]
    async fn test_fetch_all_uses_projection_per_page() {
        let graph = client(MockTransport::with_responses(vec![
            Ok(json!({"members": [{"id": "a"}], "value": ["ignored"], "@odata.nextLink": "https://graph.microsoft.com/beta/next"})),
            Ok(json!({"members": [], "value": [{"id": "b"}]})),
        ]));

        let response = graph
            .request(
                GraphRequest::get("groups/g1")
                    .expand(Projection::field("members"))
                    .fetch_all(true),
            )
            .await
            .unwrap();

        // Second page has an empty projection, so its `value` is used
        assert_eq!(
            response.into_items(),
            vec![json!({"id": "a"}), json!({"id": "b"})]
        );
    }

    #[tokio::test]
    async fn test_single_get_unwraps_value() {
        let graph = client(MockTransport::with_responses(vec![page(
            json!([{"id": "1"}]),
            Some("https://graph.microsoft.com/beta/users?$skiptoken=x"),
        )]));

        let response = graph.request(GraphRequest::get("users")).await.unwrap();

        assert_eq!(response, GraphResponse::Single(json!([{"id": "1"}])));
        // Without fetch_all the continuation link is not followed
        assert_eq!(graph.transport().calls().len(), 1);
        assert_eq!(
            graph.transport().calls()[0].uri,
            "https://graph.microsoft.com/beta/users"
        );
    }

    #[tokio::test]
    async fn test_expand_projection_overrides_value() {
        let body = json!({
            "id": "g1",
            "value": ["envelope"],
            "members": [{"id": "u1"}, {"id": "u2"}]
        });
        let graph = client(MockTransport::with_responses(vec![Ok(body)]));

        let response = graph
            .request(GraphRequest::get("groups/g1?$expand=members").expand(Projection::field("members")))
            .await
            .unwrap();

        assert_eq!(
            response,
            GraphResponse::Single(json!([{"id": "u1"}, {"id": "u2"}]))
        );
    }

    #[tokio::test]
    async fn test_empty_projection_falls_back_to_value_then_raw() {
        let graph = client(MockTransport::with_responses(vec![
            Ok(json!({"members": [], "value": [1]})),
            Ok(json!({"id": "g1"})),
        ]));

        let first = graph
            .request(GraphRequest::get("groups").expand(Projection::field("members")))
            .await
            .unwrap();
        assert_eq!(first, GraphResponse::Single(json!([1])));

        let second = graph
            .request(GraphRequest::get("groups/g1").expand(Projection::field("members")))
            .await
            .unwrap();
        assert_eq!(second, GraphResponse::Single(json!({"id": "g1"})));
    }

    #[tokio::test]
    async fn test_get_drops_body() {
        let graph = client(MockTransport::with_responses(vec![Ok(json!({"id": "1"}))]));

        graph
            .request(GraphRequest::get("me").body(json!({"unexpected": true})))
            .await
            .unwrap();

        assert_eq!(graph.transport().calls()[0].body, None);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_absolute_uri_used_unmodified_and_warned_once() {
        let graph = client(MockTransport::with_responses(vec![Ok(json!({"id": "me"}))]));
        let absolute = "https://graph.microsoft.com/v1.0/me?$select=id";

        let response = graph.request(GraphRequest::get(absolute)).await.unwrap();

        assert_eq!(response, GraphResponse::Single(json!({"id": "me"})));
        assert_eq!(graph.transport().calls()[0].uri, absolute);
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("Absolute URI passed"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected exactly one warning, saw {}", n)),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_relative_uri_is_not_warned() {
        let graph = client(MockTransport::with_responses(vec![page(json!([]), None)]));
        graph
            .request(GraphRequest::get("/users").fetch_all(true))
            .await
            .unwrap();
        assert!(!logs_contain("Absolute URI passed"));
    }

    #[test]
    fn test_resolve_uri_strips_leading_slash() {
        let graph = client(MockTransport::default());

        assert_eq!(
            graph.resolve_uri("/users", ApiVersion::Stable).unwrap(),
            "https://graph.microsoft.com/v1.0/users"
        );
        assert_eq!(
            graph.resolve_uri("users", ApiVersion::Stable).unwrap(),
            "https://graph.microsoft.com/v1.0/users"
        );
        assert_eq!(
            graph
                .resolve_uri("/networkAccess/forwardingProfiles", ApiVersion::Preview)
                .unwrap(),
            "https://graph.microsoft.com/beta/networkAccess/forwardingProfiles"
        );
    }

    #[tokio::test]
    async fn test_empty_uri_rejected_before_any_call() {
        let graph = client(MockTransport::default());

        let err = graph.request(GraphRequest::get("/")).await.unwrap_err();

        assert!(matches!(err, GraphError::InvalidUri { .. }));
        assert!(graph.transport().calls().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failure_on_second_page_discards_progress() {
        let graph = client(MockTransport::with_responses(vec![
            page(json!([{"id": "1"}]), Some("https://graph.microsoft.com/beta/users?$skiptoken=a")),
            Err(TransportError::Status {
                status: 503,
                body: r#"{"error":{"code":"serviceNotAvailable","message":"try later"}}"#.to_string(),
            }),
            page(json!([{"id": "3"}]), None),
        ]));

        let err = graph
            .request(GraphRequest::get("users").fetch_all(true).operation("list_lab_users"))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            r#"Graph request failed with status 503: {"error":{"code":"serviceNotAvailable","message":"try later"}}"#
        );
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.detail().and_then(|d| d.code()), Some("serviceNotAvailable"));
        assert!(matches!(
            &err,
            GraphError::Remote {
                source: TransportError::Status { status: 503, .. },
                ..
            }
        ));
        // The third page is never requested
        assert_eq!(graph.transport().calls().len(), 2);
        assert!(logs_contain("serviceNotAvailable"));
        assert!(logs_contain("list_lab_users"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_plain_text_error_is_logged_as_text() {
        let graph = client(MockTransport::with_responses(vec![Err(TransportError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        })]));

        let err = graph.post("groups", json!({})).await.unwrap_err();

        assert_eq!(err.status(), Some(502));
        assert!(logs_contain("response text: Bad Gateway"));
    }

    #[tokio::test]
    async fn test_identical_gets_are_idempotent() {
        let mut routes = HashMap::new();
        routes.insert(
            "https://graph.microsoft.com/beta/groups?$top=2".to_string(),
            json!({"value": [{"id": "a"}, {"id": "b"}], "@odata.nextLink": "https://graph.microsoft.com/beta/groups?$skiptoken=1"}),
        );
        routes.insert(
            "https://graph.microsoft.com/beta/groups?$skiptoken=1".to_string(),
            json!({"value": [{"id": "c"}]}),
        );
        let graph = GraphClient::with_host(StaticTransport { routes }, HOST);

        let request = GraphRequest::get("groups").fetch_all(true).page_size(2);
        let first = graph.request(request.clone()).await.unwrap();
        let second = graph.request(request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.into_items().len(), 3);
    }

    #[tokio::test]
    async fn test_client_defaults_come_from_config() {
        let config = LabConfig {
            api_version: ApiVersion::Stable,
            page_size: 25,
            ..LabConfig::default()
        };
        let graph = GraphClient::new(
            MockTransport::with_responses(vec![page(json!([{"id": "u"}]), None)]),
            &config,
        );

        let users = graph.get_all("users").await.unwrap();

        assert_eq!(users, vec![json!({"id": "u"})]);
        assert_eq!(
            graph.transport().calls()[0].uri,
            "https://graph.microsoft.com/v1.0/users?$top=25"
        );
    }

    #[tokio::test]
    async fn test_headers_and_content_type_forwarded() {
        let graph = client(MockTransport::with_responses(vec![Ok(Value::Null)]));

        graph
            .request(
                GraphRequest::new(HttpMethod::Patch, "groups/g1")
                    .header("If-Match", "*")
                    .content_type("application/json; charset=utf-8")
                    .body(json!({"description": "lab"})),
            )
            .await
            .unwrap();

        let call = &graph.transport().calls()[0];
        assert_eq!(call.headers.get("If-Match").map(String::as_str), Some("*"));
        assert_eq!(call.content_type, "application/json; charset=utf-8");
    }

    #[tokio::test]
    async fn test_end_to_end_paging_over_http() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        let next = format!("{}/beta/users?$skiptoken=p2", mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/beta/users"))
            .and(query_param("$top", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "1"}, {"id": "2"}],
                "@odata.nextLink": next,
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/beta/users"))
            .and(query_param("$skiptoken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "3"}]
            })))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new("test-token")
            .unwrap()
            .with_retry_policy(RetryPolicy::none());
        let graph = GraphClient::with_host(transport, HOST);

        let response = graph
            .request(
                GraphRequest::get(format!("{}/beta/users", mock_server.uri()))
                    .fetch_all(true)
                    .page_size(2),
            )
            .await
            .unwrap();

        let ids: Vec<&str> = match &response {
            GraphResponse::Collection(items) => {
                items.iter().filter_map(|u| u["id"].as_str()).collect()
            }
            other => panic!("expected a collection, got {:?}", other),
        };
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}

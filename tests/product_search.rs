//! Product search tool against an in-process backend.
//!
//! The mock backend records every request and counts calls so the tests
//! can check both the rendered text and what reached the backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use product_search_agent::auth::StaticTokenSource;
use product_search_agent::config::SearchConfig;
use product_search_agent::error::SearchError;
use product_search_agent::search::{
    DiscoveryEngineClient, Document, SearchBackend, SearchRequest, SearchResponse, SearchResult,
};
use product_search_agent::tools::builtins::product_search::{
    self, ProductSearch, EMPTY_QUERY_MESSAGE, ERROR_PREFIX, NO_RESULTS_MESSAGE,
};
use product_search_agent::tools::ToolRegistry;
use serde_json::{json, Value};

const SERVING_CONFIG: &str =
    "projects/p/locations/global/dataStores/d/servingConfigs/default_config";

enum Reply {
    Docs(Vec<Value>),
    Fail(fn() -> SearchError),
}

struct MockBackend {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MockBackend {
    fn with_docs(docs: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Docs(docs),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: fn() -> SearchError) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Fail(err),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> SearchRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Reply::Fail(make) => Err(make()),
            Reply::Docs(docs) => Ok(SearchResponse {
                results: docs
                    .iter()
                    .enumerate()
                    .map(|(i, data)| SearchResult {
                        id: i.to_string(),
                        document: Some(Document {
                            id: i.to_string(),
                            name: format!("{SERVING_CONFIG}/documents/{i}"),
                            struct_data: Some(data.clone()),
                        }),
                    })
                    .collect(),
                total_size: Some(docs.len() as i64),
                next_page_token: None,
            }),
        }
    }
}

fn search_over(backend: Arc<MockBackend>) -> ProductSearch {
    ProductSearch::new(backend, SERVING_CONFIG)
}

fn product(i: usize) -> Value {
    json!({ "title_y": format!("Product {i}"), "main_image_url": format!("https://x/{i}.jpg") })
}

#[tokio::test]
async fn example_scenario_renders_exactly() {
    let backend = MockBackend::with_docs(vec![
        json!({ "title_y": "SoundPods X1", "main_image_url": "https://x/1.jpg" }),
        json!({ "main_image_url": "https://x/2.jpg" }),
    ]);
    let out = search_over(backend.clone())
        .retrieve_product_details_from_search("wireless earbuds", 10)
        .await;

    assert_eq!(
        out,
        "Found the following product details:\n\n\
         Title: SoundPods X1\nImage URL: https://x/1.jpg\n\
         \n---\n\
         Title: N/A\nImage URL: https://x/2.jpg\n"
    );
    assert_eq!(backend.call_count(), 1);
    let req = backend.last_request();
    assert_eq!(req.query, "wireless earbuds");
    assert_eq!(req.serving_config, SERVING_CONFIG);
}

#[tokio::test]
async fn empty_query_never_reaches_backend() {
    let backend = MockBackend::with_docs(vec![product(1)]);
    let search = search_over(backend.clone());

    assert_eq!(
        search.retrieve_product_details_from_search("", 10).await,
        EMPTY_QUERY_MESSAGE
    );

    // Tool-call path: missing and non-string queries take the same route.
    for args in [json!({}), json!({ "query": null }), json!({ "query": 42 })] {
        let out = product_search::call(&search, args).await.unwrap();
        assert_eq!(out, json!({ "result": EMPTY_QUERY_MESSAGE }));
    }
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn n_documents_render_n_blocks() {
    for n in 1..=4 {
        let backend = MockBackend::with_docs((0..n).map(product).collect());
        let out = search_over(backend)
            .retrieve_product_details_from_search("lamps", 10)
            .await;
        assert!(out.starts_with("Found the following product details:\n\n"));
        assert_eq!(out.matches("Title:").count(), n);
        assert_eq!(out.matches("Image URL:").count(), n);
        assert_eq!(out.matches("---").count(), n - 1);
    }
}

#[tokio::test]
async fn missing_fields_render_na() {
    let backend = MockBackend::with_docs(vec![
        json!({ "title_y": "Only Title" }),
        json!({ "title_y": null, "main_image_url": "https://x/a.jpg" }),
        json!({ "other": "field" }),
    ]);
    let out = search_over(backend)
        .retrieve_product_details_from_search("q", 10)
        .await;
    assert!(out.contains("Title: Only Title\nImage URL: N/A\n"));
    assert!(out.contains("Title: N/A\nImage URL: https://x/a.jpg\n"));
    assert!(out.contains("Title: N/A\nImage URL: N/A\n"));
}

#[tokio::test]
async fn document_without_payload_renders_na() {
    struct Bare;

    #[async_trait]
    impl SearchBackend for Bare {
        fn backend_name(&self) -> &'static str {
            "bare"
        }

        async fn search(&self, _r: &SearchRequest) -> Result<SearchResponse, SearchError> {
            Ok(SearchResponse {
                results: vec![SearchResult {
                    id: "0".into(),
                    document: Some(Document::default()),
                }],
                ..Default::default()
            })
        }
    }

    let out = ProductSearch::new(Arc::new(Bare), SERVING_CONFIG)
        .retrieve_product_details_from_search("q", 10)
        .await;
    assert!(out.ends_with("Title: N/A\nImage URL: N/A\n"));
}

#[tokio::test]
async fn zero_documents_is_no_results_message() {
    let backend = MockBackend::with_docs(vec![]);
    let out = search_over(backend.clone())
        .retrieve_product_details_from_search("nothing matches", 10)
        .await;
    assert_eq!(out, NO_RESULTS_MESSAGE);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn backend_errors_become_prefixed_text() {
    let cases: [fn() -> SearchError; 3] = [
        || SearchError::Auth("gcloud not logged in".into()),
        || SearchError::Rejected {
            status: 403,
            message: "Permission denied".into(),
        },
        || SearchError::Malformed("expected value".into()),
    ];
    for make in cases {
        let backend = MockBackend::failing(make);
        let out = search_over(backend.clone())
            .retrieve_product_details_from_search("earbuds", 10)
            .await;
        assert_eq!(out, format!("{ERROR_PREFIX}{}", make()));
        assert_eq!(backend.call_count(), 1, "no retry on failure");
    }
}

#[tokio::test]
async fn unreachable_endpoint_becomes_prefixed_text() {
    // nothing listens on port 1, so the connection is refused
    let cfg = SearchConfig::new("p", "global", "d").with_endpoint("http://127.0.0.1:1");
    let client = DiscoveryEngineClient::new(&cfg, Box::new(StaticTokenSource::new("t"))).unwrap();
    let out = ProductSearch::new(Arc::new(client), cfg.serving_config.clone())
        .retrieve_product_details_from_search("earbuds", 10)
        .await;
    assert!(out.starts_with(ERROR_PREFIX), "got: {out}");
    assert!(out[ERROR_PREFIX.len()..].starts_with("transport error: "), "got: {out}");
}

#[tokio::test]
async fn max_results_is_forwarded_and_caps_output() {
    let backend = MockBackend::with_docs((0..8).map(product).collect());
    let out = search_over(backend.clone())
        .retrieve_product_details_from_search("lamps", 3)
        .await;
    assert_eq!(backend.last_request().page_size, 3);
    assert_eq!(out.matches("Title:").count(), 3);
    assert!(out.contains("Product 2"));
    assert!(!out.contains("Product 3"));
}

#[tokio::test]
async fn non_positive_max_results_forwarded_unchanged() {
    let backend = MockBackend::with_docs((0..2).map(product).collect());
    let search = search_over(backend.clone());

    let out = search.retrieve_product_details_from_search("lamps", 0).await;
    assert_eq!(backend.last_request().page_size, 0);
    assert_eq!(out.matches("Title:").count(), 2);

    search.retrieve_product_details_from_search("lamps", -1).await;
    assert_eq!(backend.last_request().page_size, -1);
}

#[tokio::test]
async fn registered_tool_dispatches_through_registry() {
    let backend = MockBackend::with_docs(vec![product(7)]);
    let mut registry = ToolRegistry::new();
    assert!(product_search::register(&mut registry, search_over(backend.clone())));
    assert!(!product_search::register(&mut registry, search_over(backend.clone())));
    assert_eq!(registry.len(), 1);

    let out = registry
        .call_tool(
            "retrieve_product_details_from_search",
            json!({ "query": "desk lamp", "max_results": 5 }),
        )
        .await
        .unwrap();
    let text = out["result"].as_str().unwrap();
    assert!(text.contains("Title: Product 7"));
    assert_eq!(backend.last_request().page_size, 5);

    let decls = registry.function_declarations();
    assert_eq!(decls[0]["name"], "retrieve_product_details_from_search");
    assert_eq!(decls[0]["parameters"]["required"], json!(["query"]));
}

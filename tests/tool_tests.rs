//! Tests for the tool system.

use serde::Deserialize;
use serde_json::json;

use threadwise::error::EngineError;
use threadwise::tools::validation::{validate_arguments, validate_call};
use threadwise::tools::{Tool, ToolArguments, ToolParameters, ToolRegistry, ToolSpec};
use threadwise::types::ToolCall;

#[test]
fn parameter_builder_constructs_schema() {
    let params = ToolParameters::object()
        .string("query", "Search query", true)
        .integer("limit", "Max results", false)
        .boolean("verbose", "Enable verbose output", false)
        .build();

    let schema = &params.schema;
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["query"]["type"], "string");
    assert_eq!(schema["properties"]["limit"]["type"], "integer");
    assert_eq!(schema["required"], json!(["query"]));
}

#[test]
fn arguments_accessors() {
    let args = ToolArguments::new(json!({ "query": "website", "limit": 3 }));
    assert_eq!(args.get_str("query").unwrap(), "website");
    assert_eq!(args.get_u64_opt("limit"), Some(3));
    assert_eq!(args.get_str_opt("missing"), None);
    assert!(matches!(
        args.get_str("limit"),
        Err(EngineError::InvalidInput(_))
    ));
}

#[test]
fn arguments_deserialize_into_typed_struct() {
    #[derive(Deserialize)]
    struct Query {
        query: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    let parsed: Query = ToolArguments::new(json!({ "query": "courses" }))
        .deserialize()
        .unwrap();
    assert_eq!(parsed.query, "courses");
    assert_eq!(parsed.limit, None);
}

#[tokio::test]
async fn closure_tool_invokes_handler() {
    let tool = ToolSpec::new(
        "shout",
        "Uppercase the input",
        ToolParameters::object().string("text", "Text", true).build(),
        |args| async move { Ok(args.get_str("text")?.to_uppercase()) },
    );

    let out = tool
        .invoke(&ToolArguments::new(json!({ "text": "hello" })))
        .await
        .unwrap();
    assert_eq!(out, "HELLO");

    let definition = tool.definition();
    assert_eq!(definition.name, "shout");
    assert_eq!(definition.description, "Uppercase the input");
    assert_eq!(definition.parameters["required"], json!(["text"]));
}

#[test]
fn registry_lookup_and_duplicates() {
    let make = |name: &str| {
        std::sync::Arc::new(ToolSpec::new(
            name,
            "noop",
            ToolParameters::empty(),
            |_| async { Ok(String::new()) },
        )) as std::sync::Arc<dyn Tool>
    };

    let mut registry = ToolRegistry::new();
    registry.register(make("a")).unwrap();
    registry.register(make("b")).unwrap();

    assert_eq!(registry.names(), vec!["a", "b"]);
    assert!(registry.get("a").is_some());
    assert!(registry.get("c").is_none());
    assert!(matches!(
        registry.register(make("a")),
        Err(EngineError::Configuration(_))
    ));
}

#[test]
fn schema_validation_reports_the_offending_field() {
    let schema = ToolParameters::object()
        .string("query", "Search query", true)
        .build()
        .schema;

    assert!(validate_arguments(&json!({ "query": "website" }), &schema).is_ok());

    let call = ToolCall::new("call-1", "retrieve_documents", json!({ "query": 7 }));
    let err = validate_call(&call, &schema).unwrap_err();
    assert!(matches!(
        err,
        EngineError::MalformedToolCall { ref tool_name, ref message }
            if tool_name == "retrieve_documents" && message.contains("query")
    ));
}

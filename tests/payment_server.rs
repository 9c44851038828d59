mod common;

use common::*;
use serde_json::{json, Value};
use std::sync::Arc;
use stripe_mcp_client::mcp::{CallToolResult, JsonRpcRequest, JsonRpcResponse};
use stripe_mcp_client::server::PaymentServer;
use stripe_mcp_client::{Result, StripeMcpClient, StripeMcpError};

fn request(id: u64, method: &str, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest::new(id, method, params)
}

fn server_for(
    connector: MockConnector,
) -> PaymentServer<impl Fn() -> Result<StripeMcpClient> + Send + Sync> {
    PaymentServer::new(move || Ok(client_with(connector.clone(), false)))
}

fn checkout_call(arguments: Value) -> JsonRpcRequest {
    request(
        7,
        "tools/call",
        Some(json!({"name": "create_checkout_link", "arguments": arguments})),
    )
}

fn tool_result(response: JsonRpcResponse) -> CallToolResult {
    assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
    serde_json::from_value(response.result.unwrap()).unwrap()
}

#[tokio::test]
async fn initialize_advertises_tools_capability() {
    let server = server_for(MockConnector::payment_link());

    let response = server
        .handle(request(1, "initialize", Some(json!({}))))
        .await
        .unwrap();
    let result = response.result.unwrap();

    assert_eq!(response.id, json!(1));
    assert_eq!(result["serverInfo"]["name"], "Payment Server");
    assert_eq!(result["capabilities"], json!({"tools": {}}));
}

#[tokio::test]
async fn notifications_get_no_response() {
    let server = server_for(MockConnector::payment_link());

    let response = server
        .handle(JsonRpcRequest::notification("notifications/initialized", None))
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn lists_the_checkout_tool() {
    let server = server_for(MockConnector::payment_link());

    let response = server.handle(request(2, "tools/list", None)).await.unwrap();
    let tools = &response.result.unwrap()["tools"];

    assert_eq!(tools.as_array().unwrap().len(), 1);
    assert_eq!(tools[0]["name"], "create_checkout_link");
    assert_eq!(
        tools[0]["inputSchema"]["required"],
        json!(["product_name", "price_amount"])
    );
}

#[tokio::test]
async fn checkout_call_creates_link_and_closes_client() {
    let connector = MockConnector::payment_link();
    let recorder = Arc::clone(&connector.recorder);
    let server = server_for(connector);

    let response = server
        .handle(checkout_call(json!({"product_name": "Rust mug", "price_amount": 1500})))
        .await
        .unwrap();
    let result = tool_result(response);

    assert!(!result.is_error);
    let summary: Value = serde_json::from_str(&result.joined_text()).unwrap();
    assert_eq!(
        summary,
        json!({
            "payment_link_url": "https://checkout.stripe.com/pay/cs_test_123456789",
            "payment_link_id": "plink_1234",
            "created": "2021-02-03T00:26:40.000Z"
        })
    );

    assert_eq!(recorder.connects(), 1);
    assert_eq!(recorder.closes(), 1);
    let (tool, payload) = recorder.calls().remove(0);
    assert_eq!(tool, "paymentLinks.create");
    assert_eq!(
        payload["line_items"][0]["price_data"],
        json!({
            "currency": "usd",
            "product_data": {"name": "Rust mug"},
            "unit_amount": 1500
        })
    );
}

#[tokio::test]
async fn failed_creation_becomes_error_result() {
    let mut connector = MockConnector::payment_link();
    connector.reply = Reply::RpcError("No such price".to_string());
    let recorder = Arc::clone(&connector.recorder);
    let server = server_for(connector);

    let response = server
        .handle(checkout_call(json!({"product_name": "Rust mug", "price_amount": 1500})))
        .await
        .unwrap();
    let result = tool_result(response);

    assert!(result.is_error);
    let text = result.joined_text();
    assert!(text.starts_with("Error creating payment link:"));
    assert!(text.contains("No such price"));
    assert_eq!(recorder.closes(), 1);
}

#[tokio::test]
async fn raw_fallback_becomes_error_result() {
    let server = server_for(MockConnector::replying(CallToolResult::text("not json")));

    let response = server
        .handle(checkout_call(json!({"product_name": "Rust mug", "price_amount": 1500})))
        .await
        .unwrap();

    assert!(tool_result(response).is_error);
}

#[tokio::test]
async fn client_configuration_error_becomes_error_result() {
    let server = PaymentServer::new(|| -> Result<StripeMcpClient> {
        Err(StripeMcpError::Config("Stripe API key is required".to_string()))
    });

    let response = server
        .handle(checkout_call(json!({"product_name": "Rust mug", "price_amount": 1500})))
        .await
        .unwrap();
    let result = tool_result(response);

    assert!(result.is_error);
    assert!(result.joined_text().contains("Stripe API key is required"));
}

#[tokio::test]
async fn rejects_unknown_tool_and_bad_arguments() {
    let server = server_for(MockConnector::payment_link());

    let unknown = server
        .handle(request(
            3,
            "tools/call",
            Some(json!({"name": "refunds.create", "arguments": {}})),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.error.unwrap().code, -32602);

    let bad_args = server
        .handle(checkout_call(json!({"product_name": "Rust mug"})))
        .await
        .unwrap();
    assert_eq!(bad_args.error.unwrap().code, -32602);
}

#[tokio::test]
async fn unknown_method_is_not_found() {
    let server = server_for(MockConnector::payment_link());

    let response = server
        .handle(request(4, "resources/list", None))
        .await
        .unwrap();
    assert_eq!(response.error.unwrap().code, -32601);
}

#[tokio::test]
async fn serve_answers_each_line() {
    let server = server_for(MockConnector::payment_link());
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        "\n",
        "this is not json\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n",
    );
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[1]["id"], Value::Null);
    assert_eq!(responses[1]["error"]["code"], -32700);
    assert_eq!(responses[2], json!({"jsonrpc": "2.0", "id": 2, "result": {}}));
}

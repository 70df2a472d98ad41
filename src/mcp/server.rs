use anyhow::Result;
use serde_json::json;
use tracing::{debug, info, warn};

use super::transport::StdioTransport;
use super::types::*;
use crate::config::ReaderConfig;
use crate::tools::pdf_reader_tool::{PdfReaderTool, PDF_READER_TOOL_DEFINITION, PDF_READER_TOOL_NAME};

pub struct McpServer {
    pdf_reader: PdfReaderTool,
    initialized: bool,
}

impl McpServer {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            pdf_reader: PdfReaderTool::new(config),
            initialized: false,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        let mut transport = StdioTransport::new();
        info!("MCP server started and listening on stdio");

        while let Some(message) = transport.read_message().await? {
            match message {
                McpMessage::Request(request) => {
                    let response = self.handle_request(request).await;
                    transport.write_response(response).await?;
                }
                McpMessage::Notification(notification) => {
                    self.handle_notification(notification);
                }
                McpMessage::Invalid(invalid) => {
                    if let Some(response) = Self::handle_invalid(invalid) {
                        transport.write_response(response).await?;
                    }
                }
            }
        }

        info!("Client disconnected");
        Ok(())
    }

    pub async fn handle_request(&mut self, request: McpRequest) -> McpResponse {
        let id = Self::ensure_valid_id(request.id);

        if !self.initialized && request.method == "tools/call" {
            debug!("tools/call received before notifications/initialized");
        }

        match request.method.as_str() {
            "initialize" => Self::handle_initialize(id, request.params),
            "tools/list" => Self::handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "ping" => McpResponse::success(id, json!({})),
            _ => McpResponse::failure(id, METHOD_NOT_FOUND, "Method not found"),
        }
    }

    fn handle_notification(&mut self, notification: McpNotification) {
        debug!("Received notification: {}", notification.method);

        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialization completed");
                self.initialized = true;
            }
            "notifications/cancelled" => {
                debug!("Request cancelled notification received");
            }
            _ => {
                warn!("Unknown notification method: {}", notification.method);
            }
        }
    }

    /// Malformed lines never stop the server. Requests with a readable id get
    /// an error reply; unparseable JSON gets a parse error with a null id.
    fn handle_invalid(invalid: InvalidMessage) -> Option<McpResponse> {
        warn!("Skipping malformed message ({}): {}", invalid.code, invalid.message);

        match invalid.id {
            Some(id) => Some(McpResponse::failure(id, invalid.code, invalid.message)),
            None if invalid.code == PARSE_ERROR => Some(McpResponse::failure(
                serde_json::Value::Null,
                PARSE_ERROR,
                invalid.message,
            )),
            None => None,
        }
    }

    fn ensure_valid_id(id: Option<serde_json::Value>) -> serde_json::Value {
        match id {
            Some(serde_json::Value::Null) | None => serde_json::Value::String("0".to_string()),
            Some(value) => value,
        }
    }

    fn handle_initialize(id: serde_json::Value, params: Option<serde_json::Value>) -> McpResponse {
        let Some(params) = params else {
            return McpResponse::failure(id, INVALID_PARAMS, "Missing params");
        };
        let init_params = match serde_json::from_value::<InitializeParams>(params) {
            Ok(init_params) => init_params,
            Err(e) => {
                return McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e))
            }
        };

        info!(
            "Initializing for client {} {} (protocol {})",
            init_params.client_info.name,
            init_params.client_info.version,
            init_params.protocol_version
        );

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: ServerInfo {
                name: "PDF Reader MCP".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some(
                    "A Model Context Protocol server that extracts text from PDF documents by URL"
                        .to_string(),
                ),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                logging: Some(json!({})),
            },
        };

        McpResponse::from_serializable(id, &result)
    }

    fn handle_list_tools(id: serde_json::Value) -> McpResponse {
        let result = ListToolsResult {
            tools: vec![PDF_READER_TOOL_DEFINITION.clone()],
        };
        McpResponse::from_serializable(id, &result)
    }

    async fn handle_call_tool(
        &self,
        id: serde_json::Value,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let Some(params) = params else {
            return McpResponse::failure(id, INVALID_PARAMS, "Missing params");
        };
        match serde_json::from_value::<CallToolParams>(params) {
            Ok(call_params) => {
                let result = self.execute_tool(call_params).await;
                McpResponse::from_serializable(id, &result)
            }
            Err(e) => McpResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        }
    }

    async fn execute_tool(&self, params: CallToolParams) -> CallToolResult {
        match params.name.as_str() {
            PDF_READER_TOOL_NAME => self.pdf_reader.execute(params.arguments).await,
            _ => CallToolResult::error(format!("Tool not found: {}", params.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: serde_json::Value, method: &str, params: Option<serde_json::Value>) -> McpRequest {
        McpRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: method.to_string(),
            params,
        }
    }

    fn server() -> McpServer {
        McpServer::new(ReaderConfig::default())
    }

    #[tokio::test]
    async fn lists_only_the_pdf_reader_tool() {
        let response = server().handle_request(request(json!(1), "tools/list", None)).await;
        let result = response.result.expect("result");
        let tools = result["tools"].as_array().expect("tools array");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "pdf_reader");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["url"]));
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let params = json!({
            "protocolVersion": "2024-11-05",
            "clientInfo": { "name": "test-client", "version": "0.0.1" }
        });
        let response = server()
            .handle_request(request(json!("init"), "initialize", Some(params)))
            .await;
        let result = response.result.expect("result");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "PDF Reader MCP");
        assert_eq!(response.id, json!("init"));
    }

    #[tokio::test]
    async fn initialize_without_params_is_invalid() {
        let response = server().handle_request(request(json!(2), "initialize", None)).await;
        assert_eq!(response.error.expect("error").code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let response = server().handle_request(request(json!(3), "resources/list", None)).await;
        let error = response.error.expect("error");
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found");
    }

    #[tokio::test]
    async fn ping_answers_with_empty_object() {
        let response = server().handle_request(request(json!(4), "ping", None)).await;
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn null_id_is_replaced() {
        let response = server()
            .handle_request(request(serde_json::Value::Null, "ping", None))
            .await;
        assert_eq!(response.id, json!("0"));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_tool_error() {
        let params = json!({ "name": "url-fetch", "arguments": { "url": "https://example.com" } });
        let response = server()
            .handle_request(request(json!(5), "tools/call", Some(params)))
            .await;
        let result = response.result.expect("result");
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Tool not found: url-fetch");
    }

    #[tokio::test]
    async fn pdf_reader_call_validates_url() {
        let params = json!({ "name": "pdf_reader", "arguments": { "url": "" } });
        let response = server()
            .handle_request(request(json!(6), "tools/call", Some(params)))
            .await;
        let result = response.result.expect("result");
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "Invalid parameters: url must not be empty"
        );
    }

    #[test]
    fn unparseable_line_gets_parse_error_reply() {
        let invalid = match crate::mcp::transport::parse_message("{\"jsonrpc\": \"2.0\", \"id\": ") {
            McpMessage::Invalid(invalid) => invalid,
            other => panic!("expected invalid message, got {:?}", other),
        };
        let response = McpServer::handle_invalid(invalid).expect("reply");
        assert_eq!(response.id, serde_json::Value::Null);
        assert_eq!(response.error.expect("error").code, PARSE_ERROR);
    }

    #[test]
    fn malformed_request_is_answered_with_its_id() {
        let response = McpServer::handle_invalid(InvalidMessage {
            id: Some(json!(9)),
            code: INVALID_REQUEST,
            message: "Invalid JSON-RPC request: missing field `method`".to_string(),
        })
        .expect("reply");
        assert_eq!(response.id, json!(9));
        assert_eq!(response.error.expect("error").code, INVALID_REQUEST);
    }

    #[test]
    fn malformed_notification_is_only_logged() {
        let reply = McpServer::handle_invalid(InvalidMessage {
            id: None,
            code: INVALID_REQUEST,
            message: "Invalid JSON-RPC notification".to_string(),
        });
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn server_keeps_answering_after_malformed_line() {
        let mut server = server();
        let invalid = match crate::mcp::transport::parse_message("not json at all") {
            McpMessage::Invalid(invalid) => invalid,
            other => panic!("expected invalid message, got {:?}", other),
        };
        assert!(McpServer::handle_invalid(invalid).is_some());

        let response = server.handle_request(request(json!(10), "ping", None)).await;
        assert_eq!(response.result, Some(json!({})));
    }

    #[test]
    fn initialized_notification_marks_server_ready() {
        let mut server = server();
        server.handle_notification(McpNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        });
        assert!(server.initialized);
    }
}

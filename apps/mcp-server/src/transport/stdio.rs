//! Standard I/O transport for MCP
//!
//! Accepts both `Content-Length` framed messages and newline-delimited
//! JSON, and answers each request in the framing it arrived in.
//!
//! IMPORTANT: All logging MUST go to stderr. stdout is reserved for
//! JSON-RPC protocol messages only.

use std::io::{BufRead, Read, Write};

use serde_json::Value;

use crate::error::ServerError;
use crate::mcp::protocol::*;
use crate::mcp::SigningMcpServer;

/// How a message was delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    ContentLength,
    Newline,
}

/// Run the MCP server using stdio transport
pub async fn run_stdio_server(server: SigningMcpServer) -> Result<(), ServerError> {
    tracing::info!("Starting stdio transport");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    let mut stdin_lock = stdin.lock();
    let mut stdout_lock = stdout.lock();

    loop {
        let (framing, body) = match read_frame(&mut stdin_lock) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("EOF reached, shutting down");
                break;
            }
            Err(ServerError::IoError(e)) => {
                tracing::error!("Failed to read from stdin: {}", e);
                break;
            }
            Err(e) => {
                tracing::error!("Failed to read message: {}", e);
                continue;
            }
        };

        let Some(response) = process_frame(&server, &body).await else {
            continue;
        };

        if let Err(e) = write_message(&mut stdout_lock, framing, &response) {
            tracing::error!("Failed to write response: {}", e);
        }
    }

    Ok(())
}

/// Decode one message body and run it through the server
async fn process_frame(server: &SigningMcpServer, body: &[u8]) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Unparseable message: {}", e);
            return Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            ));
        }
    };

    let id = value.get("id").cloned().filter(|id| !id.is_null());
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ))
        }
    };

    tracing::debug!("Received request: {:?}", request.method);
    server.handle_request(request).await
}

/// Read one message. Blank lines between messages are skipped.
fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<(Framing, Vec<u8>)>, ServerError> {
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(length) = content_length(line) else {
            return Ok(Some((Framing::Newline, line.as_bytes().to_vec())));
        };
        let length: usize = length
            .parse()
            .map_err(|_| ServerError::ProtocolError("Invalid Content-Length".to_string()))?;

        // Skip any further headers up to the blank separator line
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header)? == 0 {
                return Err(ServerError::ProtocolError(
                    "Unexpected EOF in message headers".to_string(),
                ));
            }
            if header.trim().is_empty() {
                break;
            }
        }

        let mut body = vec![0u8; length];
        reader.read_exact(&mut body)?;
        return Ok(Some((Framing::ContentLength, body)));
    }
}

fn content_length(line: &str) -> Option<&str> {
    let (name, value) = line.split_once(':')?;
    name.trim()
        .eq_ignore_ascii_case("content-length")
        .then(|| value.trim())
}

/// Write a JSON-RPC message to the output stream
fn write_message<W: Write>(
    writer: &mut W,
    framing: Framing,
    response: &JsonRpcResponse,
) -> Result<(), ServerError> {
    let body = serde_json::to_string(response)?;
    match framing {
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", body.len());
            writer.write_all(header.as_bytes())?;
            writer.write_all(body.as_bytes())?;
        }
        Framing::Newline => {
            writer.write_all(body.as_bytes())?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use serde_json::json;

    fn server() -> SigningMcpServer {
        SigningMcpServer::new(ServerConfig::default()).unwrap()
    }

    #[test]
    fn test_read_content_length_message() {
        let input = "Content-Length: 52\r\n\r\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1,\"params\":{}}";
        let mut reader = input.as_bytes();

        let (framing, body) = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(framing, Framing::ContentLength);
        let request: JsonRpcRequest = serde_json::from_slice(&body).unwrap();
        assert_eq!(request.method, "ping");
        assert!(read_frame(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_read_newline_delimited_messages() {
        let input = "{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":1}\n\n{\"jsonrpc\":\"2.0\",\"method\":\"tools/list\",\"id\":2}\n";
        let mut reader = input.as_bytes();

        let (framing, first) = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(framing, Framing::Newline);
        assert!(String::from_utf8(first).unwrap().contains("ping"));

        let (_, second) = read_frame(&mut reader).unwrap().unwrap();
        assert!(String::from_utf8(second).unwrap().contains("tools/list"));
        assert!(read_frame(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_extra_headers_are_skipped() {
        let body = "{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":3}";
        let input = format!(
            "content-length: {}\r\nContent-Type: application/vscode-jsonrpc\r\n\r\n{}",
            body.len(),
            body
        );
        let mut reader = input.as_bytes();
        let (_, read) = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(read, body.as_bytes());
    }

    #[test]
    fn test_invalid_content_length() {
        let mut reader = "Content-Length: lots\r\n\r\n{}".as_bytes();
        assert!(matches!(
            read_frame(&mut reader),
            Err(ServerError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_write_message_in_both_framings() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"ok": true}));

        let mut framed = Vec::new();
        write_message(&mut framed, Framing::ContentLength, &response).unwrap();
        let framed = String::from_utf8(framed).unwrap();
        assert!(framed.starts_with("Content-Length:"));
        assert!(framed.contains("\r\n\r\n{"));

        let mut lined = Vec::new();
        write_message(&mut lined, Framing::Newline, &response).unwrap();
        let lined = String::from_utf8(lined).unwrap();
        assert!(lined.starts_with('{') && lined.ends_with("}\n"));
    }

    #[tokio::test]
    async fn test_parse_error_response() {
        let response = process_frame(&server(), b"{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
        assert!(response.id.is_none());
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let response = process_frame(&server(), br#"{"jsonrpc":"2.0","id":5}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(response.id, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_notification_is_silent() {
        let response = process_frame(
            &server(),
            br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
        assert!(response.is_none());
    }
}

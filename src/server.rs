//! JSON-RPC 2.0 server over stdio.
//!
//! Exposes the import and flag entrypoints as tools so a form backend or
//! an agent can drive them one request per line.

use crate::api::Api;
use crate::catalog::CatalogSource;
use crate::error::Error;
use crate::updater::ItemStore;
use crate::writer::ItemSink;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

/// Run the server over stdin/stdout until stdin closes.
pub async fn run_server<C, S, T>(api: Api<C, S, T>) -> crate::error::Result<()>
where
    C: CatalogSource,
    S: ItemSink,
    T: ItemStore,
{
    let stdin = io::stdin();
    let stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.map_err(|e| Error::Config(format!("stdin error: {}", e)))?;
        let Some(response) = handle_message(&api, &line).await else {
            continue;
        };

        let mut out = stdout.lock();
        writeln!(out, "{}", response).map_err(|e| Error::Config(format!("stdout error: {}", e)))?;
        out.flush()
            .map_err(|e| Error::Config(format!("stdout flush error: {}", e)))?;
    }

    Ok(())
}

/// Handle one request line. Notifications and blank lines yield `None`.
pub async fn handle_message<C, S, T>(api: &Api<C, S, T>, line: &str) -> Option<Value>
where
    C: CatalogSource,
    S: ItemSink,
    T: ItemStore,
{
    if line.trim().is_empty() {
        return None;
    }

    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Some(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": -32700, "message": format!("Parse error: {}", e) }
            }));
        }
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request["method"].as_str().unwrap_or("");

    let response = match method {
        "initialize" => handle_initialize(&id),
        "tools/list" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "tools": tool_definitions() }
        }),
        "tools/call" => handle_tool_call(api, &id, &request["params"]).await,
        "notifications/initialized" | "notifications/cancelled" => return None,
        _ => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("Method not found: {}", method) }
        }),
    };
    Some(response)
}

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "dlab-biblio",
                "version": env!("CARGO_PKG_VERSION")
            }
        }
    })
}

async fn handle_tool_call<C, S, T>(api: &Api<C, S, T>, id: &Value, params: &Value) -> Value
where
    C: CatalogSource,
    S: ItemSink,
    T: ItemStore,
{
    let tool_name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    let result: Result<Value, Error> = match tool_name {
        "import_records" => api
            .import(args)
            .await
            .and_then(|report| serde_json::to_value(report).map_err(Error::from)),
        "update_flags" => serde_json::to_value(api.update_flags(args).await).map_err(Error::from),
        "read_flags" => match args["key"].as_str() {
            Some(key) => api.read_flags(key).await.map(|block| {
                let flags: serde_json::Map<String, Value> = block
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                    .collect();
                json!({ "key": key, "flags": flags })
            }),
            None => Err(Error::InvalidInput("'key' parameter required".to_string())),
        },
        _ => Err(Error::InvalidInput(format!("Unknown tool: {}", tool_name))),
    };

    match result {
        Ok(content) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": content.to_string() }],
                "structuredContent": content
            }
        }),
        Err(e) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": format!("Error: {}", e) }],
                "isError": true
            }
        }),
    }
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "import_records",
            "description": "Fetch HAL documents by identifier and create the importable ones in the Zotero library. Returns counts and per-identifier errors.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "identifiers": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "HAL identifiers, e.g. hal-01234567"
                    }
                },
                "required": ["identifiers"]
            }
        },
        {
            "name": "update_flags",
            "description": "Set workflow flags (yes/no) in the [DLAB] block of an item's Extra field. Fails with a conflict if the item changed concurrently.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Zotero item key" },
                    "updates": {
                        "type": "object",
                        "additionalProperties": { "type": "string", "enum": ["yes", "no"] }
                    }
                },
                "required": ["key", "updates"]
            }
        },
        {
            "name": "read_flags",
            "description": "Read the workflow flags of an item.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "Zotero item key" }
                },
                "required": ["key"]
            }
        }
    ])
}

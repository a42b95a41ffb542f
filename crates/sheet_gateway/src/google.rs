use crate::a1::qualified;
use crate::{GatewayError, Grid, SheetGateway};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Deserialize, Debug)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google Sheets v4 `values` endpoints, RAW input, bearer-token auth.
pub struct GoogleSheets {
    client:         reqwest::Client,
    base_url:       Url,
    spreadsheet_id: String,
    access_token:   String,
}

impl GoogleSheets {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        access_token:   impl Into<String>,
        timeout:        Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        let base_url = Url::parse(SHEETS_API)
            .map_err(|e| GatewayError::Config(format!("base url: {e}")))?;
        Ok(Self {
            client,
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            access_token:   access_token.into(),
        })
    }

    /// Points the client at another API root (proxy, emulator).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, GatewayError> {
        self.base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Config(format!("base url {base_url}: {e}")))?;
        Ok(self)
    }

    /// `{base}/{spreadsheet_id}/values/{last_segment}`, each segment percent-encoded.
    fn values_url(&self, last_segment: &str) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Config(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(last_segment);
        Ok(url)
    }

    fn batch_url(&self) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Config(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values:batchUpdate");
        Ok(url)
    }

    async fn send(&self, context: &str, req: reqwest::RequestBuilder) -> Result<String, GatewayError> {
        let resp = req
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(context, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::from_reqwest(context, e))?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                code: status.as_u16(),
                body: snippet(&body),
            });
        }
        debug!("{context} ok: {}", snippet(&body));
        Ok(body)
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

fn cell_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null      => String::new(),
        other            => other.to_string(),
    }
}

fn decode_grid(body: &str) -> Result<Grid, GatewayError> {
    let parsed: ValueRange = serde_json::from_str(body)
        .map_err(|e| GatewayError::Decode(format!("{e}: {}", snippet(body))))?;
    Ok(parsed
        .values
        .iter()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

#[async_trait]
impl SheetGateway for GoogleSheets {
    async fn get_range(&self, sheet: &str, range: &str) -> Result<Grid, GatewayError> {
        let a1 = qualified(sheet, range);
        let url = self.values_url(&a1)?;
        let body = self.send(&format!("get {a1}"), self.client.get(url)).await?;
        decode_grid(&body)
    }

    async fn update_range(&self, sheet: &str, range: &str, values: Grid) -> Result<(), GatewayError> {
        let a1 = qualified(sheet, range);
        let mut url = self.values_url(&a1)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({
            "range":          a1,
            "majorDimension": "ROWS",
            "values":         values,
        });
        self.send(&format!("update {a1}"), self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn append_rows(&self, sheet: &str, range: &str, values: Grid) -> Result<(), GatewayError> {
        let a1 = qualified(sheet, range);
        let mut url = self.values_url(&format!("{a1}:append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({
            "range":          a1,
            "majorDimension": "ROWS",
            "values":         values,
        });
        self.send(&format!("append {a1}"), self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn batch_update(&self, sheet: &str, updates: Vec<(String, Grid)>) -> Result<(), GatewayError> {
        let data: Vec<Value> = updates
            .into_iter()
            .map(|(range, values)| {
                json!({
                    "range":          qualified(sheet, &range),
                    "majorDimension": "ROWS",
                    "values":         values,
                })
            })
            .collect();
        let body = json!({
            "valueInputOption": "RAW",
            "data":             data,
        });
        let url = self.batch_url()?;
        self.send(&format!("batchUpdate {sheet}"), self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    fn client() -> GoogleSheets {
        GoogleSheets::new("sheet-123", "token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn builds_encoded_values_url() {
        let url = client().values_url("My Picks!C5:C7").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/My%20Picks!C5:C7"
        );
    }

    #[test]
    fn builds_append_and_batch_urls() {
        let c = client();
        let append = c.values_url("Results!A:F:append").unwrap();
        assert!(append.as_str().ends_with("/sheet-123/values/Results!A:F:append"));
        let batch = c.batch_url().unwrap();
        assert!(batch.as_str().ends_with("/sheet-123/values:batchUpdate"));
    }

    #[test]
    fn decodes_mixed_value_types() {
        let grid = decode_grid(r#"{"range":"Meta!A1:B2","values":[["start_row",5],["games_today","3"]]}"#).unwrap();
        assert_eq!(grid[0], vec!["start_row".to_string(), "5".to_string()]);
        assert_eq!(grid[1][1], "3");
    }

    #[test]
    fn missing_values_means_empty_grid() {
        let grid = decode_grid(r#"{"range":"Users!A1:B1000","majorDimension":"ROWS"}"#).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn garbage_body_is_decode_error() {
        assert!(matches!(decode_grid("<html>"), Err(GatewayError::Decode(_))));
    }

    // ── Local HTTP endpoint ──────────────────────────────────────────────────

    /// Answers every connection with the same canned response and forwards
    /// each raw request to the receiver. Returns the API root to point at.
    async fn serve(status: u16, body: String) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let _ = tx.send(read_request(&mut sock).await);
                let resp = format!(
                    "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        (format!("http://{addr}/v4/spreadsheets/"), rx)
    }

    async fn read_request(sock: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let len = text[..end]
                    .lines()
                    .filter_map(|l| {
                        let l = l.to_ascii_lowercase();
                        l.strip_prefix("content-length:").and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .next()
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn request_line(req: &str) -> &str {
        req.lines().next().unwrap_or("")
    }

    fn request_json(req: &str) -> Value {
        let body = req.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
        serde_json::from_str(body).unwrap()
    }

    async fn local(status: u16, body: &str) -> (GoogleSheets, mpsc::UnboundedReceiver<String>) {
        let (base, rx) = serve(status, body.to_string()).await;
        (client().with_base_url(&base).unwrap(), rx)
    }

    #[tokio::test]
    async fn get_sends_bearer_token_and_decodes_values() {
        let (sheets, mut rx) = local(200, r#"{"range":"Meta!A1:B2","values":[["start_row","5"],["games_today",3]]}"#).await;

        let grid = sheets.get_range("Meta", "A:B").await.unwrap();
        assert_eq!(grid[1], vec!["games_today".to_string(), "3".to_string()]);

        let req = rx.recv().await.unwrap();
        assert!(request_line(&req).starts_with("GET /v4/spreadsheets/sheet-123/values/Meta!A:B "));
        assert!(req.to_ascii_lowercase().contains("authorization: bearer token"));
    }

    #[tokio::test]
    async fn error_status_keeps_code_and_truncated_body() {
        let (sheets, _rx) = local(403, &"denied ".repeat(100)).await;

        let err = sheets.get_range("Users", "A:B").await.unwrap_err();
        match err {
            GatewayError::Status { code, body } => {
                assert_eq!(code, 403);
                assert_eq!(body.chars().count(), 200);
                assert!(body.starts_with("denied denied"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_writes_raw_values_to_range() {
        let (sheets, mut rx) = local(200, "{}").await;

        let values = vec![vec!["X".to_string()], vec!["Y".to_string()]];
        sheets.update_range("Picks", "C5:C6", values).await.unwrap();

        let req = rx.recv().await.unwrap();
        assert!(request_line(&req).starts_with("PUT /v4/spreadsheets/sheet-123/values/Picks!C5:C6?valueInputOption=RAW "));
        let body = request_json(&req);
        assert_eq!(body["range"], "Picks!C5:C6");
        assert_eq!(body["values"][1][0], "Y");
    }

    #[tokio::test]
    async fn append_inserts_rows_with_raw_input() {
        let (sheets, mut rx) = local(200, "{}").await;

        let row: Vec<String> = ["2025-01-09", "Regina", "Brandon", "", "", "Scheduled"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sheets.append_rows("Results", "A:F", vec![row]).await.unwrap();

        let req = rx.recv().await.unwrap();
        let line = request_line(&req);
        assert!(line.starts_with("POST /v4/spreadsheets/sheet-123/values/Results!A:F:append?"));
        assert!(line.contains("valueInputOption=RAW"));
        assert!(line.contains("insertDataOption=INSERT_ROWS"));
        assert_eq!(request_json(&req)["values"][0][5], "Scheduled");
    }

    #[tokio::test]
    async fn batch_update_sends_one_data_entry_per_range() {
        let (sheets, mut rx) = local(200, "{}").await;

        let cells = |v: [&str; 3]| vec![v.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
        sheets
            .batch_update("Results", vec![
                ("D3:F3".to_string(), cells(["2", "1", "OT"])),
                ("D5:F5".to_string(), cells(["0", "4", "Final"])),
            ])
            .await
            .unwrap();

        let req = rx.recv().await.unwrap();
        assert!(request_line(&req).starts_with("POST /v4/spreadsheets/sheet-123/values:batchUpdate "));
        let body = request_json(&req);
        assert_eq!(body["valueInputOption"], "RAW");
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["range"], "Results!D3:F3");
        assert_eq!(data[0]["values"][0][2], "OT");
        assert_eq!(data[1]["range"], "Results!D5:F5");
    }
}

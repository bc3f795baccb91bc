#![allow(dead_code)]

use campaign_etl::Settings;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// 依序回放固定回應的 HTTP 伺服器，一個連線一個回應
pub struct ScriptedServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    pub async fn start(responses: Vec<(u16, Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 16 * 1024];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]);
                let request_line = head.lines().next().unwrap_or_default().to_string();
                log.lock().unwrap().push(request_line);

                let body = body.to_string();
                let reason = if status == 429 { "Too Many Requests" } else { "OK" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// 收到的 request line，例如 `GET /lists?count=1000&offset=0 HTTP/1.1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn mailchimp_settings(base_url: String, output_dir: &str) -> Settings {
    let mut settings = Settings::default();
    settings.mailchimp.base_url = Some(base_url);
    settings.output.directory = output_dir.to_string();
    settings
}

pub fn analytics_settings(base_url: String, output_dir: &str) -> Settings {
    let mut settings = Settings::default();
    settings.analytics.base_url = base_url;
    settings.output.directory = output_dir.to_string();
    settings
}

pub fn lists_page(start: usize, count: usize) -> Value {
    let lists: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "id": format!("list{}", i),
                "name": format!("List {}", i),
                "stats": {"member_count": 100, "unsubscribe_count": 4, "open_rate": 0.3, "click_rate": 0.05},
                "date_created": "2023-01-10T08:00:00+00:00",
                "visibility": "pub"
            })
        })
        .collect();
    json!({ "lists": lists, "total_items": 2437 })
}

pub fn campaigns_page(ids: &[&str]) -> Value {
    let campaigns: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "type": "regular",
                "status": "sent",
                "send_time": "2024-03-05T14:30:00+00:00",
                "settings": {"subject_line": format!("Campaign {}", id)},
                "recipients": {"list_id": "list0"}
            })
        })
        .collect();
    json!({ "campaigns": campaigns })
}

pub fn campaign_report() -> Value {
    json!({
        "emails_sent": 200,
        "opens": {"opens_total": 90, "unique_opens": 60, "open_rate": 0.3},
        "clicks": {"clicks_total": 55, "unique_clicks": 40, "click_rate": 0.2},
        "unsubscribed": 2,
        "bounces": {"hard_bounces": 1, "soft_bounces": 3}
    })
}

/// 偶數號會員在烏克蘭，奇數號的國碼查不到
pub fn members_page(start: usize, count: usize) -> Value {
    let members: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "id": format!("m{}", i),
                "email_address": format!("member{}@example.org", i),
                "status": "subscribed",
                "timestamp_signup": "2024-01-01T00:00:00+00:00",
                "timestamp_opt": "2024-01-01T00:05:00+00:00",
                "location": {"country_code": if i % 2 == 0 { "UA" } else { "XX" }},
                "member_rating": 2
            })
        })
        .collect();
    json!({ "members": members })
}

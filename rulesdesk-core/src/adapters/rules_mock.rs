//! Mock rules management API server for testing
//!
//! Serves canned responses in the real envelope format so the HTTP
//! clients can be exercised end to end without a backend:
//! - GET /api/v1/rules returns { success, data: [...], pagination }
//! - GET /api/v1/rules/{id} returns { success, data: {...} }
//! - POST /api/v1/rules/{id}/activate (and friends) return the updated rule
//! - POST /api/v1/rules/export returns a raw CSV body

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

/// Mock rules API server
pub struct MockRulesServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<String>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration for mock behaviour
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Number of rules returned by the list endpoint
    pub num_rules: usize,
    /// Reject every request with 401
    pub fail_auth: bool,
    /// Reject every request with 429
    pub rate_limit: bool,
    /// Answer 200 with `success: false`
    pub envelope_failure: bool,
    /// Require `Authorization: Bearer test_...`
    pub require_token: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_rules: 3,
            fail_auth: false,
            rate_limit: false,
            envelope_failure: false,
            require_token: false,
        }
    }
}

impl MockRulesServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_clone = requests.clone();

        // Non-blocking so stop() can end the accept loop
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let log = requests_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &cfg, &log);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL (without the API prefix)
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Request lines received so far, e.g. `GET /api/v1/rules?page=1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockRulesServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read headers and, if announced, the full body
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body = String::from_utf8_lossy(&data[header_end..]).to_string();
    Some((head, body))
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, log: &Mutex<Vec<String>>) {
    let Some((head, _body)) = read_request(&mut stream) else {
        return;
    };

    let first_line = head.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_json(&mut stream, 400, "Bad Request", &json!({"message": "Invalid request"}));
        return;
    }
    let method = parts[0];
    let target = parts[1];
    log.lock().push(format!("{} {}", method, target));

    if config.fail_auth {
        send_json(&mut stream, 401, "Unauthorized", &json!({"message": "Token expired"}));
        return;
    }

    let has_token = head
        .to_lowercase()
        .contains("authorization: bearer test_");
    if config.require_token && !has_token {
        send_json(&mut stream, 401, "Unauthorized", &json!({"message": "Missing token"}));
        return;
    }

    if config.rate_limit {
        send_json(&mut stream, 429, "Too Many Requests", &json!({"message": "Slow down"}));
        return;
    }

    if config.envelope_failure {
        send_json(
            &mut stream,
            200,
            "OK",
            &json!({"success": false, "message": "Rule engine unavailable"}),
        );
        return;
    }

    let path = target.split('?').next().unwrap_or(target);
    let Some(path) = path.strip_prefix("/api/v1/") else {
        send_json(&mut stream, 404, "Not Found", &json!({"message": "Endpoint not found"}));
        return;
    };
    let segments: Vec<&str> = path.split('/').collect();

    match (method, segments.as_slice()) {
        ("GET", ["rules"]) => {
            let rules: Vec<JsonValue> = (1..=config.num_rules)
                .map(|i| mock_rule(&i.to_string(), "DRAFT"))
                .collect();
            let body = json!({
                "success": true,
                "data": rules,
                "pagination": {
                    "page": 1,
                    "limit": 20,
                    "total": config.num_rules,
                    "totalPages": 1
                }
            });
            send_json(&mut stream, 200, "OK", &body);
        }
        ("POST", ["rules", "validate"]) => {
            let body = json!({"success": true, "data": {"is_valid": false, "errors": ["unexpected token THEN"]}});
            send_json(&mut stream, 200, "OK", &body);
        }
        ("POST", ["rules", "export"]) => {
            send_raw(&mut stream, "text/csv", b"id,name\n1,Rule 1\n");
        }
        ("POST", ["rules", "import"]) => {
            let body = json!({"success": true, "data": {"imported": 2, "errors": []}});
            send_json(&mut stream, 200, "OK", &body);
        }
        ("POST", ["rules", "bulk", "delete"]) => {
            send_json(&mut stream, 200, "OK", &json!({"success": true}));
        }
        ("POST", ["rules", "bulk", action]) => {
            let status = if *action == "activate" { "ACTIVE" } else { "INACTIVE" };
            let body = json!({"success": true, "data": [mock_rule("1", status), mock_rule("2", status)]});
            send_json(&mut stream, 200, "OK", &body);
        }
        ("GET", ["rules", "missing"]) => {
            send_json(&mut stream, 404, "Not Found", &json!({"success": false, "message": "Rule not found"}));
        }
        ("GET", ["rules", id]) => {
            send_json(&mut stream, 200, "OK", &json!({"success": true, "data": mock_rule(id, "ACTIVE")}));
        }
        ("POST", ["rules"]) => {
            send_json(&mut stream, 201, "Created", &json!({"success": true, "data": mock_rule("new-1", "DRAFT")}));
        }
        ("PUT", ["rules", id]) => {
            let mut rule = mock_rule(id, "DRAFT");
            rule["name"] = json!("Updated Rule");
            rule["version"] = json!(2);
            send_json(&mut stream, 200, "OK", &json!({"success": true, "data": rule}));
        }
        ("DELETE", ["rules", _]) => {
            send_json(&mut stream, 200, "OK", &json!({"success": true}));
        }
        ("GET", ["rules", _, "metrics"]) => {
            let body = json!({"success": true, "data": {"evaluations": 42, "hitRate": 0.5}});
            send_json(&mut stream, 200, "OK", &body);
        }
        ("GET", ["rules", _, "history"]) => {
            let body = json!({"success": true, "data": [
                {"version": 1, "changed_by": "alice", "action": "CREATED"},
                {"version": 2, "changed_by": "bob", "action": "UPDATED"}
            ]});
            send_json(&mut stream, 200, "OK", &body);
        }
        ("POST", ["rules", id, "test"]) => {
            let body = json!({"success": true, "data": {"rule_id": id, "matched": true}});
            send_json(&mut stream, 200, "OK", &body);
        }
        ("POST", ["rules", id, "duplicate"]) => {
            let mut rule = mock_rule("copy-1", "DRAFT");
            rule["name"] = json!(format!("Rule {} (Copy)", id));
            send_json(&mut stream, 200, "OK", &json!({"success": true, "data": rule}));
        }
        ("POST", ["rules", id, action]) => {
            let status = match *action {
                "activate" => "ACTIVE",
                "deactivate" => "INACTIVE",
                "approve" => "APPROVED",
                _ => "UNDER_REVIEW",
            };
            send_json(&mut stream, 200, "OK", &json!({"success": true, "data": mock_rule(id, status)}));
        }
        ("POST", ["auth", "login"]) => {
            let body = json!({"success": true, "data": {
                "token": "test_token",
                "user": mock_user(),
                "expiresAt": "2030-01-01T00:00:00Z"
            }});
            send_json(&mut stream, 200, "OK", &body);
        }
        ("GET", ["auth", "me"]) => {
            send_json(&mut stream, 200, "OK", &json!({"success": true, "data": mock_user()}));
        }
        ("POST", ["auth", _]) => {
            send_json(&mut stream, 200, "OK", &json!({"success": true}));
        }
        _ => {
            send_json(&mut stream, 404, "Not Found", &json!({"message": "Endpoint not found"}));
        }
    }
}

fn mock_rule(id: &str, status: &str) -> JsonValue {
    json!({
        "id": id,
        "name": format!("Rule {}", id),
        "description": "Mock rule",
        "dsl_content": "IF quantity >= 3 THEN discount = price * 0.1",
        "status": status,
        "priority": "MEDIUM",
        "category": "PROMOTIONS",
        "version": 1,
        "created_by": "mock",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z",
        "tags": ["mock"]
    })
}

fn mock_user() -> JsonValue {
    json!({"id": "u1", "name": "Alice", "email": "alice@example.com", "role": "MANAGER"})
}

fn send_json(stream: &mut TcpStream, status: u16, status_text: &str, body: &JsonValue) {
    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn send_raw(stream: &mut TcpStream, content_type: &str, body: &[u8]) {
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapters::http::{HttpTransport, TokenHandle, DEFAULT_API_PREFIX};
    use crate::adapters::{HttpAuthApi, HttpRulesApi};
    use crate::domain::{
        ApiError, CreateRuleRequest, ExportFormat, LoginRequest, NotificationType, Priority,
        RuleListParams, RuleStatus, SortOrder, UpdateRuleRequest, UserRole, ValidateRuleRequest,
    };
    use crate::ports::{AuthApi, RulesApi};
    use crate::services::NotificationQueue;

    fn transport(server: &MockRulesServer, token: TokenHandle) -> Arc<HttpTransport> {
        Arc::new(
            HttpTransport::new(&server.base_url(), DEFAULT_API_PREFIX, Duration::from_secs(5), token)
                .unwrap(),
        )
    }

    fn rules_client(server: &MockRulesServer) -> HttpRulesApi {
        HttpRulesApi::new(transport(server, TokenHandle::default()))
    }

    #[test]
    fn test_mock_server_starts() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        assert!(server.port() > 0);
    }

    #[tokio::test]
    async fn test_list_rules_with_pagination() {
        let server = MockRulesServer::start(MockConfig {
            num_rules: 5,
            ..Default::default()
        })
        .unwrap();
        let client = rules_client(&server);

        let params = RuleListParams {
            page: Some(1),
            limit: Some(20),
            sort_by: Some("created_at".to_string()),
            sort_order: Some(SortOrder::Desc),
            search: Some(String::new()),
            ..Default::default()
        };
        let response = client.list_rules(&params).await.unwrap();

        assert_eq!(response.data.as_ref().map(Vec::len), Some(5));
        assert_eq!(response.pagination.map(|p| p.total), Some(5));

        // Empty search is not sent
        let requests = server.requests();
        assert_eq!(
            requests,
            vec!["GET /api/v1/rules?page=1&limit=20&sort_by=created_at&sort_order=desc".to_string()]
        );
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        let client = rules_client(&server);

        let rule = client.get_rule("7").await.unwrap();
        assert_eq!(rule.id, "7");
        assert_eq!(rule.status, RuleStatus::Active);

        let created = client
            .create_rule(&CreateRuleRequest {
                name: "Spring Sale".to_string(),
                description: "Seasonal".to_string(),
                dsl_content: "IF month = 3 THEN discount = 0.2".to_string(),
                priority: Priority::High,
                category: "PROMOTIONS".to_string(),
                tags: vec![],
            })
            .await
            .unwrap();
        // The server response wins over the request payload
        assert_eq!(created.id, "new-1");
        assert_eq!(created.name, "Rule new-1");

        let updated = client
            .update_rule(
                "7",
                &UpdateRuleRequest {
                    name: Some("Updated Rule".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        client.delete_rule("7").await.unwrap();
        assert!(server.requests().contains(&"DELETE /api/v1/rules/7".to_string()));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        let client = rules_client(&server);

        let rule = client.activate_rule("1").await.unwrap().unwrap();
        assert_eq!(rule.status, RuleStatus::Active);
        let rule = client.deactivate_rule("1").await.unwrap().unwrap();
        assert_eq!(rule.status, RuleStatus::Inactive);
        let rule = client.submit_for_approval("1").await.unwrap().unwrap();
        assert_eq!(rule.status, RuleStatus::UnderReview);
        let rule = client.approve_rule("1").await.unwrap().unwrap();
        assert_eq!(rule.status, RuleStatus::Approved);

        assert!(server
            .requests()
            .contains(&"POST /api/v1/rules/1/submit-approval".to_string()));
    }

    #[tokio::test]
    async fn test_not_found_uses_server_message() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        let queue = Arc::new(NotificationQueue::new());
        let transport = HttpTransport::new(
            &server.base_url(),
            DEFAULT_API_PREFIX,
            Duration::from_secs(5),
            TokenHandle::default(),
        )
        .unwrap()
        .with_notifications(queue.clone());
        let client = HttpRulesApi::new(Arc::new(transport));

        let err = client.get_rule("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Rule not found");

        let notes = queue.all();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Not Found");
        assert_eq!(notes[0].message, "The requested resource was not found");
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token() {
        let server = MockRulesServer::start(MockConfig {
            fail_auth: true,
            ..Default::default()
        })
        .unwrap();
        let token = TokenHandle::new(Some("test_abc".to_string()));
        let client = HttpRulesApi::new(transport(&server, token.clone()));

        let err = client.get_rule("1").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(!token.is_set());
    }

    #[tokio::test]
    async fn test_bearer_token_is_attached() {
        let server = MockRulesServer::start(MockConfig {
            require_token: true,
            ..Default::default()
        })
        .unwrap();

        let anonymous = rules_client(&server);
        assert!(anonymous.get_rule("1").await.is_err());

        let token = TokenHandle::new(Some("test_abc".to_string()));
        let client = HttpRulesApi::new(transport(&server, token));
        assert!(client.get_rule("1").await.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limit_is_a_warning() {
        let server = MockRulesServer::start(MockConfig {
            rate_limit: true,
            ..Default::default()
        })
        .unwrap();
        let queue = Arc::new(NotificationQueue::new());
        let transport = HttpTransport::new(
            &server.base_url(),
            DEFAULT_API_PREFIX,
            Duration::from_secs(5),
            TokenHandle::default(),
        )
        .unwrap()
        .with_notifications(queue.clone());
        let client = HttpRulesApi::new(Arc::new(transport));

        let err = client.list_rules(&RuleListParams::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Slow down");
        assert_eq!(queue.all()[0].kind, NotificationType::Warning);
        assert_eq!(queue.all()[0].title, "Rate Limited");
    }

    #[tokio::test]
    async fn test_envelope_failure_on_2xx() {
        let server = MockRulesServer::start(MockConfig {
            envelope_failure: true,
            ..Default::default()
        })
        .unwrap();
        let client = rules_client(&server);

        let err = client.get_rule("1").await.unwrap_err();
        assert_eq!(err, ApiError::Envelope("Rule engine unavailable".to_string()));
    }

    #[tokio::test]
    async fn test_network_error_when_server_is_gone() {
        let mut server = MockRulesServer::start(MockConfig::default()).unwrap();
        let client = rules_client(&server);
        server.stop();
        drop(server);

        let err = client.get_rule("1").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn test_secondary_endpoints() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        let client = rules_client(&server);

        let metrics = client.get_rule_metrics("1").await.unwrap();
        assert_eq!(metrics.get("evaluations"), Some(&json!(42)));

        let history = client.get_rule_history("1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].changed_by.as_deref(), Some("bob"));

        let validation = client
            .validate_rule(&ValidateRuleRequest {
                dsl_content: "IF THEN".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!validation.is_valid);
        assert_eq!(validation.errors.len(), 1);

        let outcome = client.test_rule("1", &json!({"quantity": 5})).await.unwrap();
        assert_eq!(outcome["matched"], json!(true));

        let copy = client.duplicate_rule("1", None).await.unwrap();
        assert_eq!(copy.name, "Rule 1 (Copy)");
    }

    #[tokio::test]
    async fn test_bulk_endpoints() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        let client = rules_client(&server);
        let ids = vec!["1".to_string(), "2".to_string()];

        let activated = client.bulk_activate(&ids).await.unwrap();
        assert!(activated.iter().all(|r| r.status == RuleStatus::Active));
        let deactivated = client.bulk_deactivate(&ids).await.unwrap();
        assert!(deactivated.iter().all(|r| r.status == RuleStatus::Inactive));
        client.bulk_delete(&ids).await.unwrap();
    }

    #[tokio::test]
    async fn test_export_and_import() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        let client = rules_client(&server);

        let bytes = client.export_rules(ExportFormat::Csv, None).await.unwrap();
        assert_eq!(bytes, b"id,name\n1,Rule 1\n".to_vec());

        let result = client
            .import_rules("rules.json", b"[{\"name\": \"a\"}]".to_vec())
            .await
            .unwrap();
        assert_eq!(result.imported, 2);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_auth_endpoints() {
        let server = MockRulesServer::start(MockConfig::default()).unwrap();
        let client = HttpAuthApi::new(transport(&server, TokenHandle::default()));

        let login = client
            .login(&LoginRequest {
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(login.token, "test_token");
        assert_eq!(login.user.role, UserRole::Manager);

        let me = client.current_user().await.unwrap();
        assert_eq!(me.email, "alice@example.com");

        client.logout().await.unwrap();
        client.request_password_reset("alice@example.com").await.unwrap();
    }
}

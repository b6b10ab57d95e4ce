//! In-process fake of the Kubernetes API server endpoints the client uses.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use api_types::List;
use api_types::ListMeta;
use api_types::Node;
use api_types::ObjectMeta;
use api_types::Pod;
use api_types::PodExt;
use api_types::PodPhase;
use api_types::PodStatus;
use async_stream::stream;
use poem::get;
use poem::handler;
use poem::http::StatusCode;
use poem::listener::Acceptor;
use poem::listener::Listener;
use poem::listener::TcpListener;
use poem::web::Data;
use poem::web::Json;
use poem::web::Path;
use poem::web::Query;
use poem::Body;
use poem::EndpointExt;
use poem::Response;
use poem::Route;
use poem::Server;
use pod_runner::ClientConfig;
use pod_runner::KubeClient;
use serde_json::json;

pub const CREATED_NAME: &str = "buildlet-7f3k";
pub const CREATED_VERSION: &str = "1001";

/// Behaviour and recorded calls of the fake server.
#[derive(Default)]
pub struct FakeApi {
    /// status for `POST .../pods`; 201 when unset
    pub create_status: Option<u16>,
    /// status for `DELETE .../pods/<name>`; 200 when unset
    pub delete_status: Option<u16>,
    /// records written by the watch endpoint, one per line
    pub watch_lines: Vec<String>,
    /// keep the watch body open after the records instead of ending it
    pub hang_watch: bool,
    /// reject the watch with this status instead of streaming records
    pub watch_status: Option<u16>,
    /// break off the body of a rejected watch halfway through
    pub truncate_watch_rejection: bool,
    pub pods: Vec<Pod>,
    pub nodes: Vec<Node>,
    pub logs: HashMap<String, String>,

    pub created: Mutex<Vec<Pod>>,
    pub deletes: Mutex<Vec<String>>,
    /// `(pod name, resourceVersion query)` of each watch request
    pub watches: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeApi {
    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().expect("lock").clone()
    }

    pub fn watches(&self) -> Vec<(String, Option<String>)> {
        self.watches.lock().expect("lock").clone()
    }

    pub fn created(&self) -> Vec<Pod> {
        self.created.lock().expect("lock").clone()
    }
}

pub fn pod(name: &str, phase: PodPhase) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(phase_status(phase)),
        ..Default::default()
    }
}

fn phase_status(phase: PodPhase) -> PodStatus {
    PodStatus {
        phase: Some(phase.as_str().to_string()),
        ..Default::default()
    }
}

/// A workload as a caller would submit it.
pub fn workload() -> Pod {
    serde_json::from_value(json!({
        "metadata": {"generateName": "buildlet-"},
        "spec": {
            "restartPolicy": "Never",
            "containers": [{"name": "buildlet", "image": "gcr.io/go/buildlet:latest"}]
        }
    }))
    .expect("valid pod")
}

/// One watch record for the created pod.
pub fn watch_line(event_type: &str, phase: &str) -> String {
    json!({
        "type": event_type,
        "object": {
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": CREATED_NAME, "resourceVersion": CREATED_VERSION},
            "status": {"phase": phase}
        }
    })
    .to_string()
}

fn status_code(code: Option<u16>, default: StatusCode) -> StatusCode {
    code.and_then(|c| StatusCode::from_u16(c).ok())
        .unwrap_or(default)
}

fn json_response(status: StatusCode, body: &impl serde::Serialize) -> Response {
    Response::builder()
        .status(status)
        .content_type("application/json")
        .body(serde_json::to_vec(body).expect("serializable"))
}

fn not_found(name: &str) -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        &json!({"kind": "Status", "status": "Failure", "reason": "NotFound", "message": format!("pods \"{name}\" not found"), "code": 404}),
    )
}

#[handler]
async fn create_pod(
    Path(_namespace): Path<String>,
    Data(api): Data<&Arc<FakeApi>>,
    Json(mut submitted): Json<Pod>,
) -> Response {
    api.created.lock().expect("lock").push(submitted.clone());

    let status = status_code(api.create_status, StatusCode::CREATED);
    if status != StatusCode::CREATED {
        return Response::builder()
            .status(status)
            .body(r#"{"kind":"Status","reason":"AlreadyExists"}"#);
    }

    submitted.metadata.name = Some(CREATED_NAME.to_string());
    submitted.metadata.resource_version = Some(CREATED_VERSION.to_string());
    submitted.status = Some(phase_status(PodPhase::Pending));
    json_response(StatusCode::CREATED, &submitted)
}

#[handler]
async fn list_pods(Path(_namespace): Path<String>, Data(api): Data<&Arc<FakeApi>>) -> Response {
    json_response(StatusCode::OK, &List {
        items: api.pods.clone(),
        metadata: ListMeta::default(),
    })
}

#[handler]
async fn get_pod(
    Path((_namespace, name)): Path<(String, String)>,
    Data(api): Data<&Arc<FakeApi>>,
) -> Response {
    match api.pods.iter().find(|p| p.name() == name) {
        Some(pod) => json_response(StatusCode::OK, pod),
        None => not_found(&name),
    }
}

#[handler]
async fn delete_pod(
    Path((_namespace, name)): Path<(String, String)>,
    Data(api): Data<&Arc<FakeApi>>,
) -> Response {
    api.deletes.lock().expect("lock").push(name.clone());
    let status = status_code(api.delete_status, StatusCode::OK);
    Response::builder()
        .status(status)
        .body(format!(r#"{{"kind":"Status","details":{{"name":"{name}"}}}}"#))
}

#[handler]
async fn pod_log(
    Path((_namespace, name)): Path<(String, String)>,
    Data(api): Data<&Arc<FakeApi>>,
) -> Response {
    match api.logs.get(&name) {
        Some(log) => Response::builder()
            .content_type("text/plain")
            .body(log.clone()),
        None => not_found(&name),
    }
}

#[handler]
async fn list_nodes(Data(api): Data<&Arc<FakeApi>>) -> Response {
    json_response(StatusCode::OK, &List {
        items: api.nodes.clone(),
        metadata: ListMeta::default(),
    })
}

#[handler]
async fn watch_pod(
    Path((_namespace, name)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    Data(api): Data<&Arc<FakeApi>>,
) -> Response {
    api.watches
        .lock()
        .expect("lock")
        .push((name, query.get("resourceVersion").cloned()));

    if let Some(code) = api.watch_status {
        let truncate = api.truncate_watch_rejection;
        let body = stream! {
            yield Ok::<_, std::io::Error>(r#"{"kind":"Status","#.to_string());
            if truncate {
                yield Err(std::io::Error::other("connection dropped"));
            } else {
                yield Ok(r#""reason":"Forbidden"}"#.to_string());
            }
        };
        return Response::builder()
            .status(status_code(Some(code), StatusCode::INTERNAL_SERVER_ERROR))
            .content_type("application/json")
            .body(Body::from_bytes_stream(body));
    }

    let lines = api.watch_lines.clone();
    let hang = api.hang_watch;
    let body = stream! {
        for line in lines {
            yield Ok::<_, std::io::Error>(format!("{line}\n"));
        }
        if hang {
            futures::future::pending::<()>().await;
        }
    };

    Response::builder()
        .content_type("application/json")
        .body(Body::from_bytes_stream(body))
}

/// Serve `api` on an ephemeral local port and return its base url.
pub async fn serve(api: Arc<FakeApi>) -> String {
    let app = Route::new()
        .at(
            "/api/v1/namespaces/:namespace/pods",
            get(list_pods).post(create_pod),
        )
        .at(
            "/api/v1/namespaces/:namespace/pods/:name",
            get(get_pod).delete(delete_pod),
        )
        .at("/api/v1/namespaces/:namespace/pods/:name/log", get(pod_log))
        .at("/api/v1/nodes", get(list_nodes))
        .at(
            "/api/v1/watch/namespaces/:namespace/pods/:name",
            get(watch_pod),
        )
        .data(api);

    let acceptor = TcpListener::bind("127.0.0.1:0")
        .into_acceptor()
        .await
        .expect("should bind");
    let addr = *acceptor
        .local_addr()
        .first()
        .and_then(|addr| addr.as_socket_addr())
        .expect("should have a tcp address");

    tokio::spawn(Server::new_with_acceptor(acceptor).run(app));
    format!("http://{addr}")
}

/// Start a fake server and a client pointed at it.
pub async fn client_for(api: FakeApi, run_timeout: Duration) -> (Arc<FakeApi>, KubeClient) {
    let api = Arc::new(api);
    let base_url = serve(api.clone()).await;
    let client = KubeClient::new(
        ClientConfig::new(base_url)
            .with_run_timeout(run_timeout)
            .with_request_timeout(Duration::from_secs(5)),
    )
    .expect("should create client");
    (api, client)
}

pub fn node(name: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

//! Shared harness: the real router over an in-memory store, bound to an
//! ephemeral port.

#![allow(dead_code)]

use convenios_api::{build_service, transport, MemoryStore};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

pub const PUBLIC_BASE: &str = "http://api.example.org/siconv/";

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn municipios() -> Vec<JsonValue> {
    let mut rows = vec![
        json!({"id": 3550308, "nome": "São Paulo", "uf": "SP", "uf_nome": "São Paulo", "regiao": "SE"}),
        json!({"id": 3304557, "nome": "Rio de Janeiro", "uf": "RJ", "uf_nome": "Rio de Janeiro", "regiao": "SE"}),
        json!({"id": 3509502, "nome": "Campinas", "uf": "SP", "uf_nome": "São Paulo", "regiao": "SE"}),
    ];
    // Enough rows in one state to page through.
    for i in 0..1200 {
        rows.push(json!({
            "id": 1_700_000 + i,
            "nome": format!("Municipio {}", i),
            "uf": "TO",
            "uf_nome": "Tocantins",
            "regiao": "N"
        }));
    }
    rows
}

pub fn store() -> MemoryStore {
    MemoryStore::from_tables(vec![
        ("municipio".to_string(), municipios()),
        (
            "proponente".to_string(),
            vec![
                json!({"id": 46395000000139i64, "nome": "Prefeitura de São Paulo", "id_municipio": 3550308, "id_natureza_juridica": 1}),
                json!({"id": 42498733000148i64, "nome": "Prefeitura do Rio de Janeiro", "id_municipio": 3304557, "id_natureza_juridica": 1}),
            ],
        ),
        (
            "natureza_juridica".to_string(),
            vec![json!({"id": 1, "nome": "Administração Pública Municipal"})],
        ),
        (
            "orgao".to_string(),
            vec![json!({"id": 26000, "nome": "Ministério da Educação"})],
        ),
    ])
    .expect("fixture rows are objects")
}

pub async fn spawn() -> Result<TestServer, Box<dyn std::error::Error>> {
    let service = build_service(PUBLIC_BASE, Arc::new(store()))?;
    let app_state = transport::http::AppState {
        service: Arc::new(service),
        cache_refresh_hour: 3,
    };
    let router = transport::http::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client,
        handle,
    })
}

//! Black-box tests of the list endpoints, the documentation listing and the
//! response policy, over the in-memory store.

mod common;

use reqwest::header;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_filter_is_folded_and_validated() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    let resp = server
        .client
        .get(server.url("/v1/consulta/municipios.json?uf=sp&nome=paulo"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json; charset=utf-8");
    let body: JsonValue = resp.json().await?;
    assert_eq!(body["metadados"]["total_registros"], json!(1));
    assert_eq!(body["municipios"][0]["nome"], json!("São Paulo"));
    assert_eq!(
        body["municipios"][0]["href"],
        json!("http://api.example.org/siconv/id/municipio/3550308")
    );

    let resp = server
        .client
        .get(server.url("/v1/consulta/municipios.json?uf=xx"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.headers()[header::CONTENT_TYPE].to_str()?.starts_with("text/html"));
    let text = resp.text().await?;
    assert!(text.contains("uf"));
    assert!(text.contains("xx"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pagination_walks_disjoint_windows() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    let page = |offset: u64| {
        let url = server.url(&format!("/v1/consulta/municipios.json?uf=TO&offset={}", offset));
        let client = server.client.clone();
        async move { client.get(url).send().await?.json::<JsonValue>().await }
    };

    let first = page(0).await?;
    assert_eq!(first["metadados"]["total_registros"], json!(1200));
    assert_eq!(
        first["metadados"]["next_page_url"],
        json!("http://api.example.org/siconv/v1/consulta/municipios.json?uf=TO&offset=500")
    );
    let items = first["municipios"].as_array().map(Vec::len);
    assert_eq!(items, Some(500));

    let second = page(500).await?;
    assert_eq!(
        second["metadados"]["next_page_url"],
        json!("http://api.example.org/siconv/v1/consulta/municipios.json?uf=TO&offset=1000")
    );
    let last_of_first = first["municipios"][499]["href"].clone();
    let first_of_second = second["municipios"][0]["href"].clone();
    assert_eq!(last_of_first, json!("http://api.example.org/siconv/id/municipio/1700499"));
    assert_eq!(first_of_second, json!("http://api.example.org/siconv/id/municipio/1700500"));

    let third = page(1000).await?;
    assert!(third["metadados"].get("next_page_url").is_none());
    assert_eq!(third["municipios"].as_array().map(Vec::len), Some(200));

    // Unparseable offsets read as 0.
    let again = server
        .client
        .get(server.url("/v1/consulta/municipios.json?uf=TO&offset=abc"))
        .send()
        .await?
        .json::<JsonValue>()
        .await?;
    assert_eq!(again["municipios"][0], first["municipios"][0]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_errors() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    let cases = [
        ("/v1/consulta/municipios.json?cidade=x", StatusCode::BAD_REQUEST, "cidade"),
        ("/v1/consulta/proponentes.json?id_municipio=abc", StatusCode::BAD_REQUEST, "id_municipio"),
        ("/v1/consulta/inexistente.json", StatusCode::NOT_FOUND, "inexistente"),
        ("/v1/consulta/inexistente", StatusCode::NOT_FOUND, "inexistente"),
        ("/v1/consulta/municipios.pdf", StatusCode::NOT_FOUND, "pdf"),
    ];
    for (path, status, needle) in cases {
        let resp = server.client.get(server.url(path)).send().await?;
        assert_eq!(resp.status(), status, "{}", path);
        assert!(resp.text().await?.contains(needle), "{}", path);
    }

    // Empty result sets are valid pages, not errors.
    let resp = server
        .client
        .get(server.url("/v1/consulta/municipios.xml?nome=atlantida"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await?.contains("total_registros=\"0\""));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_nested_filter_and_alternate_formats() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    let xml = server
        .client
        .get(server.url("/v1/consulta/proponentes.xml?uf=RJ"))
        .send()
        .await?
        .text()
        .await?;
    assert!(xml.contains("<proponentes total_registros=\"1\">"));
    assert!(xml.contains("Prefeitura do Rio de Janeiro"));
    assert!(!xml.contains("Prefeitura de São Paulo"));

    let resp = server
        .client
        .get(server.url("/v1/consulta/municipios.csv?uf=SP"))
        .send()
        .await?;
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let csv = resp.text().await?;
    let mut lines = csv.lines();
    assert!(lines.next().unwrap_or_default().starts_with("id,href,"));
    assert_eq!(lines.filter(|l| !l.is_empty()).count(), 2);

    let ttl = server
        .client
        .get(server.url("/v1/consulta/municipios.ttl?uf=SP"))
        .send()
        .await?
        .text()
        .await?;
    assert!(ttl.contains("http://api.example.org/siconv/id/municipio/3550308"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_response_policy_and_conditional_get() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;
    let url = server.url("/v1/consulta/orgaos.json");

    let resp = server
        .client
        .get(&url)
        .header(header::ORIGIN, "http://example.com")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers().clone();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(headers[header::VARY].to_str()?.contains("Accept-Encoding"));
    assert_eq!(headers[header::CACHE_CONTROL], "public");
    assert!(headers[header::EXPIRES].to_str()?.ends_with("GMT"));
    let etag = headers[header::ETAG].to_str()?.to_string();
    let first = resp.bytes().await?;

    let resp = server.client.get(&url).send().await?;
    assert_eq!(resp.headers()[header::ETAG].to_str()?, etag);
    assert_eq!(resp.bytes().await?, first);

    let resp = server
        .client
        .get(&url)
        .header(header::IF_NONE_MATCH, &etag)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert!(resp.bytes().await?.is_empty());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_documentation_and_health() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    let resp = server.client.get(server.url("/v1/metodos/json")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: JsonValue = resp.json().await?;
    let metodos = doc["metodos"].as_array().cloned().unwrap_or_default();
    assert_eq!(metodos.len(), 21);
    let municipios = metodos
        .iter()
        .find(|m| m["nome"] == json!("Consulta Municípios"))
        .cloned()
        .unwrap_or_default();
    assert_eq!(
        municipios["uri"],
        json!({"href": "http://api.example.org/siconv/v1/consulta/municipios"})
    );
    assert_eq!(municipios["parametros"]["uf"]["tipo"], json!("str"));

    let resp = server
        .client
        .get(server.url("/v1/metodos"))
        .header(header::ACCEPT, "application/json")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()[header::LOCATION],
        "http://api.example.org/siconv/v1/metodos/json"
    );

    let resp = server.client.get(server.url("/v1/metodos/docx")).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = server.client.get(server.url("/health")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let health: JsonValue = resp.json().await?;
    assert_eq!(health["status"], json!("ok"));

    Ok(())
}

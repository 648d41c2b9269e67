//! Identifier and document URIs: 303 from identifiers, content negotiation
//! on suffix-less URLs, and single-resource documents.

mod common;

use reqwest::header;
use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_identifier_redirects_to_document() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    // Existence is not checked on identifiers.
    let resp = server.client.get(server.url("/id/orgao/999999")).send().await?;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()[header::LOCATION],
        "http://api.example.org/siconv/dados/orgao/999999"
    );

    let resp = server.client.get(server.url("/id/nave_espacial/1")).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await?.contains("nave_espacial"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_document_negotiation() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;
    let url = server.url("/dados/municipio/3550308");

    let cases = [
        (Some("application/json"), "json"),
        (Some("text/turtle"), "ttl"),
        (Some("application/rdf+xml;q=0.5, text/csv"), "csv"),
        (Some("image/png"), "html"),
        (None, "html"),
    ];
    for (accept, suffix) in cases {
        let mut req = server.client.get(&url);
        if let Some(a) = accept {
            req = req.header(header::ACCEPT, a);
        }
        let resp = req.send().await?;
        assert_eq!(resp.status(), StatusCode::FOUND, "{:?}", accept);
        assert_eq!(
            resp.headers()[header::LOCATION].to_str()?,
            format!("http://api.example.org/siconv/dados/municipio/3550308.{}", suffix)
        );
        assert!(resp.headers()[header::VARY].to_str()?.contains("Accept"));
    }

    let resp = server.client.get(server.url("/dados/unknownslug/1")).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await?.contains("unknownslug"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_method_negotiation_keeps_query() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    let resp = server
        .client
        .get(server.url("/v1/consulta/municipios?uf=SP"))
        .header(header::ACCEPT, "text/csv")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()[header::LOCATION],
        "http://api.example.org/siconv/v1/consulta/municipios.csv?uf=SP"
    );

    // The fragment URI of the documentation resolves to the listing.
    let resp = server
        .client
        .get(server.url("/v1/consulta"))
        .header(header::ACCEPT, "application/xml")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()[header::LOCATION],
        "http://api.example.org/siconv/v1/metodos/xml"
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_documents_render_one_resource() -> Result<(), Box<dyn std::error::Error>> {
    let server = common::spawn().await?;

    let resp = server
        .client
        .get(server.url("/dados/municipio/3550308.json"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(header::ETAG));
    let doc: JsonValue = resp.json().await?;
    assert!(doc["metadados"].get("total_registros").is_none());
    assert_eq!(doc["municipios"][0]["nome"], json!("São Paulo"));

    let doc: JsonValue = server
        .client
        .get(server.url("/dados/proponente/46395000000139.json"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(doc["proponentes"][0]["cnpj"], json!("46.395.000/0001-39"));
    assert_eq!(
        doc["proponentes"][0]["municipio"]["municipio"]["href"],
        json!("http://api.example.org/siconv/id/municipio/3550308")
    );

    let rdf = server
        .client
        .get(server.url("/dados/municipio/3550308.rdf"))
        .send()
        .await?
        .text()
        .await?;
    assert!(rdf.contains("rdf:RDF"));
    assert!(rdf.contains("http://api.example.org/siconv/id/municipio/3550308"));

    for path in ["/dados/municipio/1.json", "/dados/municipio/abc.json", "/dados/municipio/3550308.docx"] {
        let resp = server.client.get(server.url(path)).send().await?;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", path);
    }

    Ok(())
}

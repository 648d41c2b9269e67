//! URL building for every URI the API emits.
//!
//! All identifiers, documents and endpoint URLs are built under one public
//! base URL so that a deployment behind a path-rewriting proxy still emits
//! stable linked-data identifiers.

use url::form_urlencoded;
use url::Url;

/// Version segment of the query API (`/v1/...`).
pub const API_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    base: Url,
}

impl Links {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut normalized = base.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        Ok(Self {
            base: Url::parse(&normalized)?,
        })
    }

    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    /// Resolves a path relative to the public base.
    pub fn absolute(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match self.base.join(path) {
            Ok(u) => u.to_string(),
            Err(_) => format!("{}{}", self.base, path),
        }
    }

    /// Non-informational resource identifier: `{base}id/{slug}/{id}`.
    pub fn resource_uri(&self, slug: &str, id: &str) -> String {
        self.absolute(&format!("id/{}/{}", slug, id))
    }

    /// Informational document: `{base}dados/{slug}/{id}[.{suffix}]`.
    pub fn document_uri(&self, slug: &str, id: &str, suffix: Option<&str>) -> String {
        match suffix {
            Some(s) => self.absolute(&format!("dados/{}/{}.{}", slug, id, s)),
            None => self.absolute(&format!("dados/{}/{}", slug, id)),
        }
    }

    /// List endpoint URL with the given query pairs, in order.
    pub fn method_url(&self, slug: &str, suffix: Option<&str>, params: &[(String, String)]) -> String {
        let path = match suffix {
            Some(s) => format!("v{}/consulta/{}.{}", API_VERSION, slug, s),
            None => format!("v{}/consulta/{}", API_VERSION, slug),
        };
        with_query(self.absolute(&path), params)
    }

    /// URI of the documentation entry that describes a query method.
    pub fn method_doc_uri(&self, method_id: &str) -> String {
        format!("{}#{}", self.absolute(&format!("v{}/consulta", API_VERSION)), method_id)
    }

    /// Documentation listing of every query method.
    pub fn methods_url(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(s) => self.absolute(&format!("v{}/metodos/{}", API_VERSION, s)),
            None => self.absolute(&format!("v{}/metodos", API_VERSION)),
        }
    }

    /// Builds an API-relative link to a list endpoint filtered by one parameter.
    pub fn filtered_list(&self, slug: &str, param: &str, value: &str) -> String {
        self.method_url(slug, None, &[(param.to_string(), value.to_string())])
    }
}

/// Appends a query string built from `params` (no-op when empty).
pub fn with_query(url: String, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url;
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("{}?{}", url, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_gets_trailing_slash() {
        let links = Links::new("http://example.org/siconv").unwrap();
        assert_eq!(links.base(), "http://example.org/siconv/");
        assert_eq!(
            links.resource_uri("municipio", "3550308"),
            "http://example.org/siconv/id/municipio/3550308"
        );
    }

    #[test]
    fn document_uri_with_and_without_suffix() {
        let links = Links::new("http://example.org/").unwrap();
        assert_eq!(links.document_uri("orgao", "1", None), "http://example.org/dados/orgao/1");
        assert_eq!(
            links.document_uri("emenda", "1,2,3", Some("json")),
            "http://example.org/dados/emenda/1,2,3.json"
        );
    }

    #[test]
    fn method_url_preserves_parameter_order() {
        let links = Links::new("http://example.org/").unwrap();
        let params = vec![
            ("uf".to_string(), "SP".to_string()),
            ("nome".to_string(), "são".to_string()),
            ("offset".to_string(), "500".to_string()),
        ];
        assert_eq!(
            links.method_url("municipios", Some("json"), &params),
            "http://example.org/v1/consulta/municipios.json?uf=SP&nome=s%C3%A3o&offset=500"
        );
    }

    #[test]
    fn method_doc_uri_uses_fragment() {
        let links = Links::new("http://example.org/").unwrap();
        assert_eq!(
            links.method_doc_uri("consulta_orgaos"),
            "http://example.org/v1/consulta#consulta_orgaos"
        );
    }
}

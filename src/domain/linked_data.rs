//! Linked-data dereferencing: identifier → document redirects and `Accept`
//! negotiation over the supported formats.

use crate::domain::entity::Catalog;
use crate::domain::links::{Links, API_VERSION};
use crate::domain::render::Format;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkedDataError {
    #[error("Tipo de recurso não suportado: {0}")]
    UnknownSlug(String),
    #[error("Formato não suportado: {0}.")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// 303: non-informational resource → its document.
    SeeOther,
    /// 302: negotiated representation, varies per client.
    Found,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub location: String,
    pub vary_accept: bool,
}

/// One media range of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
struct MediaRange {
    kind: String,
    subtype: String,
    q: f32,
}

impl MediaRange {
    fn parse(item: &str) -> Option<Self> {
        let mut parts = item.split(';');
        let (kind, subtype) = parts.next()?.trim().split_once('/')?;
        let mut q = 1.0;
        for p in parts {
            if let Some((k, v)) = p.split_once('=') {
                if k.trim().eq_ignore_ascii_case("q") {
                    q = v.trim().parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
                }
            }
        }
        Some(Self {
            kind: kind.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
            q,
        })
    }

    /// Specificity of the match against `content_type`, `None` when it does not apply.
    fn fitness(&self, content_type: &str) -> Option<u8> {
        let (kind, subtype) = content_type.split_once('/')?;
        let kind_ok = self.kind == "*" || self.kind == kind;
        let sub_ok = self.subtype == "*" || self.subtype == subtype;
        if !(kind_ok && sub_ok) {
            return None;
        }
        Some(u8::from(self.kind == kind) * 10 + u8::from(self.subtype == subtype))
    }
}

/// Best format for an `Accept` header among `candidates`.
///
/// The most specific matching range decides each candidate's quality; the
/// highest quality wins and ties go to the earlier candidate. Absent,
/// unparseable or unsatisfiable headers select the first candidate.
pub fn best_match(accept: Option<&str>, candidates: &[Format]) -> Format {
    let fallback = candidates.first().copied().unwrap_or(Format::Html);
    let Some(accept) = accept.filter(|a| !a.trim().is_empty()) else {
        return fallback;
    };
    let ranges: Vec<MediaRange> = accept.split(',').filter_map(MediaRange::parse).collect();

    let mut best: Option<(Format, f32)> = None;
    for &candidate in candidates {
        let quality = ranges
            .iter()
            .filter_map(|r| r.fitness(candidate.content_type()).map(|f| (f, r.q)))
            .max_by_key(|(f, _)| *f)
            .map(|(_, q)| q)
            .unwrap_or(0.0);
        if quality <= 0.0 {
            continue;
        }
        match best {
            Some((_, q)) if q >= quality => {}
            _ => best = Some((candidate, quality)),
        }
    }
    best.map(|(f, _)| f).unwrap_or(fallback)
}

/// Splits `name.suffix` into its name and format; no suffix gives `None`.
pub fn split_suffix(segment: &str) -> Result<(&str, Option<Format>), LinkedDataError> {
    match segment.rsplit_once('.') {
        Some((name, suffix)) => Format::from_suffix(suffix)
            .map(|f| (name, Some(f)))
            .ok_or_else(|| LinkedDataError::UnknownFormat(suffix.to_string())),
        None => Ok((segment, None)),
    }
}

pub struct Resolver<'a> {
    catalog: &'a Catalog,
    links: &'a Links,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, links: &'a Links) -> Self {
        Self { catalog, links }
    }

    fn check_slug(&self, slug: &str) -> Result<(), LinkedDataError> {
        match self.catalog.by_slug(slug) {
            Some(_) => Ok(()),
            None => Err(LinkedDataError::UnknownSlug(slug.to_string())),
        }
    }

    /// `id/{slug}/{id}` → 303 to the document. Existence is not checked here.
    pub fn identifier(&self, slug: &str, id: &str) -> Result<Redirect, LinkedDataError> {
        self.check_slug(slug)?;
        Ok(Redirect {
            kind: RedirectKind::SeeOther,
            location: self.links.document_uri(slug, id, None),
            vary_accept: false,
        })
    }

    /// `dados/{slug}/{id}` without suffix → 302 to the negotiated format.
    pub fn document(&self, slug: &str, id: &str, accept: Option<&str>) -> Result<Redirect, LinkedDataError> {
        self.check_slug(slug)?;
        let format = best_match(accept, &Format::ALL);
        Ok(Redirect {
            kind: RedirectKind::Found,
            location: self.links.document_uri(slug, id, Some(format.suffix())),
            vary_accept: true,
        })
    }

    /// `v1/consulta/{method}` without suffix → 302, query string preserved.
    pub fn method(&self, slug: &str, query: Option<&str>, accept: Option<&str>) -> Redirect {
        let format = best_match(accept, &Format::ALL);
        let mut location = self
            .links
            .absolute(&format!("v{}/consulta/{}.{}", API_VERSION, slug, format.suffix()));
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            location.push('?');
            location.push_str(q);
        }
        Redirect {
            kind: RedirectKind::Found,
            location,
            vary_accept: true,
        }
    }

    /// Documentation listing without format → 302.
    pub fn documentation(&self, accept: Option<&str>) -> Redirect {
        let format = best_match(accept, &Format::ALL);
        Redirect {
            kind: RedirectKind::Found,
            location: self.links.methods_url(Some(format.suffix())),
            vary_accept: true,
        }
    }
}

//! Response policy shared by every data endpoint: caching headers, strong
//! validators and linked-data redirects.

use crate::app::query_service::Payload;
use crate::crypto::hashing::{etag, if_none_match};
use crate::domain::linked_data::{Redirect, RedirectKind};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};

pub const VARY_ENCODING: &str = "Accept-Encoding";
pub const VARY_NEGOTIATED: &str = "Accept, Accept-Encoding";

/// First instant at `hour:00` local time strictly after `now`.
pub fn next_refresh<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive().and_hms_opt(hour, 0, 0)?;
    let candidate = tz.from_local_datetime(&today).earliest()?;
    if candidate > *now {
        return Some(candidate);
    }
    let tomorrow = today.checked_add_signed(Duration::days(1))?;
    tz.from_local_datetime(&tomorrow).earliest()
}

/// HTTP-date (`IMF-fixdate`) of an instant.
pub fn http_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Utc).format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(value).ok()
}

/// Caching headers of one payload: strong `ETag`, public caching until the
/// next refresh hour, `Vary: Accept-Encoding`.
fn cache_headers(tag: &str, refresh_hour: u32) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::VARY, HeaderValue::from_static(VARY_ENCODING));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public"));
    if let Some(v) = header_value(tag) {
        headers.insert(header::ETAG, v);
    }
    if let Some(v) = next_refresh(&Local::now(), refresh_hour).and_then(|at| header_value(&http_date(&at))) {
        headers.insert(header::EXPIRES, v);
    }
    headers
}

/// 200 with the payload, or 304 when the client's validator still matches.
pub fn payload_response(request_headers: &HeaderMap, payload: Payload, refresh_hour: u32) -> Response {
    let tag = etag(&payload.body);
    let mut headers = cache_headers(&tag, refresh_hour);

    let not_modified = request_headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| if_none_match(v, &tag))
        .unwrap_or(false);
    if not_modified {
        return (StatusCode::NOT_MODIFIED, headers).into_response();
    }

    if let Some(v) = header_value(&payload.format.header_value()) {
        headers.insert(header::CONTENT_TYPE, v);
    }
    (StatusCode::OK, headers, payload.body).into_response()
}

pub fn redirect_response(redirect: Redirect) -> Response {
    let status = match redirect.kind {
        RedirectKind::SeeOther => StatusCode::SEE_OTHER,
        RedirectKind::Found => StatusCode::FOUND,
    };
    let mut headers = HeaderMap::new();
    match header_value(&redirect.location) {
        Some(v) => {
            headers.insert(header::LOCATION, v);
        }
        None => {
            tracing::error!(location = %redirect.location, "redirect location is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    let vary = if redirect.vary_accept { VARY_NEGOTIATED } else { VARY_ENCODING };
    headers.insert(header::VARY, HeaderValue::from_static(vary));
    (status, headers).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn brt(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        tz.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn refresh_is_the_next_occurrence_of_the_hour() {
        assert_eq!(next_refresh(&brt(2024, 5, 10, 1, 30), 3), Some(brt(2024, 5, 10, 3, 0)));
        assert_eq!(next_refresh(&brt(2024, 5, 10, 3, 0), 3), Some(brt(2024, 5, 11, 3, 0)));
        assert_eq!(next_refresh(&brt(2024, 12, 31, 22, 0), 3), Some(brt(2025, 1, 1, 3, 0)));
    }

    #[test]
    fn http_dates_are_gmt() {
        assert_eq!(http_date(&brt(2024, 5, 10, 3, 0)), "Fri, 10 May 2024 06:00:00 GMT");
    }

    #[test]
    fn conditional_request_gets_304() {
        let payload = Payload {
            format: crate::domain::render::Format::Json,
            body: b"{}".to_vec(),
        };
        let mut request = HeaderMap::new();
        request.insert(header::IF_NONE_MATCH, HeaderValue::from_str(&etag(b"{}")).unwrap());
        let response = payload_response(&request, payload.clone(), 3);
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let response = payload_response(&HeaderMap::new(), payload, 3);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::VARY], VARY_ENCODING);
        assert!(response.headers().contains_key(header::EXPIRES));
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json; charset=utf-8");
    }

    #[test]
    fn negotiated_redirects_vary_on_accept() {
        let response = redirect_response(Redirect {
            kind: RedirectKind::Found,
            location: "http://api.example.org/siconv/dados/municipio/1.json".into(),
            vary_accept: true,
        });
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::VARY], VARY_NEGOTIATED);
    }
}

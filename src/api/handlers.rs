//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::types::{
    ErrorResponse, KindQuery, LatestQuery, SeriesQuery, TopProducersQuery, parse_kind, parse_range,
    require_code,
};
use crate::service::EnergyFeeds;

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

/// `GET /regions?kind=CA_PROVINCE`
pub async fn get_regions(State(feeds): State<Arc<EnergyFeeds>>, Query(query): Query<KindQuery>) -> Response {
    match parse_kind(query.kind.as_deref()) {
        Ok(kind) => Json(feeds.regions(kind)).into_response(),
        Err(e) => bad_request(e),
    }
}

/// `GET /production?kind=US_STATE&code=TX&start=2020-01&end=2024-12`
pub async fn get_production(
    State(feeds): State<Arc<EnergyFeeds>>,
    Query(query): Query<SeriesQuery>,
) -> Response {
    let parsed = parse_kind(query.kind.as_deref()).and_then(|kind| {
        let code = require_code(query.code.as_deref())?;
        let range = parse_range(query.start.as_deref(), query.end.as_deref())?;
        Ok((kind, code, range))
    });
    match parsed {
        Ok((kind, code, range)) => Json(feeds.production(kind, code, &range).await).into_response(),
        Err(e) => bad_request(e),
    }
}

/// `GET /reserves?kind=US_STATE&code=TX`
pub async fn get_reserves(
    State(feeds): State<Arc<EnergyFeeds>>,
    Query(query): Query<SeriesQuery>,
) -> Response {
    let parsed = parse_kind(query.kind.as_deref()).and_then(|kind| {
        let code = require_code(query.code.as_deref())?;
        let range = parse_range(query.start.as_deref(), query.end.as_deref())?;
        Ok((kind, code, range))
    });
    match parsed {
        Ok((kind, code, range)) => Json(feeds.reserves(kind, code, &range).await).into_response(),
        Err(e) => bad_request(e),
    }
}

/// `GET /production/latest?kind=CA_PROVINCE&code=AB`
pub async fn get_latest_production(
    State(feeds): State<Arc<EnergyFeeds>>,
    Query(query): Query<LatestQuery>,
) -> Response {
    let parsed = parse_kind(query.kind.as_deref())
        .and_then(|kind| Ok((kind, require_code(query.code.as_deref())?)));
    match parsed {
        Ok((kind, code)) => Json(feeds.latest_production(kind, code).await).into_response(),
        Err(e) => bad_request(e),
    }
}

/// `GET /top-producers?kind=US_STATE&limit=5`
pub async fn get_top_producers(
    State(feeds): State<Arc<EnergyFeeds>>,
    Query(query): Query<TopProducersQuery>,
) -> Response {
    if query.limit == Some(0) {
        return bad_request("`limit` must be at least 1".to_string());
    }
    match parse_kind(query.kind.as_deref()) {
        Ok(kind) => Json(feeds.top_producers(kind, query.limit).await).into_response(),
        Err(e) => bad_request(e),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::clock::ManualClock;
    use crate::config::FeedsConfig;
    use crate::http::{FixtureTransport, HttpResponse};

    const CSV_URL: &str = "http://cer.test/production.csv";

    fn make_test_feeds() -> Arc<EnergyFeeds> {
        let transport = Arc::new(FixtureTransport::new());
        transport.respond(
            CSV_URL,
            HttpResponse::ok(
                "Date,Unit,Region,Type,Value\n\
                 2024-01-01,Cubic meres per day,AB,Light,1000\n\
                 2024-01-01,Cubic meres per day,SK,Light,500\n",
            ),
        );
        let mut config = FeedsConfig::defaults();
        config.cer.csv_url = CSV_URL.to_string();
        config.eia.api_key_env = "ENERGY_FEEDS_TEST_UNSET_VAR".to_string();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        ));
        Arc::new(EnergyFeeds::new(&config, transport, clock))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_feeds());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn regions_returns_catalog() {
        let (status, json) = get_json("/regions?kind=CA_PROVINCE").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"].as_array().map(Vec::len), Some(13));
        assert_eq!(json["provenance"]["cache_policy"], "7 days");
    }

    #[tokio::test]
    async fn production_for_province() {
        let (status, json) = get_json("/production?kind=CA_PROVINCE&code=AB").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["units"], "MBBL/d");
        assert_eq!(json["data"]["series"][0]["period"], "2024-01");
    }

    #[tokio::test]
    async fn reserves_for_province_is_degraded_not_error() {
        let (status, json) = get_json("/reserves?kind=CA_PROVINCE&code=AB").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["error"]["code"], "NOT_AVAILABLE");
    }

    #[tokio::test]
    async fn top_producers_ranks_provinces() {
        let (status, json) = get_json("/top-producers?kind=CA_PROVINCE&limit=1").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json["data"]["rows"].as_array().cloned().unwrap_or_default();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["region"]["code"], "AB");
        assert_eq!(rows[0]["rank"], 1);
    }

    #[tokio::test]
    async fn latest_without_code_returns_400() {
        let (status, json) = get_json("/production/latest?kind=US_STATE").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn inverted_range_returns_400() {
        let (status, _) = get_json("/production?code=TX&start=2024-01&end=2023-01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

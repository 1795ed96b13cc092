//! Source adapter integration tests
//!
//! Each test spins up a local axum server standing in for the real upstream
//! (World Bank API, market chart API) and points the adapter's base URL at
//! it, so transport, schema, and mapping behavior are exercised end to end
//! with no external network.

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use ozdash_common::config::DashConfig;
use ozdash_common::events::SourceLabel;
use ozdash_common::model::{Dataset, SeriesId};
use ozdash_ds::adapters::{AdapterError, MarketAdapter, SourceAdapter, WorldBankAdapter};

/// Serve `app` on an ephemeral local port, returning its base URL
async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config_for(base: &str) -> DashConfig {
    DashConfig {
        world_bank_base: base.to_string(),
        market_base: base.to_string(),
        request_timeout_secs: 5,
        ..DashConfig::default()
    }
}

/// World Bank response shape: `[metadata, observations]`
fn wb_body(observations: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!([{ "page": 1, "pages": 1 }, observations]))
}

async fn world_bank_mock(Path((_country, code)): Path<(String, String)>) -> impl IntoResponse {
    let obs = |pairs: &[(i32, Option<f64>)]| -> serde_json::Value {
        json!(pairs
            .iter()
            .map(|(year, value)| json!({ "date": year.to_string(), "value": value }))
            .collect::<Vec<_>>())
    };

    match code.as_str() {
        // descending date order, as the real API returns
        "NY.GDP.MKTP.CD" => wb_body(obs(&[
            (2024, Some(1.80e12)),
            (2023, Some(1.72e12)),
            (2022, Some(1.69e12)),
            (2021, Some(1.56e12)),
            (2020, Some(1.33e12)),
            (2019, None),
        ])),
        "NY.GDP.MKTP.KD.ZG" => wb_body(obs(&[(2024, Some(3.0)), (2023, Some(2.1))])),
        "SL.UEM.TOTL.ZS" => wb_body(obs(&[(2024, Some(5.0))])),
        "SP.POP.TOTL" => wb_body(obs(&[(2024, Some(26_000_000.0))])),
        "NE.EXP.GNFS.ZS" => wb_body(obs(&[(2024, Some(26.4))])),
        "NE.IMP.GNFS.ZS" => wb_body(obs(&[(2024, Some(21.3))])),
        "FP.CPI.TOTL.ZG" => wb_body(obs(&[(2024, Some(3.8))])),
        "NV.IND.MANF.ZS" => wb_body(obs(&[(2024, Some(5.6))])),
        // unknown indicator: metadata only, null observation array
        _ => Json(json!([{ "page": 1, "pages": 0 }, null])),
    }
}

#[tokio::test]
async fn world_bank_happy_path_rewrites_the_expected_series() {
    let app = Router::new().route("/country/:country/indicator/:code", get(world_bank_mock));
    let base = spawn_upstream(app).await;

    let adapter = WorldBankAdapter::new(&config_for(&base)).unwrap();
    assert_eq!(adapter.label(), SourceLabel::PrimaryApi);

    let mut dataset = Dataset::default();
    let snapshot = dataset.clone();
    let update = adapter.fetch(&snapshot).await.unwrap();

    let ids: Vec<SeriesId> = update.replacements().iter().map(|(id, _)| *id).collect();
    assert!(ids.contains(&SeriesId::QuarterlyRevenue));
    assert!(ids.contains(&SeriesId::QuarterlyProfit));
    assert!(ids.contains(&SeriesId::MonthlyRevenue2024));
    assert!(ids.contains(&SeriesId::MonthlyRevenue2025));
    assert!(ids.contains(&SeriesId::Industries));
    assert!(ids.contains(&SeriesId::Employment));
    assert!(ids.contains(&SeriesId::StateRevenue));
    assert!(ids.contains(&SeriesId::CityBusinesses));

    let revenue = update
        .replacements()
        .iter()
        .find(|(id, _)| *id == SeriesId::QuarterlyRevenue)
        .map(|(_, s)| s)
        .unwrap();
    // nulls dropped, observations resorted ascending, GDP in billions
    assert_eq!(revenue.labels()[0], "Year 2020");
    assert_eq!(revenue.labels()[4], "Year 2024");
    assert_eq!(revenue.defined_values()[4], 1800.0);

    // everything the adapter produced must be committable
    for (id, series) in update.into_replacements() {
        dataset.replace(id, series).unwrap();
    }
}

#[tokio::test]
async fn world_bank_fails_fast_when_one_indicator_errors() {
    async fn flaky(Path((_country, code)): Path<(String, String)>) -> axum::response::Response {
        if code == "SP.POP.TOTL" {
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        } else {
            world_bank_mock(Path(("AUS".to_string(), code))).await.into_response()
        }
    }

    let app = Router::new().route("/country/:country/indicator/:code", get(flaky));
    let base = spawn_upstream(app).await;

    let adapter = WorldBankAdapter::new(&config_for(&base)).unwrap();
    let err = adapter.fetch(&Dataset::default()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Transport(_)), "got {err}");
}

#[tokio::test]
async fn world_bank_rejects_malformed_observation_shape() {
    let app = Router::new().route(
        "/country/:country/indicator/:code",
        get(|| async { Json(json!([{ "page": 1 }, [{ "unexpected": true }]])) }),
    );
    let base = spawn_upstream(app).await;

    let adapter = WorldBankAdapter::new(&config_for(&base)).unwrap();
    let err = adapter.fetch(&Dataset::default()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Schema(_)), "got {err}");
}

#[tokio::test]
async fn world_bank_all_null_observations_yield_empty_update() {
    let app = Router::new().route(
        "/country/:country/indicator/:code",
        get(|| async { Json(json!([{ "page": 1, "pages": 0 }, null])) }),
    );
    let base = spawn_upstream(app).await;

    let adapter = WorldBankAdapter::new(&config_for(&base)).unwrap();
    let update = adapter.fetch(&Dataset::default()).await.unwrap();
    // no indicator data means no series rewritten, but the fetch succeeds
    assert!(update.is_empty());
}

fn market_chart(closes: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!({
        "chart": {
            "result": [{
                "timestamp": [1_735_689_600i64],
                "indicators": { "quote": [{ "close": closes }] }
            }]
        }
    }))
}

#[tokio::test]
async fn market_remaps_quarterly_revenue_from_trailing_closes() {
    let app = Router::new().route(
        "/v8/finance/chart/:symbol",
        get(|| async {
            // nulls are untraded periods and must be dropped first
            market_chart(json!([null, 7100.0, 7200.0, null, 7300.0, 7400.0, 7500.0, 7600.0]))
        }),
    );
    let base = spawn_upstream(app).await;

    let adapter = MarketAdapter::new(&config_for(&base)).unwrap();
    assert_eq!(adapter.label(), SourceLabel::SecondaryApi);

    let snapshot = Dataset::default();
    let update = adapter.fetch(&snapshot).await.unwrap();
    assert_eq!(update.len(), 1);

    let (id, series) = &update.replacements()[0];
    assert_eq!(*id, SeriesId::QuarterlyRevenue);
    // labels come from the snapshot, values from the trailing 5 closes
    assert_eq!(series.labels(), snapshot.get(SeriesId::QuarterlyRevenue).labels());
    assert_eq!(
        series.defined_values(),
        vec![144.0, 146.0, 148.0, 150.0, 152.0]
    );
}

#[tokio::test]
async fn market_with_too_few_closes_is_a_schema_error() {
    let app = Router::new().route(
        "/v8/finance/chart/:symbol",
        get(|| async { market_chart(json!([7000.0, 7100.0, null, 7200.0])) }),
    );
    let base = spawn_upstream(app).await;

    let adapter = MarketAdapter::new(&config_for(&base)).unwrap();
    let err = adapter.fetch(&Dataset::default()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Schema(_)), "got {err}");
}

#[tokio::test]
async fn market_with_missing_result_is_a_schema_error() {
    let app = Router::new().route(
        "/v8/finance/chart/:symbol",
        get(|| async { Json(json!({ "chart": { "result": null } })) }),
    );
    let base = spawn_upstream(app).await;

    let adapter = MarketAdapter::new(&config_for(&base)).unwrap();
    let err = adapter.fetch(&Dataset::default()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Schema(_)), "got {err}");
}

#[tokio::test]
async fn market_http_failure_is_a_transport_error() {
    let app = Router::new().route(
        "/v8/finance/chart/:symbol",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let base = spawn_upstream(app).await;

    let adapter = MarketAdapter::new(&config_for(&base)).unwrap();
    let err = adapter.fetch(&Dataset::default()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Transport(_)), "got {err}");
}

#[tokio::test]
async fn market_replacement_commits_against_the_dataset() {
    let app = Router::new().route(
        "/v8/finance/chart/:symbol",
        get(|| async {
            market_chart(json!([7000.0, 7100.0, 7200.0, 7300.0, 7400.0, 7500.0]))
        }),
    );
    let base = spawn_upstream(app).await;

    let adapter = MarketAdapter::new(&config_for(&base)).unwrap();
    let mut dataset = Dataset::default();
    let snapshot = dataset.clone();

    let update = adapter.fetch(&snapshot).await.unwrap();
    for (id, series) in update.into_replacements() {
        dataset.replace(id, series).unwrap();
    }
    assert_eq!(
        dataset.get(SeriesId::QuarterlyRevenue).defined_values()[4],
        150.0
    );
}

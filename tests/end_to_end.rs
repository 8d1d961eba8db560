//! CSV import through to reports and the HTTP API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::util::ServiceExt;

use shooting_tracker::api::{build_router, state::AppState};
use shooting_tracker::config::{AppConfig, BadDatePolicy};
use shooting_tracker::ingest::{import_csv, ImportOptions};
use shooting_tracker::models::{Gender, GroupStats};
use shooting_tracker::reports::{self, DashboardQuery};
use shooting_tracker::storage::{JsonlStore, RecordStore, StorageConfig};

const CSV: &str = "\
選手名,性別,入部年度,日付,S1,S2,S3,S4,S5,S6,合計点,大会名,識別,種目
山田 太郎,男,2023,2024/05/12,100,100,100,100,100,100,,春季関東大会,Regular,AR60
山田 太郎,男,2023,2024/06/09,101,101,102,102,102,102,,新人戦,Regular,AR60
山田 太郎,男,2023,2024/07/14,100,101,101,101,101,101,,東日本学生,Regular,AR60
佐藤 花子,女,2024,2024/06/09,95,95,95,95,95,95,,新人戦,Regular,AR60
";

fn options() -> ImportOptions {
    ImportOptions {
        bad_date_policy: BadDatePolicy::Today,
        today: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
    }
}

fn open(dir: &std::path::Path) -> JsonlStore {
    JsonlStore::open(StorageConfig::new(dir.to_path_buf())).unwrap()
}

#[tokio::test]
async fn test_import_then_dashboard_stats() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open(tmp.path());
    let config = AppConfig::default();

    let report = import_csv(&store, CSV.as_bytes(), options()).await.unwrap();
    assert_eq!(report.players_created, 2);
    assert_eq!(report.scores_created, 4);

    let dashboard = reports::dashboard(&store, &config, &DashboardQuery::default())
        .await
        .unwrap();

    // 600, 610, 605 over three months
    let ar60_male = dashboard
        .summary
        .iter()
        .find(|s| s.event_name == "AR60" && s.gender == Gender::Male)
        .unwrap();
    assert_eq!(ar60_male.stats, GroupStats { avg: 605.0, max: 610.0, count: 3 });

    let chart = &dashboard.charts[0].chart;
    assert_eq!(chart.labels, vec!["2024/05", "2024/06", "2024/07"]);
    assert_eq!(
        chart.dataset("female").unwrap().data,
        vec![None, Some(570.0), None]
    );
}

#[tokio::test]
async fn test_records_survive_restart() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = open(tmp.path());
        import_csv(&store, CSV.as_bytes(), options()).await.unwrap();
        reports::dashboard_goals(&store, &AppConfig::default())
            .await
            .unwrap();
    }

    let store = open(tmp.path());
    let snapshot = store.snapshot().await.unwrap();
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.scores.len(), 4);
    assert_eq!(snapshot.team_goals.len(), 6);

    // Goals are not recreated on the next dashboard
    reports::dashboard_goals(&store, &AppConfig::default())
        .await
        .unwrap();
    assert_eq!(store.list_team_goals(None).await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_concurrent_dashboards_create_each_goal_once() {
    let tmp = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(open(tmp.path()));
    let config = Arc::new(AppConfig::default());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            reports::dashboard_goals(store.as_ref(), &config).await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().len(), 6);
    }
    assert_eq!(store.list_team_goals(None).await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_player_profile_over_http() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open(tmp.path());
    import_csv(&store, CSV.as_bytes(), options()).await.unwrap();
    let taro = store.find_player_by_name("山田 太郎").await.unwrap().unwrap();

    let app = build_router(AppState::new(Arc::new(store), AppConfig::default()));
    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/players/{}", taro.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    let summary = &json["summary"][0];
    assert_eq!(summary["event_name"], "AR60");
    assert_eq!(summary["max"], 610.0);
    assert_eq!(summary["rank_best"], 1);
    assert_eq!(summary["total_players"], 2);
    assert_eq!(json["progress"]["labels"].as_array().unwrap().len(), 3);
    assert_eq!(json["goals"].as_array().unwrap().len(), 0);
}

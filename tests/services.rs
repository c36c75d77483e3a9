//! Typed service wrappers against a mockito server.

mod common;

use classdesk_client::services::{
    AnalyticsService, Credentials, ProfileService, TrendRange, UploadService,
};
use classdesk_client::session::USER_KEY;
use classdesk_client::{CredentialStore, ErrorClass};
use common::MockServerFixture;
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn test_login_stores_token_and_profile() {
    let mut fx = MockServerFixture::new().await;
    fx.store.clear_session().unwrap();
    let login = fx
        .server
        .mock("POST", "/auth/login")
        .match_body(Matcher::Json(
            json!({"email": "ada@school.test", "password": "hunter2"}),
        ))
        .with_status(200)
        .with_body(r#"{"token": "fresh-token", "user": {"id": 3, "name": "Ada", "email": "ada@school.test"}}"#)
        .create_async()
        .await;
    let me = fx
        .server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer fresh-token")
        .with_status(200)
        .with_body(r#"{"id": 3, "name": "Ada L.", "email": "ada@school.test", "role": "teacher"}"#)
        .create_async()
        .await;
    let profiles = ProfileService::new(&fx.client);

    let user = profiles
        .login(&Credentials {
            email: "ada@school.test".into(),
            password: "hunter2".into(),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "Ada");
    assert_eq!(fx.store.token().as_deref(), Some("fresh-token"));
    assert_eq!(profiles.cached_profile().map(|p| p.id), Some(3));

    let refreshed = profiles.me().await.unwrap();
    assert_eq!(refreshed.role.as_deref(), Some("teacher"));
    assert_eq!(profiles.cached_profile().unwrap().name, "Ada L.");

    login.assert_async().await;
    me.assert_async().await;

    profiles.logout().await.unwrap();
    assert_eq!(fx.store.token(), None);
    assert_eq!(fx.store.get(USER_KEY), None);
}

#[tokio::test]
async fn test_failed_login_keeps_no_token() {
    let mut fx = MockServerFixture::new().await;
    fx.store.clear_session().unwrap();
    fx.mock_json("POST", "/auth/login", 422, r#"{"message": "Wrong email or password"}"#)
        .await;

    let err = ProfileService::new(&fx.client)
        .login(&Credentials {
            email: "ada@school.test".into(),
            password: "nope".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(err.user_message(), "Wrong email or password");
    assert_eq!(fx.store.token(), None);
}

#[tokio::test]
async fn test_analytics_overview_and_wrapped_trends() {
    let mut fx = MockServerFixture::new().await;
    fx.mock_json(
        "GET",
        "/analytics/overview",
        200,
        r#"{"total_submissions": 40, "graded_submissions": 31, "average_score": 7.8, "active_students": 25, "late": 2}"#,
    )
    .await;
    fx.server
        .mock("GET", "/analytics/trends")
        .match_query(Matcher::UrlEncoded("range".into(), "30d".into()))
        .with_status(200)
        .with_body(r#"{"points": [{"date": "2026-09-01", "value": 6.5}, {"date": "2026-09-08", "value": 7.1}]}"#)
        .create_async()
        .await;
    let analytics = AnalyticsService::new(&fx.client);

    let overview = analytics.overview().await.unwrap();
    assert_eq!(overview.graded_submissions, 31);
    assert_eq!(overview.extra.get("late"), Some(&json!(2)));

    let trend = analytics.trends(TrendRange::Month).await.unwrap();
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[1].value, 7.1);
}

#[tokio::test]
async fn test_upload_then_analyze() {
    let mut fx = MockServerFixture::new().await;
    let upload = fx
        .server
        .mock("POST", "/files/upload")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::Regex("filename=\"essay.txt\"".into()))
        .with_status(201)
        .with_body(r#"{"id": "f-1", "filename": "essay.txt", "size": 12}"#)
        .create_async()
        .await;
    let analyze = fx
        .server
        .mock("POST", "/analysis/file")
        .match_body(Matcher::Json(json!({"file_id": "f-1"})))
        .with_status(200)
        .with_body(r#"{"summary": "Clear argument", "score": 8.5, "suggestions": ["Add a conclusion"]}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("essay.txt");
    std::fs::write(&path, "My essay...\n").unwrap();

    let service = UploadService::new(&fx.client);
    let file = service.upload_file(&path, "file").await.unwrap();
    assert_eq!(file.name, "essay.txt");
    let analysis = service.analyze_file(&file.id).await.unwrap();
    assert_eq!(analysis.suggestions, vec!["Add a conclusion".to_string()]);

    upload.assert_async().await;
    analyze.assert_async().await;
}

#[tokio::test]
async fn test_link_analysis_rejects_non_http_links() {
    let fx = MockServerFixture::new().await;
    let err = UploadService::new(&fx.client)
        .analyze_link("ftp://files.school.test/essay.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, classdesk_client::Error::Validation { .. }));
    assert_eq!(err.class(), ErrorClass::Client);
}

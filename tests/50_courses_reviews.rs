mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use devcamper_api::types::{collections, Role};
use serde_json::json;

use common::{TestApp, ADMIN, CODEMASTERS, DEVWORKS, PUBLISHER, PUBLISHER_2, USER, USER_2};

const FRONT_END_COURSE: &str = "5d725a4a7b292f5f8ceff789";
const DEVWORKS_REVIEW_BY_USER: &str = "5d7a514b5d2c12c7449be020";

async fn bootcamp_field(app: &TestApp, id: &str, field: &str) -> Result<serde_json::Value> {
    let doc = app.store().find_by_id(collections::BOOTCAMPS, id).await?;
    Ok(doc.and_then(|d| d.get(field).cloned()).unwrap_or_default())
}

#[tokio::test]
async fn adding_a_course_refreshes_average_cost() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(PUBLISHER, Role::Publisher);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/bootcamps/{}/courses", DEVWORKS),
            Some(&token),
            Some(json!({
                "title": "Mobile Development",
                "description": "React Native and Flutter",
                "weeks": "10",
                "tuition": 12000,
                "minimumSkill": "advanced"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(body["data"]["bootcamp"], DEVWORKS);
    assert_eq!(body["data"]["user"], PUBLISHER);

    // (8000 + 10000 + 12000) / 3 rounded up to the next ten
    assert_eq!(bootcamp_field(&app, DEVWORKS, "averageCost").await?, json!(10000.0));
    Ok(())
}

#[tokio::test]
async fn only_bootcamp_owner_adds_courses() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(PUBLISHER_2, Role::Publisher);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/bootcamps/{}/courses", DEVWORKS),
            Some(&token),
            Some(json!({
                "title": "Rogue course", "description": "d", "weeks": "1",
                "tuition": 1, "minimumSkill": "beginner"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        format!("User {} is not authorized to add a course to bootcamp {}", PUBLISHER_2, DEVWORKS)
    );
    Ok(())
}

#[tokio::test]
async fn invalid_course_payload_is_400() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(PUBLISHER, Role::Publisher);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/bootcamps/{}/courses", DEVWORKS),
            Some(&token),
            Some(json!({"title": "No tuition", "description": "d", "weeks": "1", "minimumSkill": "guru"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn deleting_a_course_recomputes_and_moving_it_is_ignored() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(PUBLISHER, Role::Publisher);
    let uri = format!("/api/v1/courses/{}", FRONT_END_COURSE);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&token), Some(json!({"bootcamp": CODEMASTERS, "weeks": "9"})))
        .await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["data"]["bootcamp"], DEVWORKS);
    assert_eq!(body["data"]["weeks"], "9");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bootcamp_field(&app, DEVWORKS, "averageCost").await?, json!(10000.0));
    Ok(())
}

#[tokio::test]
async fn user_reviews_a_bootcamp_once() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(USER, Role::User);
    let uri = format!("/api/v1/bootcamps/{}/reviews", CODEMASTERS);
    let review = json!({"title": "Solid", "text": "Good mentors", "rating": 8});

    let (status, body) = app.send(Method::POST, &uri, Some(&token), Some(review.clone())).await?;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(bootcamp_field(&app, CODEMASTERS, "averageRating").await?, json!(6.0));

    let (status, body) = app.send(Method::POST, &uri, Some(&token), Some(review)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        format!("The user with ID {} has already reviewed this bootcamp", USER)
    );
    Ok(())
}

#[tokio::test]
async fn publishers_cannot_review() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(PUBLISHER_2, Role::Publisher);
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/bootcamps/{}/reviews", DEVWORKS),
            Some(&token),
            Some(json!({"title": "Mine is better", "text": "...", "rating": 1})),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn rating_outside_range_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let admin = app.token(ADMIN, Role::Admin);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/bootcamps/{}/reviews", DEVWORKS),
            Some(&admin),
            Some(json!({"title": "t", "text": "x", "rating": 11})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
    assert_eq!(body["error"], "Rating must be between 1 and 10");
    Ok(())
}

#[tokio::test]
async fn other_users_review_is_not_editable() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(USER_2, Role::User);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/reviews/{}", DEVWORKS_REVIEW_BY_USER),
            Some(&token),
            Some(json!({"rating": 1})),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(bootcamp_field(&app, DEVWORKS, "averageRating").await?, json!(9.0));
    Ok(())
}

#[tokio::test]
async fn owner_edits_review_and_average_follows() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(USER, Role::User);
    let uri = format!("/api/v1/reviews/{}", DEVWORKS_REVIEW_BY_USER);

    let (status, body) = app.send(Method::PUT, &uri, Some(&token), Some(json!({"rating": 0}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);

    let (status, body) = app.send(Method::PUT, &uri, Some(&token), Some(json!({"rating": 6}))).await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(bootcamp_field(&app, DEVWORKS, "averageRating").await?, json!(8.0));

    let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bootcamp_field(&app, DEVWORKS, "averageRating").await?, json!(10.0));
    Ok(())
}

#[tokio::test]
async fn admin_manages_users_and_emails_stay_unique() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token(ADMIN, Role::Admin);

    let (status, body) = app.send(Method::GET, "/api/v1/users?role=publisher", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["count"], 2);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({"name": "Dup", "email": "user@devcamper.io"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/users/{}", USER_2), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/users/{}", USER_2), Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

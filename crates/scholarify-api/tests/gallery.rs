mod common;

use axum::http::StatusCode;
use serde_json::json;

use scholarify_db::models::GalleryImageFields;

use common::{Call, TestApp, send_to, session_key};

fn add_image(app: &TestApp, title: &str, published: bool) -> i64 {
    app.state
        .db
        .insert_gallery_image(&GalleryImageFields {
            title: title.to_string(),
            caption: String::new(),
            image: format!("gallery/{title}.jpg"),
            is_published: published,
            sort_order: 0,
        })
        .unwrap()
        .id
}

#[tokio::test]
async fn likes_toggle_per_session() {
    let app = TestApp::new();
    let image = add_image(&app, "sunset", true);
    let url = format!("/gallery/{image}/like");
    let a = session_key(1);
    let b = session_key(2);

    let res = app.send(Call::post(&url, json!({})).session(&a)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({"liked": true, "likes": 1}));

    let res = app.send(Call::post(&url, json!({})).session(&b)).await;
    assert_eq!(res.body, json!({"liked": true, "likes": 2}));

    let res = app.send(Call::post(&url, json!({})).session(&a)).await;
    assert_eq!(res.body, json!({"liked": false, "likes": 1}));

    let index = app.send(Call::get("/gallery").session(&b)).await;
    assert_eq!(index.body["images"][0]["liked"], true);
    let index = app.send(Call::get("/gallery").session(&a)).await;
    assert_eq!(index.body["images"][0]["liked"], false);
    assert_eq!(index.body["total_likes"], 1);
}

#[tokio::test]
async fn signed_in_likes_follow_the_user_across_sessions() {
    let app = TestApp::new();
    let account = app.signup("fan").await;
    let image = add_image(&app, "mountain", true);
    let url = format!("/gallery/{image}/like");

    let res = app
        .send(Call::post(&url, json!({})).token(&account.token).session(&session_key(1)))
        .await;
    assert_eq!(res.body["liked"], true);

    let index = app
        .send(Call::get("/gallery").token(&account.token).session(&session_key(2)))
        .await;
    assert_eq!(index.body["images"][0]["liked"], true);

    // The anonymous session that shared the browser did not like it.
    let index = app.send(Call::get("/gallery").session(&session_key(1))).await;
    assert_eq!(index.body["images"][0]["liked"], false);

    let res = app
        .send(Call::post(&url, json!({})).token(&account.token).session(&session_key(2)))
        .await;
    assert_eq!(res.body, json!({"liked": false, "likes": 0}));
}

#[tokio::test]
async fn unpublished_images_are_not_found() {
    let app = TestApp::new();
    let hidden = add_image(&app, "hidden", false);

    let res = app.send(Call::get(&format!("/gallery/{hidden}"))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.send(Call::post(&format!("/gallery/{hidden}/like"), json!({}))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let index = app.send(Call::get("/gallery")).await;
    assert_eq!(index.body["images"], json!([]));
    assert_eq!(index.body["total_views"], 0);
}

#[tokio::test]
async fn each_open_counts_one_view() {
    let app = TestApp::new();
    let image = add_image(&app, "river", true);
    add_image(&app, "lake", true);

    for expected in 1..=3 {
        let res = app.send(Call::get(&format!("/gallery/{image}"))).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["views"], expected);
    }

    let index = app.send(Call::get("/gallery")).await;
    assert_eq!(index.body["total_views"], 3);
    // Newest first.
    assert_eq!(index.body["images"][0]["title"], "lake");
    assert_eq!(index.body["images"][1]["likes"], 0);
}

#[tokio::test]
async fn concurrent_likes_from_one_session_stay_consistent() {
    let app = TestApp::new();
    let image = add_image(&app, "crowd", true);
    let key = session_key(9);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..10 {
        let router = app.router.clone();
        let call = Call::post(&format!("/gallery/{image}/like"), json!({})).session(&key);
        tasks.spawn(async move { send_to(router, call).await.body["liked"].as_bool().unwrap() });
    }

    let mut liked = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap() {
            liked += 1;
        }
    }
    assert_eq!(liked, 5);
    assert_eq!(app.count("SELECT COUNT(*) FROM gallery_likes"), 0);
}

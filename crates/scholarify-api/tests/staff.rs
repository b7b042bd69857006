mod common;

use axum::http::StatusCode;
use chrono::Days;
use serde_json::json;

use scholarify_api::media::MAX_MEDIA_SIZE;
use scholarify_api::today;
use scholarify_db::models::MessageFilter;

use common::{Call, TestApp, TestResponse, session_key};

fn ids(res: &TestResponse) -> Vec<i64> {
    res.body
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

fn contact_body() -> serde_json::Value {
    json!({
        "name": "  Ama  ",
        "email": "ama@example.com",
        "subject": "Partnership",
        "message": "Hello there",
    })
}

#[tokio::test]
async fn contact_form_stores_unread_message() {
    let app = TestApp::new();
    let res = app.send(Call::post("/contact", contact_body())).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.body["id"].is_i64());
    assert!(res.body["detail"].is_string());

    let unread = MessageFilter { is_read: Some(false), ..Default::default() };
    let rows = app.state.db.list_contact_messages(&unread).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Ama");
    assert!(!rows[0].replied);
}

#[tokio::test]
async fn contact_form_validates_input() {
    let app = TestApp::new();
    let mut missing = contact_body();
    missing["message"] = json!("   ");
    let mut bad_email = contact_body();
    bad_email["email"] = json!("ama@");
    let mut long_name = contact_body();
    long_name["name"] = json!("n".repeat(121));
    let mut long_subject = contact_body();
    long_subject["subject"] = json!("s".repeat(201));

    let mut extra_field = contact_body();
    extra_field["extra"] = json!("x");

    for body in [missing, bad_email, long_name, long_subject, extra_field] {
        let res = app.send(Call::post("/contact", body)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{:?}", res.body);
        assert!(res.body["error"].is_string());
    }

    let res = app
        .send(Call::post_raw("/contact", "text/plain", b"hello".to_vec()))
        .await;
    assert_eq!(res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(res.body["error"].is_string());
    assert_eq!(app.count("SELECT COUNT(*) FROM contact_messages"), 0);
}

#[tokio::test]
async fn contact_form_is_rate_limited() {
    let app = TestApp::new();
    for _ in 0..10 {
        let res = app.send(Call::post("/contact", contact_body())).await;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    let res = app.send(Call::post("/contact", contact_body())).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn dashboard_is_staff_only() {
    let app = TestApp::new();
    let user = app.signup("member").await;
    let boss = app.staff("boss").await;

    let res = app.send(Call::get("/dashboard")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = app.send(Call::get("/dashboard").token(&user.token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.send(Call::get("/admin/listings").token(&user.token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let listing = app.listing("Viewed", |f| f.remote = true);
    app.send(Call::get(&format!("/listings/{listing}")).session(&session_key(1)))
        .await;

    let res = app.send(Call::get("/dashboard").token(&boss.token)).await;
    assert_eq!(res.status, StatusCode::OK);
    let stats = &res.body;
    assert_eq!(stats["total_listings"], 1);
    assert_eq!(stats["remote_pct"], 100.0);
    assert_eq!(stats["views_by_day"].as_array().unwrap().len(), 7);
    assert_eq!(stats["views_by_day"][6]["count"], 1);
    assert_eq!(stats["total_listing_views"], 1);
    assert_eq!(stats["top_viewed_listings"][0]["listing"]["id"], listing);
    assert_eq!(stats["gender"]["na"], 2);
    assert!(stats["site_visits_today"].as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn admin_listing_crud_applies_status_rule() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;

    let res = app
        .send(
            Call::post(
                "/admin/listings",
                json!({
                    "type": "SCHOLARSHIP",
                    "title": "Old Grant",
                    "deadline": (today() - Days::new(3)).to_string(),
                    "status": "ACTIVE",
                    "tags": ["funding", " masters "],
                }),
            )
            .token(&boss.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.body["status"], "EXPIRED");
    assert_eq!(res.body["tags"], json!(["funding", "masters"]));
    let id = res.body["id"].as_i64().unwrap();

    // Moving the deadline forward reactivates it.
    let res = app
        .send(
            Call::patch(
                &format!("/admin/listings/{id}"),
                json!({"deadline": (today() + Days::new(30)).to_string(), "title": "New Grant"}),
            )
            .token(&boss.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ACTIVE");
    assert_eq!(res.body["title"], "New Grant");

    let res = app
        .send(Call::patch(&format!("/admin/listings/{id}"), json!({"title": "  "})).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    app.listing("Draft job", |f| f.status = scholarify_types::models::ListingStatus::Draft);
    let res = app
        .send(Call::get("/admin/listings?status=DRAFT").token(&boss.token))
        .await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    let res = app.send(Call::get("/admin/listings").token(&boss.token)).await;
    assert_eq!(res.body.as_array().unwrap().len(), 2);
    let res = app
        .send(Call::get("/admin/listings?status=BOGUS").token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .send(Call::delete(&format!("/admin/listings/{id}")).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let res = app
        .send(Call::delete(&format!("/admin/listings/{id}")).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn media_upload_stores_and_serves_images() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;
    let png = vec![0x89, b'P', b'N', b'G', 1, 2, 3];

    let res = app
        .send(Call::post_raw("/admin/media?kind=gallery", "image/png", png.clone()).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    let path = res.body["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("gallery/") && path.ends_with(".png"));
    assert_eq!(std::fs::read(app.media.path().join(&path)).unwrap(), png);

    let served = app.send(Call::get(res.body["url"].as_str().unwrap())).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.raw, png);

    let res = app
        .send(Call::post_raw("/admin/media?kind=avatars", "image/png", png.clone()).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = app
        .send(Call::post_raw("/admin/media?kind=listings", "text/plain", png).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let res = app
        .send(Call::post_raw("/admin/media?kind=listings", "image/jpeg", Vec::new()).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_uploads_are_refused() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;

    let big = vec![0u8; MAX_MEDIA_SIZE + 1];
    let res = app
        .send(Call::post_raw("/admin/media?kind=gallery", "image/png", big).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(res.body["error"].is_string());
    assert_eq!(std::fs::read_dir(app.media.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn admin_gallery_management() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;

    let res = app
        .send(
            Call::post("/admin/gallery", json!({"title": "Team", "image": "gallery/team.jpg", "order": 2}))
                .token(&boss.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["is_published"], true);
    let first = res.body["id"].as_i64().unwrap();

    let res = app
        .send(
            Call::post("/admin/gallery", json!({"image": "gallery/b.jpg", "order": -1}))
                .token(&boss.token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .send(
            Call::post("/admin/gallery", json!({"image": "gallery/b.jpg", "is_published": false}))
                .token(&boss.token),
        )
        .await;
    let second = res.body["id"].as_i64().unwrap();

    let res = app.send(Call::get("/admin/gallery").token(&boss.token)).await;
    let ids: Vec<i64> = res.body.as_array().unwrap().iter().map(|g| g["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![second, first]);

    let res = app
        .send(
            Call::post("/admin/gallery/publish", json!({"ids": [first, second], "published": true}))
                .token(&boss.token),
        )
        .await;
    assert_eq!(res.body["updated"], 2);
    let public = app.send(Call::get("/gallery")).await;
    assert_eq!(public.body["images"].as_array().unwrap().len(), 2);

    let res = app
        .send(Call::patch(&format!("/admin/gallery/{first}"), json!({"caption": "All of us"})).token(&boss.token))
        .await;
    assert_eq!(res.body["caption"], "All of us");
    assert_eq!(res.body["order"], 2);

    let res = app
        .send(Call::delete(&format!("/admin/gallery/{second}")).token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_message_inbox() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;
    let first = app.send(Call::post("/contact", contact_body())).await.body["id"].as_i64().unwrap();
    let second = app.send(Call::post("/contact", contact_body())).await.body["id"].as_i64().unwrap();

    let res = app.send(Call::get("/admin/messages?unread=true").token(&boss.token)).await;
    assert_eq!(res.body.as_array().unwrap().len(), 2);
    assert_eq!(res.body[0]["id"], second);

    let res = app
        .send(Call::get(&format!("/admin/messages/{first}")).token(&boss.token))
        .await;
    assert_eq!(res.body["is_read"], true);
    let res = app.send(Call::get("/admin/messages?unread=true").token(&boss.token)).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);

    let res = app
        .send(
            Call::post("/admin/messages/actions", json!({"ids": [first, second], "action": "mark_replied"}))
                .token(&boss.token),
        )
        .await;
    assert_eq!(res.body["updated"], 2);
    let res = app.send(Call::get("/admin/messages").token(&boss.token)).await;
    assert!(res.body.as_array().unwrap().iter().all(|m| m["replied"] == true && m["replied_at"].is_string()));

    let res = app
        .send(
            Call::post("/admin/messages/actions", json!({"ids": [first], "action": "archive"}))
                .token(&boss.token),
        )
        .await;
    assert!(res.status.is_client_error());

    let res = app.send(Call::get("/admin/messages/999").token(&boss.token)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_requests_are_not_counted_as_visits() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;
    let visits_before = app.count("SELECT COUNT(*) FROM site_visits");

    app.send(Call::get("/admin/messages").token(&boss.token).session(&session_key(7)))
        .await;
    assert_eq!(app.count("SELECT COUNT(*) FROM site_visits"), visits_before);

    app.send(Call::get("/").session(&session_key(7))).await;
    assert_eq!(app.count("SELECT COUNT(*) FROM site_visits"), visits_before + 1);
}

#[tokio::test]
async fn admin_listing_filters() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;
    let ghana = app.listing("Data Analyst", |f| {
        f.country = "Ghana".into();
        f.city = "Accra".into();
        f.is_verified = true;
    });
    let kenya = app.listing("Field Officer", |f| {
        f.country = "Kenya".into();
        f.remote = true;
        f.is_featured = true;
    });

    for (uri, expected) in [
        ("/admin/listings?country=kenya", vec![kenya]),
        ("/admin/listings?is_verified=true", vec![ghana]),
        ("/admin/listings?is_featured=1&remote=yes", vec![kenya]),
        ("/admin/listings?remote=false", vec![ghana]),
        ("/admin/listings?q=ghana", vec![ghana]),
        ("/admin/listings?q=accra", vec![]),
    ] {
        let res = app.send(Call::get(uri).token(&boss.token)).await;
        assert_eq!(res.status, StatusCode::OK, "{uri}");
        assert_eq!(ids(&res), expected, "{uri}");
    }

    let res = app
        .send(Call::get("/admin/listings?remote=sometimes").token(&boss.token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["error"].is_string());
}

#[tokio::test]
async fn admin_message_and_gallery_search() {
    let app = TestApp::new();
    let boss = app.staff("boss").await;

    let mut body = contact_body();
    body["name"] = json!("Kofi");
    body["email"] = json!("kofi@example.com");
    body["message"] = json!("Deck attached");
    let kofi = app.send(Call::post("/contact", body)).await.body["id"].as_i64().unwrap();
    let ama = app.send(Call::post("/contact", contact_body())).await.body["id"].as_i64().unwrap();
    app.send(
        Call::post("/admin/messages/actions", json!({"ids": [kofi], "action": "mark_replied"}))
            .token(&boss.token),
    )
    .await;

    for (uri, expected) in [
        ("/admin/messages?q=kofi", vec![kofi]),
        ("/admin/messages?q=HELLO", vec![ama]),
        ("/admin/messages?q=partnership", vec![ama, kofi]),
        ("/admin/messages?replied=true", vec![kofi]),
        ("/admin/messages?replied=false&unread=true", vec![ama]),
    ] {
        let res = app.send(Call::get(uri).token(&boss.token)).await;
        assert_eq!(res.status, StatusCode::OK, "{uri}");
        assert_eq!(ids(&res), expected, "{uri}");
    }

    let stage = app
        .send(
            Call::post(
                "/admin/gallery",
                json!({"title": "Awards", "caption": "Scholars on stage", "image": "gallery/a.jpg"}),
            )
            .token(&boss.token),
        )
        .await
        .body["id"]
        .as_i64()
        .unwrap();
    app.send(Call::post("/admin/gallery", json!({"title": "Campus", "image": "gallery/c.jpg"})).token(&boss.token))
        .await;

    let res = app.send(Call::get("/admin/gallery?q=STAGE").token(&boss.token)).await;
    assert_eq!(ids(&res), vec![stage]);
    let res = app.send(Call::get("/admin/gallery?q=awards").token(&boss.token)).await;
    assert_eq!(ids(&res), vec![stage]);
    let res = app.send(Call::get("/admin/gallery").token(&boss.token)).await;
    assert_eq!(ids(&res).len(), 2);
}

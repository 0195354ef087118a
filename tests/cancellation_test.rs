mod common;

use actix_web::{http::header, test};
use serde_json::{json, Value};

use common::{
    admin_token, booking_id, card_booking_body, cash_booking_body, days_from_now,
    get_other_user_id, get_test_user_id, user_token, TestApp, PRICEY_TOUR_ID,
};
use chrono::Utc;
use wayfare_api::models::bookings::BookingStatus;
use wayfare_api::services::booking_service::CreateBookingRequest;
use wayfare_api::services::notification_service::NotificationKind;

/// Books the 1000/person tour, paid by card, starting `days` from now.
async fn paid_booking(test_app: &TestApp, days: i64) -> Value {
    let request: CreateBookingRequest = serde_json::from_value(card_booking_body(
        PRICEY_TOUR_ID,
        &days_from_now(days),
        1000.0,
        &format!("pi_{}", days),
    ))
    .unwrap();
    let booking = test_app
        .service
        .create_booking(&get_test_user_id(), request, Utc::now())
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    serde_json::to_value(booking).unwrap()
}

#[actix_rt::test]
async fn test_cancel_five_days_out_refunds_half() {
    let test_app = TestApp::untaxed();
    let app = test::init_service(test_app.create_app()).await;
    let booking = paid_booking(&test_app, 5).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/cancel", booking_id(&booking)))
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(json!({ "reason": "change of plans" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let cancelled: Value = test::read_body_json(resp).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["refund_amount"], json!(500.0));
    assert_eq!(cancelled["cancellation_reason"], "change of plans");
    assert_eq!(cancelled["booking_reference"], booking["booking_reference"]);

    actix_rt::time::sleep(std::time::Duration::from_millis(50)).await;
    let sent = test_app.notifier.sent.lock().unwrap().clone();
    assert!(sent
        .iter()
        .any(|(_, kind)| *kind == NotificationKind::BookingCancellation));
}

#[actix_rt::test]
async fn test_refund_tiers_by_lead_time() {
    let test_app = TestApp::untaxed();
    let app = test::init_service(test_app.create_app()).await;

    for (days, refund) in [(30, 900.0), (7, 500.0), (3, 250.0), (2, 250.0)] {
        let booking = paid_booking(&test_app, days).await;
        let req = test::TestRequest::patch()
            .uri(&format!("/api/bookings/{}/cancel", booking_id(&booking)))
            .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
            .to_request();
        let cancelled: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cancelled["refund_amount"], json!(refund), "{} days out", days);
    }
}

#[actix_rt::test]
async fn test_cancel_twice_is_idempotent() {
    let test_app = TestApp::untaxed();
    let app = test::init_service(test_app.create_app()).await;
    let booking = paid_booking(&test_app, 10).await;
    let uri = format!("/api/bookings/{}/cancel", booking_id(&booking));

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let second: Value = test::read_body_json(resp).await;

    assert_eq!(first, second);
}

#[actix_rt::test]
async fn test_cancel_inside_cutoff_is_rejected() {
    let test_app = TestApp::untaxed();
    let app = test::init_service(test_app.create_app()).await;
    let booking = paid_booking(&test_app, 1).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/cancel", booking_id(&booking)))
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_cancellable");
}

#[actix_rt::test]
async fn test_pending_booking_is_not_cancellable() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(cash_booking_body(&days_from_now(30)))
        .to_request();
    let booking: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/cancel", booking_id(&booking)))
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

#[actix_rt::test]
async fn test_cannot_cancel_someone_elses_booking() {
    let test_app = TestApp::untaxed();
    let app = test::init_service(test_app.create_app()).await;
    let booking = paid_booking(&test_app, 10).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/cancel", booking_id(&booking)))
        .insert_header((header::AUTHORIZATION, user_token(&get_other_user_id())))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_operator_cancellation_follows_the_same_rules() {
    let test_app = TestApp::untaxed();
    let app = test::init_service(test_app.create_app()).await;

    let late = paid_booking(&test_app, 1).await;
    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/bookings/{}/status", booking_id(&late)))
        .insert_header((header::AUTHORIZATION, admin_token()))
        .set_json(json!({ "status": "cancelled" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let early = paid_booking(&test_app, 10).await;
    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/bookings/{}/status", booking_id(&early)))
        .insert_header((header::AUTHORIZATION, admin_token()))
        .set_json(json!({ "status": "cancelled" }))
        .to_request();
    let cancelled: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["refund_amount"], json!(900.0));
}

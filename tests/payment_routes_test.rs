mod common;

use actix_web::{http::header, test};
use serde_json::{json, Value};

use chrono::Utc;
use wayfare_api::services::booking_service::CreateBookingRequest;

use common::{
    call_status,
    admin_token, booking_id, cash_booking_body, days_from_now, get_other_user_id, get_test_user_id,
    user_token, TestApp, TOUR_ID,
};

#[actix_rt::test]
async fn test_payment_intent_without_auth() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/payments/intent")
        .set_json(json!({ "tour_id": TOUR_ID, "adults": 1 }))
        .to_request();
    assert_eq!(call_status(&app, req).await, 401);
}

#[actix_rt::test]
async fn test_payment_intent_uses_server_total() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/payments/intent")
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(json!({
            "tour_id": TOUR_ID,
            "adults": 2,
            "children": 1,
            "room_preference": "double",
            "amount": 1
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["payment_intent"]["payment_intent_id"], "pi_test_123");
    assert_eq!(body["payment_intent"]["amount"], json!(409.5));
    assert_eq!(body["payment_intent"]["currency"], "usd");
    assert_eq!(body["pricing"]["total"], json!(409.5));
}

#[actix_rt::test]
async fn test_payment_intent_for_unknown_subject() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/payments/intent")
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(json!({ "destination_id": "missing", "adults": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

async fn pending_booking(test_app: &TestApp) -> Value {
    let request: CreateBookingRequest =
        serde_json::from_value(cash_booking_body(&days_from_now(30))).unwrap();
    let booking = test_app
        .service
        .create_booking(&get_test_user_id(), request, Utc::now())
        .await
        .unwrap();
    serde_json::to_value(booking).unwrap()
}

fn payment(outcome: &str, amount: f64, reference: &str) -> Value {
    json!({
        "payment_method": "card",
        "payment": {
            "outcome": outcome,
            "reference": reference,
            "amount": amount,
            "currency": "USD"
        }
    })
}

#[actix_rt::test]
async fn test_deferred_payment_confirms_booking() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let booking = pending_booking(&test_app).await;
    let uri = format!("/api/bookings/{}/payment", booking_id(&booking));

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(payment("succeeded", 409.5, "pi_later_1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let paid: Value = test::read_body_json(resp).await;
    assert_eq!(paid["status"], "confirmed");
    assert_eq!(paid["payment_status"], "paid");
    assert_eq!(paid["payment_method"], "card");
    assert_eq!(paid["payment_reference"], "pi_later_1");
    assert_eq!(paid["currency"], "usd");
    assert_eq!(paid["total_price"], booking["total_price"]);

    // Replaying the same confirmation changes nothing
    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(payment("succeeded", 409.5, "pi_later_1"))
        .to_request();
    let replay: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(replay, paid);
}

#[actix_rt::test]
async fn test_failed_payment_keeps_booking_pending() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let booking = pending_booking(&test_app).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/payment", booking_id(&booking)))
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(payment("failed", 409.5, "pi_declined_1"))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(updated["status"], "pending");
    assert_eq!(updated["payment_status"], "failed");
    assert_eq!(updated["payment_method"], "cash");
}

#[actix_rt::test]
async fn test_deferred_payment_amount_mismatch() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let booking = pending_booking(&test_app).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/payment", booking_id(&booking)))
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(payment("succeeded", 400.0, "pi_short_2"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["support_required"], true);
    assert_eq!(body["payment_reference"], "pi_short_2");
}

#[actix_rt::test]
async fn test_cannot_pay_for_someone_elses_booking() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let booking = pending_booking(&test_app).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/payment", booking_id(&booking)))
        .insert_header((header::AUTHORIZATION, user_token(&get_other_user_id())))
        .set_json(payment("succeeded", 409.5, "pi_other_1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_payment_after_operator_confirmation_needs_support() {
    let test_app = TestApp::new();
    let app = test::init_service(test_app.create_app()).await;
    let booking = pending_booking(&test_app).await;
    let id = booking_id(&booking);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/bookings/{}/status", id))
        .insert_header((header::AUTHORIZATION, admin_token()))
        .set_json(json!({ "status": "confirmed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/payment", id))
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(payment("succeeded", 409.5, "pi_late_1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "payment_reconciliation_error");
    assert_eq!(body["support_required"], true);
    assert_eq!(body["payment_reference"], "pi_late_1");

    // Nothing was captured, so this is just a bad request
    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/payment", id))
        .insert_header((header::AUTHORIZATION, user_token(&get_test_user_id())))
        .set_json(payment("failed", 409.5, "pi_late_2"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

use super::*;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use shared::error::{ApiError, ErrorCode};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    confirms: Arc<Mutex<Vec<ConfirmSignUpRequest>>>,
    resends: Arc<Mutex<Vec<ResendSignUpCodeRequest>>>,
}

async fn handle_confirm(
    State(state): State<ServerState>,
    Json(body): Json<ConfirmSignUpRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let accepted = body.confirmation_code == "123456";
    state.confirms.lock().await.push(body);
    if accepted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::CodeMismatch,
                "Invalid verification code provided, please try again.",
            )),
        ))
    }
}

async fn handle_resend(
    State(state): State<ServerState>,
    Json(body): Json<ResendSignUpCodeRequest>,
) -> StatusCode {
    state.resends.lock().await.push(body);
    StatusCode::OK
}

async fn handle_sign_up(Json(body): Json<SignUpRequest>) -> Json<SignUpResponse> {
    Json(SignUpResponse {
        user_confirmed: body.email.ends_with("@confirmed.test"),
    })
}

async fn handle_sign_in() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream unavailable")
}

async fn spawn_auth_server() -> (HttpAuthService, ServerState) {
    let state = ServerState::default();
    let app = Router::new()
        .route("/auth/confirm-sign-up", post(handle_confirm))
        .route("/auth/resend-sign-up-code", post(handle_resend))
        .route("/auth/sign-up", post(handle_sign_up))
        .route("/auth/sign-in", post(handle_sign_in))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let base = parse_base_url(&format!("http://{addr}")).expect("base url");
    (HttpAuthService::with_client(Client::new(), base), state)
}

#[tokio::test]
async fn confirm_sign_up_posts_username_and_code() {
    let (auth, state) = spawn_auth_server().await;

    auth.confirm_sign_up(ConfirmSignUpRequest {
        username: "user@example.com".into(),
        confirmation_code: "123456".into(),
    })
    .await
    .expect("confirm");

    let confirms = state.confirms.lock().await;
    assert_eq!(
        confirms.as_slice(),
        &[ConfirmSignUpRequest {
            username: "user@example.com".into(),
            confirmation_code: "123456".into(),
        }]
    );
}

#[tokio::test]
async fn confirm_sign_up_surfaces_api_error_message() {
    let (auth, _state) = spawn_auth_server().await;

    let err = auth
        .confirm_sign_up(ConfirmSignUpRequest {
            username: "user@example.com".into(),
            confirmation_code: "654321".into(),
        })
        .await
        .expect_err("mismatch");

    match &err {
        ClientError::Api(api) => assert_eq!(api.code, ErrorCode::CodeMismatch),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.user_message(),
        "Invalid verification code provided, please try again."
    );
}

#[tokio::test]
async fn resend_posts_email() {
    let (auth, state) = spawn_auth_server().await;
    auth.resend_sign_up_code("user@example.com")
        .await
        .expect("resend");

    let resends = state.resends.lock().await;
    assert_eq!(resends.len(), 1);
    assert_eq!(resends[0].email, "user@example.com");
}

#[tokio::test]
async fn sign_up_reports_confirmation_state() {
    let (auth, _state) = spawn_auth_server().await;
    let pending = auth
        .sign_up("user@example.com", "hunter22")
        .await
        .expect("sign up");
    assert!(!pending.user_confirmed);
}

#[tokio::test]
async fn non_json_error_bodies_keep_status() {
    let (auth, _state) = spawn_auth_server().await;
    let err = auth
        .sign_in("user@example.com", "hunter22")
        .await
        .expect_err("bad gateway");
    match err {
        ClientError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn context_tracks_loading_and_last_error() {
    let context = AuthContext::new();
    context.begin();
    assert!(context.snapshot().loading);

    let failed: ClientResult<()> = Err(ClientError::GraphQl("boom".into()));
    context.settle(&failed);
    assert_eq!(
        context.snapshot(),
        AuthSnapshot {
            loading: false,
            error: Some("boom".into()),
        }
    );

    context.begin();
    assert_eq!(context.snapshot().error, None);
    context.settle(&Ok(()));
    assert_eq!(context.snapshot(), AuthSnapshot::default());
}

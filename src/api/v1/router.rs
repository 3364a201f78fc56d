use super::error::*;
use super::handler;
use crate::application_port::{TokenClaims, TokenCodec};
use crate::domain_model::RoleKind;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let auth = warp::path("users").and(warp::path("auth"));

    let register_user = warp::post()
        .and(auth.clone())
        .and(warp::path("register-user"))
        .and(warp::path::end())
        .and(json_body::<handler::RegisterRequest>())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register_user);

    let register_admin = warp::post()
        .and(auth.clone())
        .and(warp::path("register-admin"))
        .and(warp::path::end())
        .and(admin_registration_guard(
            server.token_codec.clone(),
            server.open_admin_registration,
        ))
        .and(json_body::<handler::RegisterRequest>())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register_admin);

    let login = warp::post()
        .and(auth.clone())
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(json_body::<handler::LoginRequest>())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let list_users = warp::get()
        .and(warp::path("users"))
        .and(warp::path::end())
        .and(with_role(server.token_codec.clone(), RoleKind::Admin))
        .and(with(server.user_service.clone()))
        .and_then(handler::list_users);

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .and_then(handler::health);

    register_user
        .or(register_admin)
        .or(login)
        .or(list_users)
        .or(health)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

async fn verify_bearer(
    token_codec: &dyn TokenCodec,
    header: &str,
) -> Result<TokenClaims, warp::Rejection> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| reject::custom(ApiErrorCode::InvalidToken))?;
    token_codec
        .decode(token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)
}

fn with_role(
    token_codec: Arc<dyn TokenCodec>,
    role: RoleKind,
) -> impl Filter<Extract = (TokenClaims,), Error = warp::Rejection> + Clone {
    warp::header::<String>("authorization").and_then(move |header: String| {
        let token_codec = token_codec.clone();
        async move {
            let claims = verify_bearer(token_codec.as_ref(), &header).await?;
            if claims.has_role(role) {
                Ok(claims)
            } else {
                Err(reject::custom(ApiErrorCode::Forbidden))
            }
        }
    })
}

/// Lets admin registration through when it is open, otherwise only for
/// callers already holding ROLE_ADMIN.
fn admin_registration_guard(
    token_codec: Arc<dyn TokenCodec>,
    open: bool,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and_then(move |header: Option<String>| {
            let token_codec = token_codec.clone();
            async move {
                if open {
                    return Ok::<(), warp::Rejection>(());
                }
                let header = header.ok_or_else(|| reject::custom(ApiErrorCode::InvalidToken))?;
                let claims = verify_bearer(token_codec.as_ref(), &header).await?;
                if claims.has_role(RoleKind::Admin) {
                    Ok(())
                } else {
                    Err(reject::custom(ApiErrorCode::Forbidden))
                }
            }
        })
        .untuple_one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1::recover_error;
    use crate::application_impl::{JwtCodec, JwtConfig, SigningKey};
    use crate::application_port::RegisterInput;
    use crate::infra_memory::{MemoryRoleRepo, MemoryUserRepo};
    use chrono::TimeDelta;
    use serde_json::{Value, json};
    use warp::http::StatusCode;

    fn server(open_admin_registration: bool) -> Arc<Server> {
        let codec = JwtCodec::try_new(JwtConfig {
            issuer: "warden.test".to_string(),
            audience: "warden-clients".to_string(),
            ttl: TimeDelta::hours(1),
            signing_key: SigningKey::Hs256 {
                secret: b"router-secret".to_vec(),
            },
        })
        .unwrap();
        Arc::new(Server::from_parts(
            Arc::new(MemoryUserRepo::new()),
            Arc::new(MemoryRoleRepo::seeded()),
            Arc::new(codec),
            open_admin_registration,
        ))
    }

    fn api(
        server: Arc<Server>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone + 'static {
        routes(server).recover(recover_error)
    }

    async fn post(server: &Arc<Server>, path: &str, body: Value) -> (StatusCode, Value) {
        let res = warp::test::request()
            .method("POST")
            .path(path)
            .json(&body)
            .reply(&api(server.clone()))
            .await;
        (res.status(), serde_json::from_slice(res.body()).unwrap())
    }

    async fn get(server: &Arc<Server>, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = warp::test::request().method("GET").path(path);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let res = req.reply(&api(server.clone())).await;
        (res.status(), serde_json::from_slice(res.body()).unwrap())
    }

    async fn seed_admin(server: &Arc<Server>) -> String {
        server
            .auth_service
            .register(
                RegisterInput {
                    username: "root".to_string(),
                    password: "rootpw".to_string(),
                    email: "root@example.com".to_string(),
                },
                RoleKind::Admin,
            )
            .await
            .unwrap();
        let (_, body) = post(
            server,
            "/users/auth/login",
            json!({"username": "root", "password": "rootpw"}),
        )
        .await;
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_duplicate_and_login() {
        let server = server(false);
        let alice = json!({"username": "alice", "password": "secret1", "email": "a@example.com"});

        let (status, body) = post(&server, "/users/auth/register-user", alice.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "User registered successfully");

        let again = json!({"username": "alice", "password": "other", "email": "a@example.com"});
        let (status, body) = post(&server, "/users/auth/register-user", again).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "UsernameTaken");

        let (status, body) = post(
            &server,
            "/users/auth/login",
            json!({"username": "alice", "password": "secret1"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["roles"], json!(["ROLE_USER"]));

        let token = body["data"]["token"].as_str().unwrap();
        let claims = server.token_codec.decode(token).await.unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec!["ROLE_USER".to_string()]);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let server = server(false);
        post(
            &server,
            "/users/auth/register-user",
            json!({"username": "alice", "password": "secret1", "email": "a@example.com"}),
        )
        .await;

        let wrong = post(
            &server,
            "/users/auth/login",
            json!({"username": "alice", "password": "wrong"}),
        )
        .await;
        let ghost = post(
            &server,
            "/users/auth/login",
            json!({"username": "nobody", "password": "wrong"}),
        )
        .await;

        assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, ghost);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let server = server(false);
        let (status, body) = post(
            &server,
            "/users/auth/register-user",
            json!({"username": "alice"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    async fn rejected_body_status(req: warp::test::RequestBuilder) -> StatusCode {
        let rejection = match req.filter(&json_body::<handler::LoginRequest>()).await {
            Ok(_) => panic!("body filter should reject"),
            Err(rejection) => rejection,
        };
        let reply = recover_error(rejection).await.unwrap();
        warp::Reply::into_response(reply).status()
    }

    #[tokio::test]
    async fn missing_length_or_wrong_media_type_is_bad_request() {
        let no_length = warp::test::request().method("POST");
        assert_eq!(rejected_body_status(no_length).await, StatusCode::BAD_REQUEST);

        let text = warp::test::request()
            .method("POST")
            .header("content-type", "text/plain")
            .body("username=alice");
        assert_eq!(rejected_body_status(text).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_users_requires_an_admin_token() {
        let server = server(false);
        post(
            &server,
            "/users/auth/register-user",
            json!({"username": "alice", "password": "secret1", "email": "a@example.com"}),
        )
        .await;
        let (_, body) = post(
            &server,
            "/users/auth/login",
            json!({"username": "alice", "password": "secret1"}),
        )
        .await;
        let user_token = body["data"]["token"].as_str().unwrap().to_string();
        let admin_token = seed_admin(&server).await;

        let (status, _) = get(&server, "/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get(&server, "/users", Some("garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = get(&server, "/users", Some(&user_token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "Forbidden");

        let (status, body) = get(&server, "/users", Some(&admin_token)).await;
        assert_eq!(status, StatusCode::OK);
        let users = body["data"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn closed_admin_registration_needs_admin_token() {
        let server = server(false);
        let carol = json!({"username": "carol", "password": "pw", "email": "c@example.com"});

        let (status, _) = post(&server, "/users/auth/register-admin", carol.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let admin_token = seed_admin(&server).await;
        let res = warp::test::request()
            .method("POST")
            .path("/users/auth/register-admin")
            .header("authorization", format!("Bearer {admin_token}"))
            .json(&carol)
            .reply(&api(server.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["data"], "Admin registered successfully");
    }

    #[tokio::test]
    async fn open_admin_registration_issues_admin_role() {
        let server = server(true);
        let (status, _) = post(
            &server,
            "/users/auth/register-admin",
            json!({"username": "root", "password": "pw", "email": "r@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = post(
            &server,
            "/users/auth/login",
            json!({"username": "root", "password": "pw"}),
        )
        .await;
        assert_eq!(body["data"]["roles"], json!(["ROLE_ADMIN"]));
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let server = server(false);
        let (status, body) = get(&server, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "ok");
    }
}

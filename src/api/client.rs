use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::types::*;
use super::PrivacyApi;
use crate::config::ApiConfig;
use crate::error::PrivacyError;
use crate::models::{ArcoRequestId, PatientId};

/// reqwest-backed client for the privacy endpoints.
pub struct HttpPrivacyApi {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpPrivacyApi {
    pub fn new(config: &ApiConfig) -> Result<Self, PrivacyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| PrivacyError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, PrivacyError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, PrivacyError> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PrivacyError::Decode(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> PrivacyError {
    if e.is_timeout() {
        PrivacyError::Network("Request timed out".into())
    } else if e.is_connect() {
        PrivacyError::Network(format!("Connection failed: {e}"))
    } else {
        PrivacyError::Network(e.to_string())
    }
}

fn status_error(status: StatusCode, body: String) -> PrivacyError {
    match status {
        StatusCode::UNAUTHORIZED => PrivacyError::AuthExpired,
        s if s.is_server_error() => PrivacyError::Server { status: s.as_u16() },
        s => PrivacyError::UnexpectedStatus {
            status: s.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl PrivacyApi for HttpPrivacyApi {
    async fn consent_status(
        &self,
        patient_id: PatientId,
    ) -> Result<ConsentStatusResponse, PrivacyError> {
        let builder = self.request(
            Method::GET,
            &format!("/privacy/consent-status/{patient_id}"),
        );
        match self.send_json(builder).await {
            Err(PrivacyError::UnexpectedStatus { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Err(PrivacyError::NoConsentYet)
            }
            other => other,
        }
    }

    async fn send_notice(
        &self,
        request: &SendNoticeRequest,
    ) -> Result<SendNoticeResponse, PrivacyError> {
        let builder = self
            .request(Method::POST, "/privacy/send-whatsapp-notice")
            .json(request);
        self.send_json(builder).await
    }

    async fn revoke(&self, request: &RevokeRequest) -> Result<(), PrivacyError> {
        let builder = self.request(Method::POST, "/privacy/revoke").json(request);
        self.send(builder).await.map(|_| ())
    }

    async fn arco_requests(
        &self,
        patient_id: PatientId,
    ) -> Result<ArcoListResponse, PrivacyError> {
        let builder = self.request(
            Method::GET,
            &format!("/privacy/arco-requests/{patient_id}"),
        );
        self.send_json(builder).await
    }

    async fn create_arco_request(
        &self,
        request: &CreateArcoRequest,
    ) -> Result<ArcoResponse, PrivacyError> {
        let builder = self
            .request(Method::POST, "/privacy/arco-request")
            .json(request);
        self.send_json(builder).await
    }

    async fn update_arco_request(
        &self,
        id: ArcoRequestId,
        request: &UpdateArcoRequest,
    ) -> Result<ArcoResponse, PrivacyError> {
        let builder = self
            .request(Method::PUT, &format!("/privacy/arco-request/{id}"))
            .json(request);
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::models::{ArcoRequestType, ArcoStatus, ConsentMethod};

    const TOKEN: &str = "test-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v == format!("Bearer {TOKEN}"))
    }

    async fn consent_status(Path(patient_id): Path<i64>, headers: HeaderMap) -> impl IntoResponse {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        match patient_id {
            7 => Json(json!({
                "hasConsent": true,
                "consent": {
                    "patientId": 7,
                    "status": "accepted",
                    "consentGiven": true,
                    "consentDate": "2024-01-01T10:00:00Z"
                }
            }))
            .into_response(),
            403 => AxumStatus::FORBIDDEN.into_response(),
            404 => AxumStatus::NOT_FOUND.into_response(),
            418 => (AxumStatus::IM_A_TEAPOT, "teapot").into_response(),
            503 => AxumStatus::SERVICE_UNAVAILABLE.into_response(),
            _ => (AxumStatus::OK, "not json").into_response(),
        }
    }

    async fn send_notice(Json(body): Json<SendNoticeRequest>) -> impl IntoResponse {
        Json(json!({
            "consent": {
                "patientId": body.patient_id,
                "method": body.method,
                "status": "sent",
                "sentAt": "2024-05-01T10:00:00Z"
            }
        }))
    }

    async fn revoke(Json(body): Json<RevokeRequest>) -> impl IntoResponse {
        if body.revocation_reason.is_empty() {
            AxumStatus::BAD_REQUEST
        } else {
            AxumStatus::NO_CONTENT
        }
    }

    async fn arco_list(Path(patient_id): Path<i64>) -> impl IntoResponse {
        Json(json!({
            "arcoRequests": [{
                "id": 1,
                "patientId": patient_id,
                "requestType": "access",
                "description": "Copia del expediente",
                "status": "pending",
                "requestedAt": "2024-03-04T09:00:00Z"
            }]
        }))
    }

    async fn arco_create(Json(body): Json<CreateArcoRequest>) -> impl IntoResponse {
        Json(json!({
            "arcoRequest": {
                "id": 99,
                "patientId": body.patient_id,
                "requestType": body.request_type,
                "description": body.description,
                "contactEmail": body.contact_email,
                "status": "pending",
                "requestedAt": "2024-03-04T09:00:00Z"
            }
        }))
    }

    async fn arco_update(Path(id): Path<i64>, Json(body): Json<UpdateArcoRequest>) -> impl IntoResponse {
        Json(json!({
            "arcoRequest": {
                "id": id,
                "patientId": 3,
                "requestType": "access",
                "description": "Copia del expediente",
                "status": body.status,
                "requestedAt": "2024-03-04T09:00:00Z",
                "resolvedAt": "2024-03-10T09:00:00Z",
                "resolutionNotes": body.resolution_notes
            }
        }))
    }

    async fn start_server() -> String {
        let app = Router::new()
            .route("/privacy/consent-status/:patient_id", get(consent_status))
            .route("/privacy/send-whatsapp-notice", post(send_notice))
            .route("/privacy/revoke", post(revoke))
            .route("/privacy/arco-requests/:patient_id", get(arco_list))
            .route("/privacy/arco-request", post(arco_create))
            .route("/privacy/arco-request/:id", put(arco_update));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn client() -> HttpPrivacyApi {
        let base = start_server().await;
        HttpPrivacyApi::new(&ApiConfig::new(&base).with_token(TOKEN)).unwrap()
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let api = HttpPrivacyApi::new(&ApiConfig::new("http://localhost:3000/api/")).unwrap();
        assert_eq!(api.base_url(), "http://localhost:3000/api");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            PrivacyError::AuthExpired
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, String::new()),
            PrivacyError::Server { status: 502 }
        );
        assert_eq!(
            status_error(StatusCode::CONFLICT, "dup".into()),
            PrivacyError::UnexpectedStatus {
                status: 409,
                body: "dup".into()
            }
        );
    }

    #[tokio::test]
    async fn consent_status_parses_record() {
        let api = client().await;
        let response = api.consent_status(7).await.unwrap();
        assert!(response.has_consent);
        assert_eq!(response.consent.unwrap().consent_given, Some(true));
    }

    #[tokio::test]
    async fn forbidden_and_not_found_mean_no_consent_yet() {
        let api = client().await;
        assert_eq!(api.consent_status(403).await.unwrap_err(), PrivacyError::NoConsentYet);
        assert_eq!(api.consent_status(404).await.unwrap_err(), PrivacyError::NoConsentYet);
    }

    #[tokio::test]
    async fn unexpected_status_is_an_error() {
        let api = client().await;
        match api.consent_status(418).await.unwrap_err() {
            PrivacyError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 418);
                assert_eq!(body, "teapot");
            }
            other => panic!("Expected UnexpectedStatus, got: {other}"),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_server() {
        let api = client().await;
        assert_eq!(
            api.consent_status(503).await.unwrap_err(),
            PrivacyError::Server { status: 503 }
        );
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let api = client().await;
        assert!(matches!(
            api.consent_status(1).await.unwrap_err(),
            PrivacyError::Decode(_)
        ));
    }

    #[tokio::test]
    async fn missing_token_maps_to_auth_expired() {
        let base = start_server().await;
        let api = HttpPrivacyApi::new(&ApiConfig::new(&base)).unwrap();
        assert_eq!(api.consent_status(7).await.unwrap_err(), PrivacyError::AuthExpired);
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpPrivacyApi::new(&ApiConfig::new(&format!("http://{addr}"))).unwrap();
        assert!(matches!(
            api.consent_status(7).await.unwrap_err(),
            PrivacyError::Network(_)
        ));
    }

    #[tokio::test]
    async fn send_notice_round_trip() {
        let api = client().await;
        let response = api
            .send_notice(&SendNoticeRequest {
                patient_id: 3,
                method: ConsentMethod::MessagingButton,
            })
            .await
            .unwrap();
        let consent = response.consent.unwrap();
        assert_eq!(consent.patient_id, 3);
        assert_eq!(consent.status.as_deref(), Some("sent"));
    }

    #[tokio::test]
    async fn revoke_accepts_empty_ack() {
        let api = client().await;
        api.revoke(&RevokeRequest {
            patient_id: 3,
            revocation_reason: "paciente solicitó baja".into(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn arco_endpoints() {
        let api = client().await;

        let list = api.arco_requests(3).await.unwrap();
        assert_eq!(list.arco_requests.len(), 1);
        assert_eq!(list.arco_requests[0].status, ArcoStatus::Pending);

        let created = api
            .create_arco_request(&CreateArcoRequest {
                patient_id: 3,
                request_type: ArcoRequestType::Cancellation,
                description: "Eliminar mis datos".into(),
                contact_email: Some("p@example.com".into()),
                contact_phone: None,
            })
            .await
            .unwrap();
        assert_eq!(created.arco_request.id, 99);
        assert_eq!(created.arco_request.request_type, ArcoRequestType::Cancellation);
        assert_eq!(created.arco_request.contact_email.as_deref(), Some("p@example.com"));

        let updated = api
            .update_arco_request(
                1,
                &UpdateArcoRequest {
                    status: ArcoStatus::Resolved,
                    resolution_notes: Some("Entregado".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.arco_request.status, ArcoStatus::Resolved);
        assert!(updated.arco_request.resolved_at.is_some());
        assert_eq!(updated.arco_request.resolution_notes.as_deref(), Some("Entregado"));
    }
}

//! Notification relay HTTP server.
//!
//! One POST endpoint receives complaint status changes from the admin panel,
//! resolves the citizen's contact channels from Firestore (with Auth and
//! issue-document fallbacks), and dispatches SMS/email. Channel failures are
//! reported in the response body; they never fail the request itself. There
//! is deliberately no retry, queueing, or dedup here.

use actix_cors::Cors;
use actix_web::dev::Service as _;
use actix_web::{http::header, web, App, HttpResponse, HttpServer, Result as ActixResult};
use metrics::{counter, describe_counter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::admin::FirebaseAdmin;
use crate::config::NotifyConfig;
use crate::directory::{normalize_phone, UserDirectory};
use crate::mail::Mailer;
use crate::sms::{SmsClient, SmsReceipt};
use crate::status::{status_messages, ComplaintStatus};

pub const SERVICE_NAME: &str = "CivicHero Notification Service";

/// Status-change payload posted by the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    #[serde(default)]
    pub complaint_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub new_status: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
}

/// Outcome of one delivery channel, serialized into the response body.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelResult {
    fn sms_sent(receipt: SmsReceipt) -> Self {
        Self {
            success: true,
            sid: Some(receipt.sid),
            response: receipt.status,
            skipped: None,
            error: None,
        }
    }

    fn email_sent(reply: String) -> Self {
        Self {
            success: true,
            sid: None,
            response: Some(reply),
            skipped: None,
            error: None,
        }
    }

    fn skipped() -> Self {
        Self {
            success: true,
            sid: None,
            response: None,
            skipped: Some(true),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            sid: None,
            response: None,
            skipped: None,
            error: Some(error),
        }
    }
}

/// Shared server state: config plus the provider clients.
pub struct NotifyState {
    pub config: NotifyConfig,
    pub directory: UserDirectory,
    pub admin: FirebaseAdmin,
    pub sms: Option<SmsClient>,
    pub mailer: Option<Mailer>,
}

/// All three identifying fields are mandatory.
fn has_missing_fields(req: &StatusChangeRequest) -> bool {
    req.complaint_id.is_empty() || req.user_id.is_empty() || req.new_status.is_empty()
}

/// A missing profile only 404s when the Auth account is also unknown and
/// the issue document held no email. An existing account without an email
/// proceeds to the no-contact check instead.
fn profile_fallback_exhausted(auth_account_exists: bool, email: &Option<String>) -> bool {
    !auth_account_exists && email.is_none()
}

/// Response body for a completed dispatch. The request itself succeeds even
/// when individual channels failed; failures live inside `results`.
fn completion_body(
    sms: Option<ChannelResult>,
    email: Option<ChannelResult>,
) -> serde_json::Value {
    json!({
        "success": true,
        "message": "Notifications sent successfully",
        "results": {
            "sms": sms,
            "email": email
        }
    })
}

async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    })))
}

async fn notify_status_change(
    state: web::Data<NotifyState>,
    req: web::Json<StatusChangeRequest>,
) -> ActixResult<HttpResponse> {
    let req = req.into_inner();
    counter!("notify_requests_total").increment(1);
    info!(
        "Received notification request: {}",
        serde_json::to_string(&req).unwrap_or_default()
    );

    if has_missing_fields(&req) {
        warn!(
            "Missing required fields: complaintId={:?} userId={:?} newStatus={:?}",
            req.complaint_id, req.user_id, req.new_status
        );
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Missing required fields: complaintId, userId, newStatus"
        })));
    }

    let status = ComplaintStatus::parse(&req.new_status);
    if !status.should_notify() {
        info!(
            "Status \"{}\" not in notification list, skipping",
            req.new_status
        );
        counter!("notify_skipped_total").increment(1);
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "skipped": true,
            "reason": "Status not in notification list"
        })));
    }

    // Resolve the citizen's contact channels: Firestore profile first, then
    // Firebase Auth, then the issue document's submitter email.
    let mut phone: Option<String> = None;
    let mut email: Option<String> = None;

    match state.directory.fetch_user(&req.user_id).await {
        Ok(Some(profile)) => {
            phone = profile
                .phone()
                .and_then(|p| normalize_phone(p, &state.config.default_country_code));
            email = profile.email().map(str::to_string);

            if email.is_none() {
                info!("Email missing in profile for {}, trying Auth", req.user_id);
                match state.admin.lookup_user(&req.user_id).await {
                    Ok(Some(user)) => {
                        email = user.email.filter(|e| !e.is_empty());
                    }
                    Ok(None) => warn!("No Auth account for {}", req.user_id),
                    Err(e) => warn!("Auth lookup failed for {}: {}", req.user_id, e),
                }
            }
        }
        Ok(None) => {
            warn!(
                "User profile not found in Firestore for userId: {}",
                req.user_id
            );
            let mut auth_account_exists = false;
            match state.admin.lookup_user(&req.user_id).await {
                Ok(Some(user)) => {
                    auth_account_exists = true;
                    email = user.email.filter(|e| !e.is_empty());
                }
                Ok(None) => warn!("No Auth account for {}", req.user_id),
                Err(e) => warn!("Auth lookup failed for {}: {}", req.user_id, e),
            }
            if !auth_account_exists {
                // Some issues carry the submitter's email directly.
                match state.directory.issue_contact_email(&req.complaint_id).await {
                    Ok(found) => email = found,
                    Err(e) => warn!("Could not check issue document: {}", e),
                }
            }
            if profile_fallback_exhausted(auth_account_exists, &email) {
                return Ok(HttpResponse::NotFound().json(json!({
                    "success": false,
                    "error": "User profile not found. User may have been deleted or needs to complete profile.",
                    "userId": req.user_id,
                    "suggestion": "Please ensure the user exists in Firebase Auth and has completed their profile in the app"
                })));
            }
        }
        Err(e) => {
            error!("Error fetching user profile: {}", e);
            return Ok(HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string()
            })));
        }
    }

    info!(
        "Contact channels for {}: phone={} email={}",
        req.user_id,
        phone.is_some(),
        email.is_some()
    );

    if phone.is_none() && email.is_none() {
        warn!("No phone or email found for user: {}", req.user_id);
        return Ok(HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "User has no phone number or email. Please complete profile in the app.",
            "userId": req.user_id
        })));
    }

    let messages = status_messages(&status, req.department.as_deref(), req.issue_type.as_deref());

    let sms_result = match phone {
        Some(ref to) => Some(match &state.sms {
            Some(client) => match client.send(to, &messages.sms).await {
                Ok(receipt) => {
                    counter!("notify_sms_sent").increment(1);
                    ChannelResult::sms_sent(receipt)
                }
                Err(e) => {
                    counter!("notify_sms_failed").increment(1);
                    ChannelResult::failed(e.to_string())
                }
            },
            None => {
                counter!("notify_sms_failed").increment(1);
                ChannelResult::failed("Twilio not configured".to_string())
            }
        }),
        None => {
            info!("No phone number, skipping SMS");
            None
        }
    };

    let email_result = match email {
        Some(ref to) => Some(if !state.config.email_enabled {
            info!("Email disabled, skipping");
            ChannelResult::skipped()
        } else {
            match &state.mailer {
                Some(mailer) => {
                    match mailer.send(to, &messages.email_subject, &messages.email_body).await {
                        Ok(reply) => {
                            counter!("notify_email_sent").increment(1);
                            ChannelResult::email_sent(reply)
                        }
                        Err(e) => {
                            counter!("notify_email_failed").increment(1);
                            ChannelResult::failed(e.to_string())
                        }
                    }
                }
                None => {
                    counter!("notify_email_failed").increment(1);
                    ChannelResult::failed("Gmail not configured".to_string())
                }
            }
        }),
        None => {
            info!("No email, skipping email");
            None
        }
    };

    info!(
        "Notification process completed: sms={:?} email={:?}",
        sms_result, email_result
    );

    Ok(HttpResponse::Ok().json(completion_body(sms_result, email_result)))
}

/// Configure the relay's HTTP routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/notify-status-change", web::post().to(notify_status_change));
}

fn describe_metrics() {
    describe_counter!("notify_requests_total", "Notification requests received");
    describe_counter!(
        "notify_skipped_total",
        "Requests skipped because the status is not notifiable"
    );
    describe_counter!("notify_sms_sent", "SMS notifications accepted by Twilio");
    describe_counter!("notify_sms_failed", "SMS notifications that failed");
    describe_counter!("notify_email_sent", "Emails accepted by the SMTP relay");
    describe_counter!("notify_email_failed", "Emails that failed");
}

/// Build the provider clients and run the server until shutdown.
pub async fn run(config: NotifyConfig) -> anyhow::Result<()> {
    describe_metrics();

    let project_id = config.require_project_id()?.to_string();
    let directory = UserDirectory::new(&project_id).await?;
    let admin = FirebaseAdmin::new(&project_id);

    let sms = match SmsClient::from_config(&config) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Twilio disabled: {}", e);
            None
        }
    };
    let mailer = if config.email_enabled {
        match Mailer::from_config(&config) {
            Ok(mailer) => Some(mailer),
            Err(e) => {
                warn!("Email enabled but not usable: {}", e);
                None
            }
        }
    } else {
        None
    };

    let port = config.port;
    info!("{} running on port {}", SERVICE_NAME, port);
    info!(
        "Twilio: {}",
        if sms.is_some() { "configured" } else { "not configured" }
    );
    info!(
        "Email: {}",
        if config.email_enabled { "enabled" } else { "disabled" }
    );

    let state = web::Data::new(NotifyState {
        config,
        directory,
        admin,
        sms,
        mailer,
    });

    HttpServer::new(move || {
        // Permissive CORS; the relay sits behind the admin panel during
        // development and is not exposed publicly.
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION]);

        App::new()
            .wrap(cors)
            .wrap_fn(|req, srv| {
                info!("{} {}", req.method(), req.path());
                srv.call(req)
            })
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Service as _;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn request_logging_passes_requests_through() {
        let app = test::init_service(
            App::new()
                .wrap_fn(|req, srv| {
                    info!("{} {}", req.method(), req.path());
                    srv.call(req)
                })
                .route("/health", web::get().to(health)),
        )
        .await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[::core::prelude::v1::test]
    fn channel_failure_does_not_fail_the_request() {
        let body = completion_body(
            Some(ChannelResult::failed(
                "twilio error 20003: Authenticate".to_string(),
            )),
            Some(ChannelResult::skipped()),
        );
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Notifications sent successfully");
        assert_eq!(body["results"]["sms"]["success"], false);
        assert_eq!(
            body["results"]["sms"]["error"],
            "twilio error 20003: Authenticate"
        );
        assert_eq!(body["results"]["email"]["skipped"], true);

        let both_failed = completion_body(
            Some(ChannelResult::failed("Twilio not configured".to_string())),
            Some(ChannelResult::failed("Gmail not configured".to_string())),
        );
        assert_eq!(both_failed["success"], true);
    }

    #[::core::prelude::v1::test]
    fn missing_profile_fallback_chain() {
        // An Auth account without an email falls through to the
        // no-contact check, not to a 404.
        assert!(!profile_fallback_exhausted(true, &None));
        // An email recovered from the issue document keeps the request alive.
        assert!(!profile_fallback_exhausted(
            false,
            &Some("citizen@example.com".to_string())
        ));
        // Unknown everywhere: the profile really is gone.
        assert!(profile_fallback_exhausted(false, &None));
    }

    #[actix_rt::test]
    async fn health_reports_service_name() {
        let app =
            test::init_service(App::new().route("/health", web::get().to(health))).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_NAME);
    }

    #[::core::prelude::v1::test]
    fn missing_field_detection() {
        let full: StatusChangeRequest = serde_json::from_value(json!({
            "complaintId": "c1",
            "userId": "u1",
            "newStatus": "resolved"
        }))
        .unwrap();
        assert!(!has_missing_fields(&full));

        let partial: StatusChangeRequest = serde_json::from_value(json!({
            "complaintId": "c1",
            "newStatus": "resolved"
        }))
        .unwrap();
        assert!(has_missing_fields(&partial));

        let empty_status: StatusChangeRequest = serde_json::from_value(json!({
            "complaintId": "c1",
            "userId": "u1",
            "newStatus": ""
        }))
        .unwrap();
        assert!(has_missing_fields(&empty_status));
    }

    #[::core::prelude::v1::test]
    fn channel_results_serialize_sparsely() {
        let sent = ChannelResult::sms_sent(SmsReceipt {
            sid: "SM1234".to_string(),
            status: Some("queued".to_string()),
        });
        let value = serde_json::to_value(&sent).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["sid"], "SM1234");
        assert!(value.get("error").is_none());
        assert!(value.get("skipped").is_none());

        let skipped = serde_json::to_value(ChannelResult::skipped()).unwrap();
        assert_eq!(skipped["skipped"], true);
        assert!(skipped.get("sid").is_none());

        let failed = serde_json::to_value(ChannelResult::failed("boom".to_string())).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "boom");
    }

    #[::core::prelude::v1::test]
    fn request_accepts_optional_fields() {
        let req: StatusChangeRequest = serde_json::from_value(json!({
            "complaintId": "c1",
            "userId": "u1",
            "newStatus": "assigned",
            "department": "Sanitation",
            "issueType": "Garbage Overflow"
        }))
        .unwrap();
        assert_eq!(req.department.as_deref(), Some("Sanitation"));
        assert_eq!(req.issue_type.as_deref(), Some("Garbage Overflow"));
    }
}

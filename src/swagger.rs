use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::services::InviteRequest;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::auth::update_me,
        handlers::auth::get_account,
        handlers::event::list_events,
        handlers::event::create_event,
        handlers::event::get_event,
        handlers::event::update_event,
        handlers::event::delete_event,
        handlers::event::invite,
        handlers::event::remove_participant,
        handlers::event::accept,
        handlers::event::decline,
        handlers::event::leave,
        handlers::event::draw,
        handlers::event::my_assignment,
        handlers::gift::add_gift_list_item,
        handlers::gift::update_gift_list_item,
        handlers::gift::delete_gift_list_item,
        handlers::gift::claim_gift_list_item,
        handlers::gift::add_wish,
        handlers::gift::update_wish,
        handlers::gift::delete_wish,
        handlers::gift::claim_wish,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            RefreshRequest,
            UpdateAccountRequest,
            AuthResponse,
            AccountResponse,
            AccountSummary,
            EventType,
            CreateEventRequest,
            UpdateEventRequest,
            EventResponse,
            ParticipantResponse,
            ParticipantRole,
            ParticipantStatus,
            InvitationResponse,
            InviteRequest,
            AssignmentResponse,
            Gift,
            AssetRef,
            GiftRequest,
            ImageUpload,
            ApiError,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Accounts and tokens"),
        (name = "event", description = "Gift events"),
        (name = "participant", description = "Invitations and roster"),
        (name = "draw", description = "Secret Santa draw"),
        (name = "gift", description = "Gift lists, wish lists and claims"),
    ),
    info(
        title = "Giftboard API",
        version = "1.0.0",
        description = "Gift event coordination REST API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

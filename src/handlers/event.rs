use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

use super::current_account_id;
use crate::models::*;
use crate::services::{DrawService, EventService, InviteRequest};

#[utoipa::path(
    get,
    path = "/events",
    tag = "event",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Events the account takes part in", body = [EventResponse]),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn list_events(
    event_service: web::Data<EventService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service.list_events(account_id).await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": events
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events",
    tag = "event",
    request_body = CreateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn create_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    request: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service.create_event(account_id, request.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "event",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event, with other participants' assignments hidden", body = EventResponse),
        (status = 403, description = "Not on the roster", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
pub async fn get_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service.get_event(account_id, path.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/events/{id}",
    tag = "event",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = UpdateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 403, description = "Organizer only", body = ErrorResponse),
        (status = 409, description = "Type can no longer change", body = ErrorResponse)
    )
)]
pub async fn update_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service
        .update_event(account_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "event",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event deleted"),
        (status = 403, description = "Organizer only", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
pub async fn delete_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service.delete_event(account_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Event deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/participants",
    tag = "participant",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = InviteRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Participant invited", body = EventResponse),
        (status = 400, description = "Invalid email or draw already performed", body = ErrorResponse),
        (status = 409, description = "Email already on the roster", body = ErrorResponse)
    )
)]
pub async fn invite(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<InviteRequest>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service
        .invite(account_id, path.into_inner(), request.into_inner())
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/events/{id}/participants/{email}",
    tag = "participant",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("email" = String, Path, description = "Participant email")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Participant removed", body = EventResponse),
        (status = 403, description = "Organizer only, organizer cannot be removed", body = ErrorResponse),
        (status = 409, description = "Participant of a completed draw", body = ErrorResponse)
    )
)]
pub async fn remove_participant(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let (event_id, email) = path.into_inner();

    match event_service
        .remove_participant(account_id, event_id, &email)
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn respond(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    event_id: Uuid,
    response: InvitationResponse,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service.respond(account_id, event_id, response).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/accept",
    tag = "participant",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Invitation accepted", body = EventResponse),
        (status = 400, description = "Draw already performed", body = ErrorResponse),
        (status = 404, description = "No pending invitation", body = ErrorResponse)
    )
)]
pub async fn accept(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    respond(event_service, req, path.into_inner(), InvitationResponse::Accept).await
}

#[utoipa::path(
    post,
    path = "/events/{id}/decline",
    tag = "participant",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Invitation declined", body = EventResponse),
        (status = 404, description = "No pending invitation", body = ErrorResponse)
    )
)]
pub async fn decline(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    respond(event_service, req, path.into_inner(), InvitationResponse::Decline).await
}

#[utoipa::path(
    post,
    path = "/events/{id}/leave",
    tag = "participant",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Left the event"),
        (status = 403, description = "The organizer cannot leave", body = ErrorResponse),
        (status = 409, description = "Participant of a completed draw", body = ErrorResponse)
    )
)]
pub async fn leave(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service.leave(account_id, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "You left the event"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/draw",
    tag = "draw",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Draw performed", body = EventResponse),
        (status = 400, description = "Wrong event type, fewer than two accepted participants or already drawn", body = ErrorResponse),
        (status = 403, description = "Organizer only", body = ErrorResponse)
    )
)]
pub async fn draw(
    draw_service: web::Data<DrawService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match draw_service.perform_draw(account_id, path.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": event
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}/assignment",
    tag = "draw",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The person you give a gift to", body = AssignmentResponse),
        (status = 404, description = "No draw yet", body = ErrorResponse)
    )
)]
pub async fn my_assignment(
    draw_service: web::Data<DrawService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match draw_service.my_assignment(account_id, path.into_inner()).await {
        Ok(assignment) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": assignment
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn event_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::get().to(list_events))
            .route("", web::post().to(create_event))
            .route("/{id}", web::get().to(get_event))
            .route("/{id}", web::put().to(update_event))
            .route("/{id}", web::delete().to(delete_event))
            .route("/{id}/participants", web::post().to(invite))
            .route("/{id}/participants/{email}", web::delete().to(remove_participant))
            .route("/{id}/accept", web::post().to(accept))
            .route("/{id}/decline", web::post().to(decline))
            .route("/{id}/leave", web::post().to(leave))
            .route("/{id}/draw", web::post().to(draw))
            .route("/{id}/assignment", web::get().to(my_assignment))
            .configure(super::gift::gift_config),
    );
}

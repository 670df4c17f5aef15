use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

use super::current_account_id;
use crate::models::*;
use crate::services::{GiftList, GiftService};

async fn add(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    list: GiftList,
    event_id: Uuid,
    request: GiftRequest,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match gift_service.add_gift(list, account_id, event_id, request).await {
        Ok(gift) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": gift
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn update(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    list: GiftList,
    (event_id, gift_id): (Uuid, Uuid),
    request: GiftRequest,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match gift_service
        .update_gift(list, account_id, event_id, gift_id, request)
        .await
    {
        Ok(gift) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": gift
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn remove(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    list: GiftList,
    (event_id, gift_id): (Uuid, Uuid),
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match gift_service.delete_gift(list, account_id, event_id, gift_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Gift deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/gift-list",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = GiftRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Gift added to the birthday list", body = Gift),
        (status = 400, description = "Invalid gift or not a birthday event", body = ErrorResponse),
        (status = 403, description = "Organizer only", body = ErrorResponse)
    )
)]
pub async fn add_gift_list_item(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<GiftRequest>,
) -> Result<HttpResponse> {
    add(gift_service, req, GiftList::Event, path.into_inner(), request.into_inner()).await
}

#[utoipa::path(
    put,
    path = "/events/{id}/gift-list/{gift_id}",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("gift_id" = Uuid, Path, description = "Gift id")
    ),
    request_body = GiftRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Gift updated", body = Gift),
        (status = 403, description = "Organizer only", body = ErrorResponse),
        (status = 404, description = "Gift not found", body = ErrorResponse)
    )
)]
pub async fn update_gift_list_item(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
    request: web::Json<GiftRequest>,
) -> Result<HttpResponse> {
    update(gift_service, req, GiftList::Event, path.into_inner(), request.into_inner()).await
}

#[utoipa::path(
    delete,
    path = "/events/{id}/gift-list/{gift_id}",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("gift_id" = Uuid, Path, description = "Gift id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Gift deleted"),
        (status = 403, description = "Organizer only", body = ErrorResponse),
        (status = 404, description = "Gift not found", body = ErrorResponse)
    )
)]
pub async fn delete_gift_list_item(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    remove(gift_service, req, GiftList::Event, path.into_inner()).await
}

#[utoipa::path(
    put,
    path = "/events/{id}/gift-list/{gift_id}/purchase",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("gift_id" = Uuid, Path, description = "Gift id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Gift claimed", body = Gift),
        (status = 403, description = "Not an accepted participant", body = ErrorResponse),
        (status = 409, description = "Already claimed", body = ErrorResponse)
    )
)]
pub async fn claim_gift_list_item(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let (event_id, gift_id) = path.into_inner();

    match gift_service.claim_gift(account_id, event_id, gift_id).await {
        Ok(gift) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": gift
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/{id}/wish-list",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    request_body = GiftRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Wish added to your list", body = Gift),
        (status = 400, description = "Invalid gift or event without wish lists", body = ErrorResponse),
        (status = 403, description = "Not an accepted participant", body = ErrorResponse)
    )
)]
pub async fn add_wish(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<GiftRequest>,
) -> Result<HttpResponse> {
    add(gift_service, req, GiftList::Wishes, path.into_inner(), request.into_inner()).await
}

#[utoipa::path(
    put,
    path = "/events/{id}/wish-list/{gift_id}",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("gift_id" = Uuid, Path, description = "Wish id")
    ),
    request_body = GiftRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Wish updated", body = Gift),
        (status = 404, description = "Wish not found", body = ErrorResponse)
    )
)]
pub async fn update_wish(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
    request: web::Json<GiftRequest>,
) -> Result<HttpResponse> {
    update(gift_service, req, GiftList::Wishes, path.into_inner(), request.into_inner()).await
}

#[utoipa::path(
    delete,
    path = "/events/{id}/wish-list/{gift_id}",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("gift_id" = Uuid, Path, description = "Wish id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Wish deleted"),
        (status = 404, description = "Wish not found", body = ErrorResponse)
    )
)]
pub async fn delete_wish(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    remove(gift_service, req, GiftList::Wishes, path.into_inner()).await
}

#[utoipa::path(
    put,
    path = "/events/{id}/participants/{email}/wish-list/{gift_id}/purchase",
    tag = "gift",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("email" = String, Path, description = "Wish list owner"),
        ("gift_id" = Uuid, Path, description = "Wish id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Wish claimed", body = Gift),
        (status = 403, description = "Own wish list or not an accepted participant", body = ErrorResponse),
        (status = 409, description = "Already claimed", body = ErrorResponse)
    )
)]
pub async fn claim_wish(
    gift_service: web::Data<GiftService>,
    req: HttpRequest,
    path: web::Path<(Uuid, String, Uuid)>,
) -> Result<HttpResponse> {
    let account_id = match current_account_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let (event_id, owner_email, gift_id) = path.into_inner();

    match gift_service
        .claim_wish(account_id, event_id, &owner_email, gift_id)
        .await
    {
        Ok(gift) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": gift
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Registered inside the `/events` scope.
pub fn gift_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/{id}/gift-list", web::post().to(add_gift_list_item))
        .route("/{id}/gift-list/{gift_id}", web::put().to(update_gift_list_item))
        .route("/{id}/gift-list/{gift_id}", web::delete().to(delete_gift_list_item))
        .route(
            "/{id}/gift-list/{gift_id}/purchase",
            web::put().to(claim_gift_list_item),
        )
        .route("/{id}/wish-list", web::post().to(add_wish))
        .route("/{id}/wish-list/{gift_id}", web::put().to(update_wish))
        .route("/{id}/wish-list/{gift_id}", web::delete().to(delete_wish))
        .route(
            "/{id}/participants/{email}/wish-list/{gift_id}/purchase",
            web::put().to(claim_wish),
        );
}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Reference to an image held by the asset store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetRef {
    pub public_id: String,
    pub url: String,
}

/// Wish-list or gift-list entry. Images belong to exactly one gift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Gift {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<AssetRef>,
    /// First claim wins; never reassigned once set.
    pub purchased_by: Option<i64>,
    pub added_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Validated, storage-independent gift fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftDetails {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub url: Option<String>,
}

/// Image payload after base64 decoding.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Gift {
    pub fn new(
        details: GiftDetails,
        images: Vec<AssetRef>,
        added_by: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: details.name,
            description: details.description,
            price: details.price,
            url: details.url,
            images,
            purchased_by: None,
            added_by,
            created_at: now,
        }
    }

    /// Overwrites the editable fields. When `images` is given the previous
    /// images are returned so the caller can release them.
    pub fn apply(&mut self, details: GiftDetails, images: Option<Vec<AssetRef>>) -> Vec<AssetRef> {
        self.name = details.name;
        self.description = details.description;
        self.price = details.price;
        self.url = details.url;
        match images {
            Some(images) => std::mem::replace(&mut self.images, images),
            None => Vec::new(),
        }
    }

    /// Records `account_id` as the buyer unless someone already claimed it.
    pub fn claim(&mut self, account_id: i64) -> AppResult<()> {
        if self.purchased_by.is_some() {
            return Err(AppError::Conflict(
                "Someone is already taking care of this gift".to_string(),
            ));
        }
        self.purchased_by = Some(account_id);
        Ok(())
    }
}

/// Base64 image inside a gift request. `data` may also be a `data:` URI.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageUpload {
    #[schema(example = "image/png")]
    pub mime_type: String,
    pub data: String,
}

impl ImageUpload {
    pub fn decode(&self) -> AppResult<DecodedImage> {
        let mime_type = self.mime_type.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(AppError::ValidationError(
                "Gift images must be valid images".to_string(),
            ));
        }
        let payload = match self.data.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => self.data.as_str(),
        };
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| AppError::ValidationError("Image data is not valid base64".to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::ValidationError("Image data is empty".to_string()));
        }
        Ok(DecodedImage { bytes, mime_type })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GiftRequest {
    #[schema(example = "Board game")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 29.9)]
    pub price: f64,
    #[schema(example = "https://shop.example.com/item/42")]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageUpload>,
}

impl GiftRequest {
    /// Validates the fields and decodes the images.
    pub fn into_parts(self) -> AppResult<(GiftDetails, Vec<DecodedImage>)> {
        let name = self.name.trim().to_string();
        let name_len = name.chars().count();
        if !(2..=30).contains(&name_len) {
            return Err(AppError::ValidationError(
                "Gift name must be between 2 and 30 characters".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::ValidationError(
                "Price must be a positive amount".to_string(),
            ));
        }
        let url = match self.url.map(|u| u.trim().to_string()) {
            Some(u) if u.is_empty() => None,
            Some(u) => {
                if !(u.starts_with("https://") || u.starts_with("http://")) || u.contains(' ') {
                    return Err(AppError::ValidationError("Invalid product link".to_string()));
                }
                Some(u)
            }
            None => None,
        };
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let images = self
            .images
            .iter()
            .map(ImageUpload::decode)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((
            GiftDetails {
                name,
                description,
                price: self.price,
                url,
            },
            images,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GiftRequest {
        GiftRequest {
            name: "  Teapot ".to_string(),
            description: Some("  ".to_string()),
            price: 12.5,
            url: Some("https://shop.example.com/teapot".to_string()),
            images: vec![ImageUpload {
                mime_type: "image/png".to_string(),
                data: STANDARD.encode([1u8, 2, 3]),
            }],
        }
    }

    #[test]
    fn test_gift_request_is_validated_and_decoded() {
        let (details, images) = request().into_parts().unwrap();
        assert_eq!(details.name, "Teapot");
        assert_eq!(details.description, None);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_gift_request_rejects_bad_input() {
        let mut r = request();
        r.price = -1.0;
        assert!(matches!(r.into_parts(), Err(AppError::ValidationError(_))));

        let mut r = request();
        r.name = "x".to_string();
        assert!(r.into_parts().is_err());

        let mut r = request();
        r.url = Some("ftp://example.com".to_string());
        assert!(r.into_parts().is_err());

        let mut r = request();
        r.images[0].mime_type = "application/pdf".to_string();
        assert!(r.into_parts().is_err());

        let mut r = request();
        r.images[0].data = "%%%".to_string();
        assert!(r.into_parts().is_err());
    }

    #[test]
    fn test_data_uri_images_are_accepted() {
        let upload = ImageUpload {
            mime_type: "image/jpeg".to_string(),
            data: format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpg")),
        };
        assert_eq!(upload.decode().unwrap().bytes, b"jpg".to_vec());
    }

    #[test]
    fn test_first_claim_wins() {
        let details = request().into_parts().unwrap().0;
        let mut gift = Gift::new(details, Vec::new(), Some(1), Utc::now());
        gift.claim(2).unwrap();
        assert!(matches!(gift.claim(3), Err(AppError::Conflict(_))));
        assert_eq!(gift.purchased_by, Some(2));
    }

    #[test]
    fn test_apply_returns_replaced_images_only_when_replacing() {
        let details = request().into_parts().unwrap().0;
        let old = AssetRef {
            public_id: "old".into(),
            url: "https://img/old".into(),
        };
        let mut gift = Gift::new(details.clone(), vec![old.clone()], None, Utc::now());

        assert!(gift.apply(details.clone(), None).is_empty());
        assert_eq!(gift.images, vec![old.clone()]);

        let new = AssetRef {
            public_id: "new".into(),
            url: "https://img/new".into(),
        };
        let released = gift.apply(details, Some(vec![new.clone()]));
        assert_eq!(released, vec![old]);
        assert_eq!(gift.images, vec![new]);
    }
}

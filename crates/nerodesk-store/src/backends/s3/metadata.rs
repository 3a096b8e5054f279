//! Mapping between [`Attributes`] and object user-metadata fields.
//!
//! S3 user metadata travels as HTTP headers, so values must stay ASCII. The
//! visibility flag is stored as `"true"`/`"false"`; the friend list is stored
//! as base64url-encoded JSON.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use object_store::{Attribute, AttributeValue, Attributes as ObjectAttributes};

use crate::attributes::Attributes;
use crate::error::{BackendError, StoreResult};
use crate::identity::Identity;

pub(crate) const VISIBLE_FIELD: &str = "visible";
pub(crate) const FRIENDS_FIELD: &str = "friends";

/// Encodes attributes as user-metadata fields.
pub(crate) fn encode(attributes: &Attributes) -> StoreResult<ObjectAttributes> {
    let friends = serde_json::to_vec(attributes.friends())?;

    let mut out = ObjectAttributes::new();
    out.insert(
        Attribute::Metadata(VISIBLE_FIELD.into()),
        AttributeValue::from(attributes.visible().to_string()),
    );
    out.insert(
        Attribute::Metadata(FRIENDS_FIELD.into()),
        AttributeValue::from(URL_SAFE_NO_PAD.encode(friends)),
    );
    Ok(out)
}

/// Decodes user-metadata fields. Missing fields take their defaults and any
/// visibility value other than `true` reads as private.
pub(crate) fn decode(fields: &ObjectAttributes) -> StoreResult<Attributes> {
    let visible = fields
        .get(&Attribute::Metadata(VISIBLE_FIELD.into()))
        .map(|v| v.as_ref().trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let friends: Vec<Identity> = match fields.get(&Attribute::Metadata(FRIENDS_FIELD.into())) {
        Some(raw) if !raw.as_ref().is_empty() => {
            let json = URL_SAFE_NO_PAD.decode(raw.as_ref()).map_err(|e| {
                BackendError::SerializationError {
                    message: format!("friends field is not base64url: {e}"),
                }
            })?;
            serde_json::from_slice(&json)?
        }
        _ => Vec::new(),
    };

    Ok(Attributes::new(visible, friends))
}

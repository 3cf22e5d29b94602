//! Catalog entity records as they appear in a full export.
//!
//! Link records are denormalized views: next to their foreign keys they carry
//! the display fields (names, SKUs, family) joined at export time. Those
//! joined fields are informational; an importer only trusts the foreign keys
//! and the link's own fields.

use serde::{Deserialize, Serialize};

/// A fabric base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tissue {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub width: f64,
    pub composition: String,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A catalog color. The SKU is sequential and immutable once assigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(default, rename = "labL", skip_serializing_if = "Option::is_none")]
    pub lab_l: Option<f64>,
    #[serde(default, rename = "labA", skip_serializing_if = "Option::is_none")]
    pub lab_a: Option<f64>,
    #[serde(default, rename = "labB", skip_serializing_if = "Option::is_none")]
    pub lab_b: Option<f64>,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A print pattern, coded per family (e.g. `JA001`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    #[serde(default)]
    pub id: String,
    pub family: String,
    pub name: String,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    #[default]
    #[serde(rename = "Ativo")]
    Active,
    #[serde(rename = "Inativo")]
    Inactive,
}

/// Image fields shared by both link kinds.
///
/// `image` is the legacy inline data URL. `image_hash` is the content address
/// used to deduplicate attachments; `image_path` points into the image store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_thumb: Option<String>,
}

impl LinkImage {
    /// The key this record's image is addressed by, if any.
    ///
    /// Older records only have a storage path; that path doubles as the key.
    pub fn content_key(&self) -> Option<&str> {
        self.image_hash
            .as_deref()
            .or(self.image_path.as_deref())
            .filter(|key| !key.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none()
            && self.image_path.is_none()
            && self.image_hash.is_none()
            && self.image_thumb.is_none()
    }
}

/// Display fields joined from the tissue at export time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TissueView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tissue_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tissue_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
}

/// A tissue/color link (one sellable child SKU).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorLink {
    #[serde(default)]
    pub id: String,
    pub tissue_id: String,
    pub color_id: String,
    pub sku_filho: String,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub image: LinkImage,
    #[serde(flatten)]
    pub tissue: TissueView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(default, rename = "nomeCompleto", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// A tissue/pattern link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternLink {
    #[serde(default)]
    pub id: String,
    pub tissue_id: String,
    pub pattern_id: String,
    pub sku_filho: String,
    #[serde(default)]
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub image: LinkImage,
    #[serde(flatten)]
    pub tissue: TissueView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_name: Option<String>,
    #[serde(default, rename = "nomeCompleto", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Access to the image fields of either link kind.
pub trait HasLinkImage {
    fn link_image(&self) -> &LinkImage;
}

impl HasLinkImage for ColorLink {
    fn link_image(&self) -> &LinkImage {
        &self.image
    }
}

impl HasLinkImage for PatternLink {
    fn link_image(&self) -> &LinkImage {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_view_roundtrips_joined_fields() {
        let raw = json!({
            "id": "l1", "tissueId": "t1", "colorId": "c1", "skuFilho": "T001-AZ001",
            "status": "Ativo", "createdAt": "2025-01-02T00:00:00.000Z",
            "tissueSku": "T001", "tissueName": "Helanca", "width": 160.0,
            "composition": "-", "colorSku": "AZ001", "colorName": "Azul",
            "family": "Azul", "hex": "#2233ff", "nomeCompleto": "Helanca Azul",
            "imageHash": "abc", "imageMime": "image/png"
        });
        let link: ColorLink = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(link.tissue.tissue_sku.as_deref(), Some("T001"));
        assert_eq!(link.full_name.as_deref(), Some("Helanca Azul"));
        assert_eq!(link.image.content_key(), Some("abc"));
        assert_eq!(serde_json::to_value(&link).unwrap(), raw);
    }

    #[test]
    fn status_defaults_to_active() {
        let link: PatternLink = serde_json::from_value(json!({
            "tissueId": "t1", "patternId": "p1", "skuFilho": "T001-JA001"
        }))
        .unwrap();
        assert_eq!(link.status, LinkStatus::Active);
        assert!(link.id.is_empty());
        assert!(link.image.is_empty());
    }

    #[test]
    fn content_key_falls_back_to_path() {
        let image = LinkImage {
            image_path: Some("images/abc.png".into()),
            ..Default::default()
        };
        assert_eq!(image.content_key(), Some("images/abc.png"));
        let blank = LinkImage {
            image_hash: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(blank.content_key(), None);
    }

    #[test]
    fn color_lab_fields_use_wire_names() {
        let color = Color {
            id: "c1".into(),
            name: "Azul".into(),
            hex: None,
            lab_l: Some(50.0),
            lab_a: None,
            lab_b: None,
            sku: "AZ001".into(),
            created_at: None,
        };
        let value = serde_json::to_value(&color).unwrap();
        assert_eq!(value["labL"], 50.0);
        assert!(value.get("hex").is_none());
    }
}

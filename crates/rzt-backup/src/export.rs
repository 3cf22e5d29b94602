//! Full export assembly.
//!
//! [`ExportInputs::collect`] materializes the catalog from a [`CatalogStore`];
//! [`ExportBuilder::build`] turns those lists into a stamped
//! [`FullExportPayload`].

use std::collections::HashSet;

use chrono::Utc;
use rzt_crypto::{CanonicalHasher, HashInput};
use rzt_store::{CatalogStore, ImageStore};
use rzt_types::{
    Attachment, Color, ColorLink, ExportCounts, FullExportPayload, HasLinkImage, Integrity,
    LinkImage, Pattern, PatternLink, Settings, Tissue, CURRENT_VERSION, SCHEMA,
};

use crate::error::BackupResult;

/// Outcome of the best-effort settings read.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsRead {
    Loaded(Settings),
    /// The read failed; `settings` is the default substituted for it.
    Defaulted { settings: Settings, reason: String },
}

impl SettingsRead {
    /// Run a settings read, substituting defaults on failure.
    pub fn from_result<E: std::fmt::Display>(result: Result<Settings, E>) -> Self {
        match result {
            Ok(settings) => Self::Loaded(settings),
            Err(e) => {
                tracing::warn!(error = %e, "settings unavailable, exporting defaults");
                Self::Defaulted {
                    settings: Settings::default(),
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn settings(&self) -> &Settings {
        match self {
            Self::Loaded(settings) | Self::Defaulted { settings, .. } => settings,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }
}

/// Materialized entity lists plus the settings snapshot.
#[derive(Clone, Debug)]
pub struct ExportInputs {
    pub tissues: Vec<Tissue>,
    pub colors: Vec<Color>,
    pub patterns: Vec<Pattern>,
    pub links: Vec<ColorLink>,
    pub pattern_links: Vec<PatternLink>,
    pub settings: SettingsRead,
}

impl ExportInputs {
    /// Read every entity kind from `store`.
    ///
    /// Listing failures propagate. The settings read is best-effort.
    pub fn collect(store: &dyn CatalogStore) -> BackupResult<Self> {
        Ok(Self {
            tissues: store.list_tissues()?,
            colors: store.list_colors()?,
            patterns: store.list_patterns()?,
            links: store.list_links()?,
            pattern_links: store.list_pattern_links()?,
            settings: SettingsRead::from_result(store.read_settings()),
        })
    }
}

/// Assembles stamped full exports.
#[derive(Default)]
pub struct ExportBuilder<'a> {
    images: Option<&'a dyn ImageStore>,
}

impl<'a> ExportBuilder<'a> {
    pub fn new() -> Self {
        Self { images: None }
    }

    /// Fill attachment data for links that only reference a stored blob.
    pub fn with_images(mut self, images: &'a dyn ImageStore) -> Self {
        self.images = Some(images);
        self
    }

    /// Build a version 4 payload and stamp its integrity hash.
    pub fn build(&self, inputs: ExportInputs) -> BackupResult<FullExportPayload> {
        let ExportInputs {
            tissues,
            colors,
            patterns,
            links,
            pattern_links,
            settings,
        } = inputs;

        let attachments = self.collect_attachments(
            links
                .iter()
                .map(HasLinkImage::link_image)
                .chain(pattern_links.iter().map(HasLinkImage::link_image)),
        );

        let counts = ExportCounts {
            tissues: tissues.len(),
            colors: colors.len(),
            patterns: patterns.len(),
            links: links.len(),
            pattern_links: pattern_links.len(),
            attachments: attachments.len(),
        };

        let settings = match settings {
            SettingsRead::Loaded(settings) | SettingsRead::Defaulted { settings, .. } => settings,
        };

        let hash = CanonicalHasher::hash(&HashInput {
            tissues: &tissues,
            colors: &colors,
            patterns: &patterns,
            links: &links,
            pattern_links: &pattern_links,
            attachments: &attachments,
            settings: Some(&settings),
        })?;

        tracing::info!(
            tissues = counts.tissues,
            colors = counts.colors,
            patterns = counts.patterns,
            links = counts.links,
            pattern_links = counts.pattern_links,
            attachments = counts.attachments,
            hash = %hash.short_hex(),
            "built full export"
        );

        Ok(FullExportPayload {
            schema: SCHEMA.to_string(),
            version: CURRENT_VERSION,
            generated_at: Utc::now(),
            counts,
            tissues,
            colors,
            patterns,
            links,
            pattern_links,
            attachments,
            settings: Some(settings),
            integrity: Integrity::sha256(hash),
        })
    }

    /// Collect and export in one step.
    pub fn build_from_store(&self, store: &dyn CatalogStore) -> BackupResult<FullExportPayload> {
        self.build(ExportInputs::collect(store)?)
    }

    /// One attachment per distinct content key, in first-seen order.
    fn collect_attachments<'r>(&self, images: impl Iterator<Item = &'r LinkImage>) -> Vec<Attachment> {
        let mut seen = HashSet::new();
        let mut attachments = Vec::new();
        for image in images {
            let Some(key) = image.content_key() else {
                continue;
            };
            if !seen.insert(key.to_string()) {
                continue;
            }

            let mut mime = image.image_mime.clone();
            let mut data = image.image.clone().filter(|d| d.starts_with("data:"));
            if data.is_none() {
                if let Some((blob_mime, url)) = self.read_stored(image) {
                    mime = mime.or(blob_mime);
                    data = Some(url);
                }
            }

            attachments.push(Attachment {
                hash: key.to_string(),
                mime,
                size: data.as_ref().map(|d| d.len() as u64),
                data,
                thumb: image.image_thumb.clone(),
            });
        }
        attachments
    }

    /// Look a blob up by storage path, then by hash. Failures leave the data absent.
    fn read_stored(&self, image: &LinkImage) -> Option<(Option<String>, String)> {
        let images = self.images?;
        let keys = [image.image_path.as_deref(), image.image_hash.as_deref()];
        for key in keys.into_iter().flatten().filter(|k| !k.is_empty()) {
            match images.get(key) {
                Ok(Some(blob)) => return Some((blob.mime.clone(), blob.to_data_url())),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key, error = %e, "could not read image blob for export");
                }
            }
        }
        None
    }
}

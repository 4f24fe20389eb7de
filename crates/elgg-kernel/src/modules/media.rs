use std::sync::Arc;

use elgg_config::ImageProcessor;
use elgg_di::{DIContainer, DIResult, ServiceModule};
use elgg_services::media::{DiskFilestore, EntityIconService, TempDiskFilestore, UploadService};
use elgg_services::{ImageBackend, ImageService};
use tracing::warn;

use super::{config, runtime, SEEDED};
use crate::names;

/// Files on disk, uploads and images
pub struct MediaModule;

impl ServiceModule for MediaModule {
    fn name(&self) -> &'static str {
        "media"
    }

    fn priority(&self) -> u32 {
        60
    }

    fn requires(&self) -> &[&'static str] {
        SEEDED
    }

    fn register(&self, container: &DIContainer) -> DIResult<()> {
        container.define(names::FILESTORE, |c| {
            Ok(Arc::new(DiskFilestore::new(config(c)?.dataroot.clone())))
        })?;

        container.define_type::<TempDiskFilestore>(names::TEMP_FILESTORE)?;

        container.define(names::IMAGE_SERVICE, |c| {
            let config = config(c)?;
            let backend = match config.image_processor {
                ImageProcessor::Imagick if runtime(c)?.has_extension("imagick") => {
                    ImageBackend::Imagick
                }
                ImageProcessor::Imagick => {
                    warn!("imagick is not available, falling back to gd");
                    ImageBackend::Gd
                }
                ImageProcessor::Gd => ImageBackend::Gd,
            };
            Ok(Arc::new(ImageService::new(backend, config)))
        })?;

        container.define(names::UPLOADS, |c| {
            Ok(Arc::new(UploadService::new(
                c.resolve(names::REQUEST)?,
                c.resolve(names::IMAGE_SERVICE)?,
            )))
        })?;

        container.define(names::ICON_SERVICE, |c| {
            Ok(Arc::new(EntityIconService {
                config: config(c)?,
                hooks: c.resolve(names::HOOKS)?,
                request: c.resolve(names::REQUEST)?,
                logger: c.resolve(names::LOGGER)?,
                entities: c.resolve(names::ENTITY_TABLE)?,
                uploads: c.resolve(names::UPLOADS)?,
            }))
        })?;

        Ok(())
    }
}

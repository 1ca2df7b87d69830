use ash::vk;

use crate::types::{Format, ImageViewInfo};

/// Implemented by objects whose lifetime is bounded by an owning image.
///
/// When an image relocates (see [`crate::image::Image::take`]) every
/// registered dependent is rebound to the destination so that it no longer
/// references the moved-from object.
pub trait ImageDependent {
    fn set_owning_image(&mut self, image: vk::Image);
}

/// A typed window onto a subresource range of an owning image.
///
/// The raw `vk::ImageView` is created and destroyed by the backend (see
/// `vulkan::Context::make_view`); a view constructed directly carries a null
/// raw handle, which is enough for layout and lifetime bookkeeping.
#[derive(Debug, Clone)]
pub struct ImageView {
    image: vk::Image,
    format: Format,
    range: ImageViewInfo,
    raw: vk::ImageView,
}

impl ImageView {
    pub fn new(image: vk::Image, format: Format, range: ImageViewInfo) -> Self {
        Self {
            image,
            format,
            range,
            raw: vk::ImageView::null(),
        }
    }

    pub(crate) fn with_raw(
        image: vk::Image,
        format: Format,
        range: ImageViewInfo,
        raw: vk::ImageView,
    ) -> Self {
        Self {
            image,
            format,
            range,
            raw,
        }
    }

    /// Handle of the image this view currently considers its owner.
    pub fn image(&self) -> vk::Image {
        self.image
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn range(&self) -> &ImageViewInfo {
        &self.range
    }

    pub fn raw(&self) -> vk::ImageView {
        self.raw
    }
}

impl ImageDependent for ImageView {
    fn set_owning_image(&mut self, image: vk::Image) {
        self.image = image;
    }
}

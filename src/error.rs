use std::fmt;

use ash::vk;

use crate::types::Extent3D;

#[derive(Debug)]
pub enum ResourceError {
    /// The extent does not classify as a 1D, 2D, or 3D image.
    InvalidExtent(Extent3D),
    /// The allocator refused to create the image; carries the underlying status.
    AllocationFailed(vk::Result),
    /// The allocator refused to map, or the image has no backing allocation.
    MapFailed(vk::Result),
    /// A resource pool ran out of slots.
    SlotError(),
    /// Raw status from a backend call outside the allocation protocol.
    VulkanError(vk::Result),
    UnsupportedFormat(vk::Format),
    LoadingError(ash::LoadingError),
}

/// Convenient crate-wide result type.
pub type Result<T, E = ResourceError> = std::result::Result<T, E>;

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::InvalidExtent(extent) => {
                write!(
                    f,
                    "no image type for extent {}x{}x{}",
                    extent.width, extent.height, extent.depth
                )
            }
            ResourceError::AllocationFailed(res) => {
                write!(f, "cannot create image: {}", res)
            }
            ResourceError::MapFailed(res) => write!(f, "cannot map image memory: {}", res),
            ResourceError::SlotError() => write!(f, "ran out of slots!"),
            ResourceError::VulkanError(res) => write!(f, "vulkan error: {}", res),
            ResourceError::UnsupportedFormat(fmt) => write!(f, "unsupported format: {:?}", fmt),
            ResourceError::LoadingError(err) => write!(f, "loading error: {}", err),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<vk::Result> for ResourceError {
    fn from(res: vk::Result) -> Self {
        return ResourceError::VulkanError(res);
    }
}

impl From<ash::LoadingError> for ResourceError {
    fn from(res: ash::LoadingError) -> Self {
        return ResourceError::LoadingError(res);
    }
}

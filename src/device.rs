use ash::vk;

use crate::types::{ImageDesc, MemoryInfo};

/// Memory-allocator capability consumed by [`crate::image::Image`].
///
/// The contract mirrors the VMA image entry points: `create_image` produces
/// the device-side handle and its backing allocation as a unit, and
/// `destroy_image` releases both as a unit. Status codes are raw
/// [`vk::Result`] values; the image wraps them into its own error kinds.
pub trait MemoryAllocator {
    /// Opaque token identifying backing memory.
    type Allocation;

    fn create_image(
        &self,
        desc: &ImageDesc,
        memory: &MemoryInfo,
    ) -> Result<(vk::Image, Self::Allocation), vk::Result>;

    fn destroy_image(&self, image: vk::Image, allocation: &mut Self::Allocation);

    fn map_memory(&self, allocation: &mut Self::Allocation) -> Result<*mut u8, vk::Result>;

    fn unmap_memory(&self, allocation: &mut Self::Allocation);
}

/// Device capability consumed by [`crate::image::Image`].
pub trait Device {
    type Allocator: MemoryAllocator;

    fn memory_allocator(&self) -> &Self::Allocator;

    /// Blocks until the device finishes all in-flight work. The image core
    /// never calls this itself; callers recreating a swapchain do, before
    /// tearing down images still referenced by the GPU.
    fn wait_idle(&self);
}

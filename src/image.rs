use std::collections::HashSet;
use std::mem;
use std::ptr;

use ash::vk;
use log::warn;

use crate::device::{Device, MemoryAllocator};
use crate::error::{ResourceError, Result};
use crate::types::{
    Extent3D, Format, ImageDesc, ImageInfo, ImageType, ImageUsage, MemoryFlags, MemoryInfo,
    SampleCount, Subresource, Tiling,
};
use crate::utils::{Handle, Pool};
use crate::view::{ImageDependent, ImageView};

/// Derives the dimensionality tag from an extent.
///
/// Width and height count as present when at least 1; depth counts only when
/// strictly greater than 1, so `depth == 1` still classifies as 2D. The
/// asymmetry is deliberate.
pub fn infer_image_type(extent: Extent3D) -> Result<ImageType> {
    let mut dim_num = 0u32;

    if extent.width >= 1 {
        dim_num += 1;
    }
    if extent.height >= 1 {
        dim_num += 1;
    }
    if extent.depth > 1 {
        dim_num += 1;
    }

    match dim_num {
        1 => Ok(ImageType::D1),
        2 => Ok(ImageType::D2),
        3 => Ok(ImageType::D3),
        _ => Err(ResourceError::InvalidExtent(extent)),
    }
}

/// Whether this image is responsible for releasing its handle and backing
/// memory. Borrowed images (swapchain wraps, moved-from husks) release
/// nothing on drop.
enum ImageMemory<A> {
    Owned(A),
    Borrowed,
}

/// A device-side image together with its backing allocation and the set of
/// views that depend on it.
///
/// The resource makes no internal synchronization promises; one thread owns
/// an image and everything reachable from it. Map, unmap, view registration,
/// and destruction are not re-entrant against one another on the same image.
pub struct Image<'a, D: Device, V: ImageDependent = ImageView> {
    device: &'a D,
    handle: vk::Image,
    memory: ImageMemory<<D::Allocator as MemoryAllocator>::Allocation>,
    ty: ImageType,
    extent: Extent3D,
    format: Format,
    sample_count: SampleCount,
    usage: ImageUsage,
    tiling: Tiling,
    subresource: Subresource,
    mapped_ptr: *mut u8,
    views: HashSet<Handle<V>>,
}

impl<'a, D: Device, V: ImageDependent> Image<'a, D, V> {
    /// Creates an image and allocates backing memory for it.
    ///
    /// A `TRANSIENT_ATTACHMENT` usage asks the allocator to prefer lazily
    /// allocated memory, which permits tile-local storage on tiled GPUs.
    pub fn new(device: &'a D, info: &ImageInfo) -> Result<Self> {
        assert!(info.mip_levels >= 1, "image requires at least one mip level");
        assert!(info.layers >= 1, "image requires at least one array layer");

        let ty = infer_image_type(info.extent)?;

        let desc = ImageDesc {
            ty,
            extent: info.extent,
            format: info.format,
            mip_levels: info.mip_levels,
            array_layers: info.layers,
            samples: info.samples,
            tiling: info.tiling,
            usage: info.usage,
        };

        let mut memory_info = MemoryInfo {
            usage: info.memory_usage,
            preferred_flags: MemoryFlags::empty(),
        };

        if info.usage.contains(ImageUsage::TRANSIENT_ATTACHMENT) {
            memory_info.preferred_flags |= MemoryFlags::LAZILY_ALLOCATED;
        }

        let (handle, allocation) = device
            .memory_allocator()
            .create_image(&desc, &memory_info)
            .map_err(ResourceError::AllocationFailed)?;

        Ok(Self {
            device,
            handle,
            memory: ImageMemory::Owned(allocation),
            ty,
            extent: info.extent,
            format: info.format,
            sample_count: info.samples,
            usage: info.usage,
            tiling: info.tiling,
            subresource: Subresource {
                mip_levels: info.mip_levels,
                array_layers: info.layers,
            },
            mapped_ptr: ptr::null_mut(),
            views: HashSet::new(),
        })
    }

    /// Wraps an externally owned handle, typically a swapchain image.
    ///
    /// The resulting image is borrowed: dropping it releases neither the
    /// handle nor any memory.
    pub fn from_raw(
        device: &'a D,
        handle: vk::Image,
        extent: Extent3D,
        format: Format,
        usage: ImageUsage,
    ) -> Result<Self> {
        let ty = infer_image_type(extent)?;

        Ok(Self {
            device,
            handle,
            memory: ImageMemory::Borrowed,
            ty,
            extent,
            format,
            sample_count: SampleCount::S1,
            usage,
            tiling: Tiling::Optimal,
            subresource: Subresource {
                mip_levels: 1,
                array_layers: 1,
            },
            mapped_ptr: ptr::null_mut(),
            views: HashSet::new(),
        })
    }

    /// Moves `other` into a fresh image, leaving `other` inert.
    ///
    /// Every view registered with `other` and still live in `views` is
    /// rebound to the destination before this returns. Dropping the source
    /// afterwards releases nothing.
    pub fn take(other: &mut Self, views: &mut Pool<V>) -> Self {
        let taken = Self {
            device: other.device,
            handle: mem::replace(&mut other.handle, vk::Image::null()),
            memory: mem::replace(&mut other.memory, ImageMemory::Borrowed),
            ty: other.ty,
            extent: other.extent,
            format: other.format,
            sample_count: other.sample_count,
            usage: other.usage,
            tiling: other.tiling,
            subresource: other.subresource,
            mapped_ptr: mem::replace(&mut other.mapped_ptr, ptr::null_mut()),
            views: mem::take(&mut other.views),
        };

        for handle in &taken.views {
            if let Some(view) = views.get_mut_ref(*handle) {
                view.set_owning_image(taken.handle);
            }
        }

        taken
    }

    /// Returns a host-visible pointer to the image memory, mapping it on
    /// first use. Idempotent: repeated calls return the same pointer without
    /// touching the allocator again.
    ///
    /// Mapping a non-linear image is undefined on most devices but not
    /// refused; inspecting memory on unified-memory hardware is a legitimate
    /// use. A warning is logged instead.
    pub fn map(&mut self) -> Result<*mut u8> {
        if self.mapped_ptr.is_null() {
            if self.tiling != Tiling::Linear {
                warn!("mapping image memory that is not linear");
            }

            let allocation = match self.memory {
                ImageMemory::Owned(ref mut allocation) => allocation,
                ImageMemory::Borrowed => {
                    return Err(ResourceError::MapFailed(vk::Result::ERROR_MEMORY_MAP_FAILED))
                }
            };

            self.mapped_ptr = self
                .device
                .memory_allocator()
                .map_memory(allocation)
                .map_err(ResourceError::MapFailed)?;
        }
        Ok(self.mapped_ptr)
    }

    /// Releases the host mapping. No-op if the image is not mapped.
    pub fn unmap(&mut self) {
        if self.mapped_ptr.is_null() {
            return;
        }
        if let ImageMemory::Owned(ref mut allocation) = self.memory {
            self.device.memory_allocator().unmap_memory(allocation);
        }
        self.mapped_ptr = ptr::null_mut();
    }

    /// Inserts `view` into the caller's pool and registers it with this
    /// image.
    pub fn attach_view(&mut self, pool: &mut Pool<V>, view: V) -> Result<Handle<V>> {
        let handle = pool.insert(view).ok_or(ResourceError::SlotError())?;
        self.views.insert(handle);
        Ok(handle)
    }

    /// Deregisters `handle` and releases it from the caller's pool.
    pub fn detach_view(&mut self, pool: &mut Pool<V>, handle: Handle<V>) -> Option<V> {
        if self.views.remove(&handle) {
            pool.release(handle)
        } else {
            None
        }
    }

    pub fn device(&self) -> &D {
        self.device
    }

    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    /// The backing allocation, or `None` for borrowed and moved-from images.
    pub fn memory(&self) -> Option<&<D::Allocator as MemoryAllocator>::Allocation> {
        match self.memory {
            ImageMemory::Owned(ref allocation) => Some(allocation),
            ImageMemory::Borrowed => None,
        }
    }

    pub fn image_type(&self) -> ImageType {
        self.ty
    }

    pub fn extent(&self) -> Extent3D {
        self.extent
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    pub fn usage(&self) -> ImageUsage {
        self.usage
    }

    pub fn tiling(&self) -> Tiling {
        self.tiling
    }

    pub fn subresource(&self) -> Subresource {
        self.subresource
    }

    pub fn is_mapped(&self) -> bool {
        !self.mapped_ptr.is_null()
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.memory, ImageMemory::Owned(_))
    }

    /// Views currently registered as depending on this image.
    pub fn views(&self) -> &HashSet<Handle<V>> {
        &self.views
    }

    /// Mutable access to the view set. Registration and deregistration are
    /// the view's responsibility; the image reads the set only during
    /// [`Image::take`].
    pub fn views_mut(&mut self) -> &mut HashSet<Handle<V>> {
        &mut self.views
    }
}

impl<'a, D: Device, V: ImageDependent> Drop for Image<'a, D, V> {
    fn drop(&mut self) {
        if self.handle == vk::Image::null() {
            return;
        }
        self.unmap();
        if let ImageMemory::Owned(ref mut allocation) = self.memory {
            self.device
                .memory_allocator()
                .destroy_image(self.handle, allocation);
        }
    }
}

use bitflags::bitflags;

#[cfg(feature = "vkimg-serde")]
use serde::{Deserialize, Serialize};

/// Image dimensions in texels. `depth == 1` denotes a 2D image, not a
/// degenerate 3D one; see [`crate::image::infer_image_type`].
#[derive(Debug, Hash, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3D {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// Dimensionality tag, derived from the extent at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub enum ImageType {
    D1,
    D2,
    D3,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub enum Format {
    R8Sint,
    R8Uint,
    RGB8,
    BGRA8,
    BGRA8Unorm,
    #[default]
    RGBA8,
    RGBA8Unorm,
    RGBA32F,
    D24S8,
}

#[derive(Hash, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub enum SampleCount {
    #[default]
    S1,
    S2,
    S4,
}

/// Memory layout of the image. Only [`Tiling::Linear`] images have a
/// host-addressable layout; mapping anything else is best-effort.
#[derive(Hash, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub enum Tiling {
    #[default]
    Optimal,
    Linear,
}

bitflags! {
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC            = 0x1;
        const TRANSFER_DST            = 0x2;
        const SAMPLED                 = 0x4;
        const STORAGE                 = 0x8;
        const COLOR_ATTACHMENT        = 0x10;
        const DEPTH_STENCIL_ATTACHMENT = 0x20;
        const TRANSIENT_ATTACHMENT    = 0x40;
        const INPUT_ATTACHMENT        = 0x80;
    }
}

bitflags! {
    /// Memory property bits the allocator should prefer but may ignore.
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryFlags: u32 {
        const DEVICE_LOCAL     = 0x1;
        const HOST_VISIBLE     = 0x2;
        const LAZILY_ALLOCATED = 0x4;
    }
}

/// Where the backing memory should live, as a hint to the allocator.
#[derive(Hash, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub enum MemoryUsage {
    Unknown,
    #[default]
    GpuOnly,
    CpuOnly,
    CpuToGpu,
    GpuToCpu,
}

/// Allocation request accompanying [`ImageDesc`] into the allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub usage: MemoryUsage,
    pub preferred_flags: MemoryFlags,
}

/// Mip and layer counts of an image, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub struct Subresource {
    pub mip_levels: u32,
    pub array_layers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub enum AspectMask {
    Color,
    Depth,
    Stencil,
    DepthStencil,
}

/// Owning-construction parameters for [`crate::image::Image`].
pub struct ImageInfo<'a> {
    pub debug_name: &'a str,
    pub extent: Extent3D,
    pub format: Format,
    pub usage: ImageUsage,
    pub memory_usage: MemoryUsage,
    pub samples: SampleCount,
    pub mip_levels: u32,
    pub layers: u32,
    pub tiling: Tiling,
}

impl<'a> Default for ImageInfo<'a> {
    fn default() -> Self {
        Self {
            debug_name: "",
            extent: Extent3D::new(1280, 1024, 1),
            format: Format::RGBA8,
            usage: ImageUsage::TRANSFER_SRC
                | ImageUsage::TRANSFER_DST
                | ImageUsage::SAMPLED
                | ImageUsage::COLOR_ATTACHMENT,
            memory_usage: MemoryUsage::GpuOnly,
            samples: SampleCount::S1,
            mip_levels: 1,
            layers: 1,
            tiling: Tiling::Optimal,
        }
    }
}

/// Resolved immutable descriptor handed to
/// [`crate::device::MemoryAllocator::create_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub ty: ImageType,
    pub extent: Extent3D,
    pub format: Format,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: SampleCount,
    pub tiling: Tiling,
    pub usage: ImageUsage,
}

/// Subresource window an [`crate::view::ImageView`] interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "vkimg-serde", derive(Serialize, Deserialize))]
pub struct ImageViewInfo {
    pub aspect: AspectMask,
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl Default for ImageViewInfo {
    fn default() -> Self {
        Self {
            aspect: AspectMask::Color,
            base_mip: 0,
            mip_count: 1,
            base_layer: 0,
            layer_count: 1,
        }
    }
}

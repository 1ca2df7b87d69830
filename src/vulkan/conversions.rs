use ash::vk;

use crate::error::ResourceError;
use crate::types::{
    AspectMask, Extent3D, Format, ImageType, ImageUsage, MemoryFlags, MemoryInfo, MemoryUsage,
    SampleCount, Tiling,
};

impl From<Extent3D> for vk::Extent3D {
    fn from(extent: Extent3D) -> Self {
        vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: extent.depth,
        }
    }
}

impl From<ImageType> for vk::ImageType {
    fn from(ty: ImageType) -> Self {
        match ty {
            ImageType::D1 => vk::ImageType::TYPE_1D,
            ImageType::D2 => vk::ImageType::TYPE_2D,
            ImageType::D3 => vk::ImageType::TYPE_3D,
        }
    }
}

impl From<ImageType> for vk::ImageViewType {
    fn from(ty: ImageType) -> Self {
        match ty {
            ImageType::D1 => vk::ImageViewType::TYPE_1D,
            ImageType::D2 => vk::ImageViewType::TYPE_2D,
            ImageType::D3 => vk::ImageViewType::TYPE_3D,
        }
    }
}

impl From<SampleCount> for vk::SampleCountFlags {
    fn from(samples: SampleCount) -> Self {
        match samples {
            SampleCount::S1 => vk::SampleCountFlags::TYPE_1,
            SampleCount::S2 => vk::SampleCountFlags::TYPE_2,
            SampleCount::S4 => vk::SampleCountFlags::TYPE_4,
        }
    }
}

impl From<Tiling> for vk::ImageTiling {
    fn from(tiling: Tiling) -> Self {
        match tiling {
            Tiling::Optimal => vk::ImageTiling::OPTIMAL,
            Tiling::Linear => vk::ImageTiling::LINEAR,
        }
    }
}

impl From<AspectMask> for vk::ImageAspectFlags {
    fn from(value: AspectMask) -> Self {
        match value {
            AspectMask::Color => vk::ImageAspectFlags::COLOR,
            AspectMask::Depth => vk::ImageAspectFlags::DEPTH,
            AspectMask::Stencil => vk::ImageAspectFlags::STENCIL,
            AspectMask::DepthStencil => vk::ImageAspectFlags::STENCIL | vk::ImageAspectFlags::DEPTH,
        }
    }
}

impl From<ImageUsage> for vk::ImageUsageFlags {
    fn from(usage: ImageUsage) -> Self {
        let mut flags = vk::ImageUsageFlags::empty();
        if usage.contains(ImageUsage::TRANSFER_SRC) {
            flags |= vk::ImageUsageFlags::TRANSFER_SRC;
        }
        if usage.contains(ImageUsage::TRANSFER_DST) {
            flags |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        if usage.contains(ImageUsage::SAMPLED) {
            flags |= vk::ImageUsageFlags::SAMPLED;
        }
        if usage.contains(ImageUsage::STORAGE) {
            flags |= vk::ImageUsageFlags::STORAGE;
        }
        if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
            flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }
        if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
            flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        if usage.contains(ImageUsage::TRANSIENT_ATTACHMENT) {
            flags |= vk::ImageUsageFlags::TRANSIENT_ATTACHMENT;
        }
        if usage.contains(ImageUsage::INPUT_ATTACHMENT) {
            flags |= vk::ImageUsageFlags::INPUT_ATTACHMENT;
        }
        flags
    }
}

impl From<MemoryFlags> for vk::MemoryPropertyFlags {
    fn from(flags: MemoryFlags) -> Self {
        let mut vk_flags = vk::MemoryPropertyFlags::empty();
        if flags.contains(MemoryFlags::DEVICE_LOCAL) {
            vk_flags |= vk::MemoryPropertyFlags::DEVICE_LOCAL;
        }
        if flags.contains(MemoryFlags::HOST_VISIBLE) {
            vk_flags |= vk::MemoryPropertyFlags::HOST_VISIBLE;
        }
        if flags.contains(MemoryFlags::LAZILY_ALLOCATED) {
            vk_flags |= vk::MemoryPropertyFlags::LAZILY_ALLOCATED;
        }
        vk_flags
    }
}

pub(super) fn lib_to_vk_image_format(fmt: &Format) -> vk::Format {
    match fmt {
        Format::RGB8 => vk::Format::R8G8B8_SRGB,
        Format::RGBA32F => vk::Format::R32G32B32A32_SFLOAT,
        Format::RGBA8 => vk::Format::R8G8B8A8_SRGB,
        Format::BGRA8 => vk::Format::B8G8R8A8_SRGB,
        Format::BGRA8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::D24S8 => vk::Format::D24_UNORM_S8_UINT,
        Format::R8Uint => vk::Format::R8_UINT,
        Format::R8Sint => vk::Format::R8_SINT,
        Format::RGBA8Unorm => vk::Format::R8G8B8A8_UNORM,
    }
}

pub(super) fn vk_to_lib_image_format(fmt: vk::Format) -> Result<Format, ResourceError> {
    match fmt {
        vk::Format::R8G8B8_SRGB => Ok(Format::RGB8),
        vk::Format::R32G32B32A32_SFLOAT => Ok(Format::RGBA32F),
        vk::Format::R8G8B8A8_SRGB => Ok(Format::RGBA8),
        vk::Format::B8G8R8A8_SRGB => Ok(Format::BGRA8),
        vk::Format::B8G8R8A8_UNORM => Ok(Format::BGRA8Unorm),
        vk::Format::R8G8B8A8_UNORM => Ok(Format::RGBA8Unorm),
        vk::Format::D24_UNORM_S8_UINT => Ok(Format::D24S8),
        vk::Format::R8_SINT => Ok(Format::R8Sint),
        vk::Format::R8_UINT => Ok(Format::R8Uint),
        other => Err(ResourceError::UnsupportedFormat(other)),
    }
}

/// Translates the allocator-facing memory request into VMA terms. Uses the
/// VMA 3 auto usages, with host-access flags for anything the CPU touches.
pub(super) fn lib_to_vma_memory_info(memory: &MemoryInfo) -> vk_mem::AllocationCreateInfo {
    let (usage, flags) = match memory.usage {
        MemoryUsage::Unknown => (vk_mem::MemoryUsage::Auto, vk_mem::AllocationCreateFlags::empty()),
        MemoryUsage::GpuOnly => (
            vk_mem::MemoryUsage::AutoPreferDevice,
            vk_mem::AllocationCreateFlags::empty(),
        ),
        MemoryUsage::CpuOnly | MemoryUsage::GpuToCpu => (
            vk_mem::MemoryUsage::AutoPreferHost,
            vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM,
        ),
        MemoryUsage::CpuToGpu => (
            vk_mem::MemoryUsage::AutoPreferHost,
            vk_mem::AllocationCreateFlags::HOST_ACCESS_RANDOM,
        ),
    };

    vk_mem::AllocationCreateInfo {
        usage,
        flags,
        preferred_flags: memory.preferred_flags.into(),
        ..Default::default()
    }
}

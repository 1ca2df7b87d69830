use std::ffi::{c_char, c_void, CStr};
use std::mem::ManuallyDrop;

use ash::*;
use vk_mem::Alloc;

use crate::device::MemoryAllocator;
use crate::error::{ResourceError, Result};
use crate::image::Image;
use crate::types::{Extent3D, ImageDesc, ImageUsage, ImageViewInfo, MemoryInfo};
use crate::view::{ImageDependent, ImageView};

mod conversions;
pub use conversions::*;

/// Names of debugging layers that should be enabled when validation is requested.
/// Only includes the standard Vulkan validation layer to avoid enabling any extra layers.
pub const DEBUG_LAYER_NAMES: [*const c_char; 1] =
    [b"VK_LAYER_KHRONOS_validation\0".as_ptr() as *const c_char];

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let message = unsafe { CStr::from_ptr((*p_callback_data).p_message) };
    eprintln!(
        "[{:?}][{:?}] {}",
        message_severity,
        message_type,
        message.to_string_lossy()
    );
    vk::FALSE
}

/// Backend selection parameters.
#[derive(Default)]
pub struct ContextInfo {
    pub device_id: usize,
}

#[derive(Default)]
#[allow(dead_code)]
pub(crate) struct Queue {
    queue: vk::Queue,
    family: u32,
}

/// Headless Vulkan device backed by a VMA allocator.
///
/// Implements the [`crate::Device`] capability, so [`Image`]s constructed
/// against it allocate through VMA. Swapchain plumbing is out of scope here;
/// callers wrap presentation-engine images via [`Image::from_raw`].
pub struct Context {
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    #[allow(dead_code)]
    pdevice: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    device: ash::Device,
    allocator: ManuallyDrop<vk_mem::Allocator>,
    #[allow(dead_code)]
    gfx_queue: Queue,
    debug_utils: Option<ash::extensions::ext::DebugUtils>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Context {
    /// Constructs a context without any windowing support.
    ///
    /// Validation layers are enabled when the `VKIMG_VALIDATION` environment
    /// variable is set to `1`.
    pub fn headless(info: &ContextInfo) -> Result<Self> {
        let enable_validation = std::env::var("VKIMG_VALIDATION")
            .map(|v| v == "1")
            .unwrap_or(false);

        let app_info = vk::ApplicationInfo {
            api_version: vk::make_api_version(0, 1, 3, 0),
            ..Default::default()
        };

        let entry = unsafe { Entry::load() }?;

        let mut inst_exts = Vec::new();
        if enable_validation {
            inst_exts.push(ash::extensions::ext::DebugUtils::name().as_ptr());
        }

        let mut inst_layers = Vec::new();
        if enable_validation {
            let available_layers = entry.enumerate_instance_layer_properties()?;
            for &layer in &DEBUG_LAYER_NAMES {
                let name = unsafe { CStr::from_ptr(layer) };
                if available_layers
                    .iter()
                    .any(|prop| unsafe { CStr::from_ptr(prop.layer_name.as_ptr()) == name })
                {
                    inst_layers.push(layer);
                }
            }
        }

        let instance = unsafe {
            entry.create_instance(
                &vk::InstanceCreateInfo::builder()
                    .application_info(&app_info)
                    .enabled_extension_names(&inst_exts)
                    .enabled_layer_names(&inst_layers)
                    .build(),
                None,
            )
        }?;

        let pdevices = unsafe { instance.enumerate_physical_devices() }?;
        let pdevice = pdevices
            .get(info.device_id)
            .copied()
            .ok_or(ResourceError::VulkanError(
                vk::Result::ERROR_INITIALIZATION_FAILED,
            ))?;
        let properties = unsafe { instance.get_physical_device_properties(pdevice) };

        let queue_prop = unsafe { instance.get_physical_device_queue_family_properties(pdevice) };
        let mut gfx_family = None;
        for (idx, prop) in queue_prop.iter().enumerate() {
            if prop.queue_flags.contains(vk::QueueFlags::GRAPHICS) && gfx_family.is_none() {
                gfx_family = Some(idx as u32);
            }
        }
        let gfx_family = gfx_family.ok_or(ResourceError::VulkanError(
            vk::Result::ERROR_INITIALIZATION_FAILED,
        ))?;

        let priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(gfx_family)
            .queue_priorities(&priorities)
            .build()];

        let device = unsafe {
            instance.create_device(
                pdevice,
                &vk::DeviceCreateInfo::builder()
                    .queue_create_infos(&queue_infos)
                    .build(),
                None,
            )
        }?;

        let gfx_queue = Queue {
            queue: unsafe { device.get_device_queue(gfx_family, 0) },
            family: gfx_family,
        };

        let allocator = vk_mem::Allocator::new(vk_mem::AllocatorCreateInfo::new(
            &instance, &device, pdevice,
        ))?;

        let (debug_utils, debug_messenger) = if enable_validation {
            let debug_utils = ash::extensions::ext::DebugUtils::new(&entry, &instance);
            let messenger = unsafe {
                debug_utils.create_debug_utils_messenger(
                    &vk::DebugUtilsMessengerCreateInfoEXT::builder()
                        .message_severity(
                            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                        )
                        .message_type(
                            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                        )
                        .pfn_user_callback(Some(vulkan_debug_callback))
                        .build(),
                    None,
                )
            }?;
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            pdevice,
            properties,
            device,
            allocator: ManuallyDrop::new(allocator),
            gfx_queue,
            debug_utils,
            debug_messenger,
        })
    }

    pub fn device_name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_str()
            .unwrap_or("UNKNOWN")
            .to_string()
    }

    pub fn ash_device(&self) -> &ash::Device {
        &self.device
    }

    /// Wraps a presentation-engine image, e.g. one returned by
    /// `vkGetSwapchainImagesKHR`, whose format is reported in Vulkan terms.
    ///
    /// The image is borrowed; dropping it releases nothing.
    pub fn adopt_image<V: ImageDependent>(
        &self,
        handle: vk::Image,
        extent: Extent3D,
        format: vk::Format,
        usage: ImageUsage,
    ) -> Result<Image<'_, Self, V>> {
        Image::from_raw(self, handle, extent, vk_to_lib_image_format(format)?, usage)
    }

    /// Creates a device-side view over `image` and returns the bookkeeping
    /// object to register with it.
    pub fn make_view<V: ImageDependent>(
        &self,
        image: &Image<'_, Self, V>,
        info: &ImageViewInfo,
    ) -> Result<ImageView> {
        let raw = unsafe {
            self.device.create_image_view(
                &vk::ImageViewCreateInfo::builder()
                    .image(image.handle())
                    .view_type(image.image_type().into())
                    .format(lib_to_vk_image_format(&image.format()))
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: info.aspect.into(),
                        base_mip_level: info.base_mip,
                        level_count: info.mip_count,
                        base_array_layer: info.base_layer,
                        layer_count: info.layer_count,
                    })
                    .build(),
                None,
            )
        }?;

        Ok(ImageView::with_raw(
            image.handle(),
            image.format(),
            *info,
            raw,
        ))
    }

    pub fn destroy_view(&self, view: &ImageView) {
        if view.raw() != vk::ImageView::null() {
            unsafe { self.device.destroy_image_view(view.raw(), None) };
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let (Some(utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger) {
            unsafe {
                utils.destroy_debug_utils_messenger(messenger, None);
            }
        }
        unsafe {
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

impl crate::device::Device for Context {
    type Allocator = vk_mem::Allocator;

    fn memory_allocator(&self) -> &vk_mem::Allocator {
        &self.allocator
    }

    fn wait_idle(&self) {
        unsafe { self.device.device_wait_idle().unwrap() };
    }
}

impl MemoryAllocator for vk_mem::Allocator {
    type Allocation = vk_mem::Allocation;

    fn create_image(
        &self,
        desc: &ImageDesc,
        memory: &MemoryInfo,
    ) -> std::result::Result<(vk::Image, vk_mem::Allocation), vk::Result> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(desc.ty.into())
            .format(lib_to_vk_image_format(&desc.format))
            .extent(desc.extent.into())
            .mip_levels(desc.mip_levels)
            .array_layers(desc.array_layers)
            .samples(desc.samples.into())
            .tiling(desc.tiling.into())
            .usage(desc.usage.into())
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .build();

        unsafe { Alloc::create_image(self, &image_info, &lib_to_vma_memory_info(memory)) }
    }

    fn destroy_image(&self, image: vk::Image, allocation: &mut vk_mem::Allocation) {
        unsafe { vk_mem::Allocator::destroy_image(self, image, allocation) };
    }

    fn map_memory(
        &self,
        allocation: &mut vk_mem::Allocation,
    ) -> std::result::Result<*mut u8, vk::Result> {
        unsafe { vk_mem::Allocator::map_memory(self, allocation) }
    }

    fn unmap_memory(&self, allocation: &mut vk_mem::Allocation) {
        unsafe { vk_mem::Allocator::unmap_memory(self, allocation) };
    }
}

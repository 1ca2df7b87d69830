use std::cell::{Cell, RefCell};
use std::sync::{Mutex, Once};

use ash::vk;
use ash::vk::Handle as VkHandle;
use serial_test::serial;

use vkimg::{
    Device, Extent3D, Format, Image, ImageDependent, ImageInfo, MemoryAllocator, MemoryFlags,
    MemoryInfo, MemoryUsage, ImageDesc, ImageType, ImageUsage, Pool, ResourceError, SampleCount,
    Tiling,
};

#[derive(Debug, Clone, PartialEq)]
enum AllocatorCall {
    CreateImage { image: u64, memory: MemoryInfo },
    DestroyImage { image: u64, allocation: u64 },
    MapMemory { allocation: u64 },
    UnmapMemory { allocation: u64 },
}

struct MockAllocation {
    id: u64,
    backing: Box<[u8]>,
}

/// Records every allocator entry point so tests can assert on call counts
/// and ordering. Single-threaded by design, like the resources it backs.
#[derive(Default)]
struct MockAllocator {
    calls: RefCell<Vec<AllocatorCall>>,
    next_id: Cell<u64>,
    fail_create: Cell<Option<vk::Result>>,
    fail_map: Cell<Option<vk::Result>>,
}

impl MockAllocator {
    fn calls(&self) -> Vec<AllocatorCall> {
        self.calls.borrow().clone()
    }

    fn count(&self, pred: impl Fn(&AllocatorCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }
}

impl MemoryAllocator for MockAllocator {
    type Allocation = MockAllocation;

    fn create_image(
        &self,
        desc: &ImageDesc,
        memory: &MemoryInfo,
    ) -> Result<(vk::Image, MockAllocation), vk::Result> {
        if let Some(err) = self.fail_create.get() {
            return Err(err);
        }

        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let texels = desc.extent.width.max(1) as usize
            * desc.extent.height.max(1) as usize
            * desc.extent.depth.max(1) as usize;
        let backing = vec![0u8; texels * 4].into_boxed_slice();

        self.calls.borrow_mut().push(AllocatorCall::CreateImage {
            image: id,
            memory: *memory,
        });

        Ok((vk::Image::from_raw(id), MockAllocation { id, backing }))
    }

    fn destroy_image(&self, image: vk::Image, allocation: &mut MockAllocation) {
        self.calls.borrow_mut().push(AllocatorCall::DestroyImage {
            image: image.as_raw(),
            allocation: allocation.id,
        });
    }

    fn map_memory(&self, allocation: &mut MockAllocation) -> Result<*mut u8, vk::Result> {
        if let Some(err) = self.fail_map.get() {
            return Err(err);
        }
        self.calls.borrow_mut().push(AllocatorCall::MapMemory {
            allocation: allocation.id,
        });
        Ok(allocation.backing.as_mut_ptr())
    }

    fn unmap_memory(&self, allocation: &mut MockAllocation) {
        self.calls.borrow_mut().push(AllocatorCall::UnmapMemory {
            allocation: allocation.id,
        });
    }
}

#[derive(Default)]
struct MockDevice {
    allocator: MockAllocator,
}

impl Device for MockDevice {
    type Allocator = MockAllocator;

    fn memory_allocator(&self) -> &MockAllocator {
        &self.allocator
    }

    fn wait_idle(&self) {}
}

#[derive(Default)]
struct MockView {
    image: vk::Image,
    rebinds: u32,
}

impl ImageDependent for MockView {
    fn set_owning_image(&mut self, image: vk::Image) {
        self.image = image;
        self.rebinds += 1;
    }
}

fn make_image<'a>(device: &'a MockDevice, info: &ImageInfo) -> Image<'a, MockDevice, MockView> {
    Image::new(device, info).expect("image construction failed")
}

struct CaptureLogger;

static CAPTURED_WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());
static LOGGER: CaptureLogger = CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if record.level() == log::Level::Warn {
            CAPTURED_WARNINGS
                .lock()
                .unwrap()
                .push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

fn install_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Warn);
    });
    CAPTURED_WARNINGS.lock().unwrap().clear();
}

fn captured_warnings() -> Vec<String> {
    CAPTURED_WARNINGS.lock().unwrap().clone()
}

#[test]
fn owning_image_creates_and_destroys_once() {
    let device = MockDevice::default();
    let handle;
    {
        let img = make_image(
            &device,
            &ImageInfo {
                debug_name: "color_attachment",
                extent: Extent3D::new(1024, 1024, 1),
                format: Format::RGBA8,
                usage: ImageUsage::COLOR_ATTACHMENT,
                memory_usage: MemoryUsage::GpuOnly,
                samples: SampleCount::S1,
                mip_levels: 1,
                layers: 1,
                tiling: Tiling::Optimal,
            },
        );
        assert_eq!(img.image_type(), ImageType::D2);
        assert!(img.is_owned());
        assert_ne!(img.handle(), vk::Image::null());
        handle = img.handle().as_raw();
    }

    let calls = device.allocator.calls();
    assert_eq!(
        calls,
        vec![
            AllocatorCall::CreateImage {
                image: handle,
                memory: MemoryInfo {
                    usage: MemoryUsage::GpuOnly,
                    preferred_flags: MemoryFlags::empty(),
                },
            },
            AllocatorCall::DestroyImage {
                image: handle,
                allocation: handle,
            },
        ]
    );
}

#[test]
fn transient_usage_prefers_lazy_allocation() {
    let device = MockDevice::default();
    let img = make_image(
        &device,
        &ImageInfo {
            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
            ..Default::default()
        },
    );
    drop(img);

    let lazy_requests = device.allocator.count(|c| match c {
        AllocatorCall::CreateImage { memory, .. } => {
            memory.preferred_flags.contains(MemoryFlags::LAZILY_ALLOCATED)
        }
        _ => false,
    });
    assert_eq!(lazy_requests, 1);
}

#[test]
fn adopted_image_releases_nothing() {
    let device = MockDevice::default();
    {
        let img: Image<'_, MockDevice, MockView> = Image::from_raw(
            &device,
            vk::Image::from_raw(0xBEEF),
            Extent3D::new(1920, 1080, 1),
            Format::BGRA8,
            ImageUsage::COLOR_ATTACHMENT,
        )
        .unwrap();

        assert!(!img.is_owned());
        assert!(img.memory().is_none());
        assert_eq!(img.image_type(), ImageType::D2);
        assert_eq!(img.sample_count(), SampleCount::S1);
        assert_eq!(img.subresource().mip_levels, 1);
        assert_eq!(img.subresource().array_layers, 1);
    }

    assert!(device.allocator.calls().is_empty());
}

#[test]
fn map_is_idempotent() {
    let device = MockDevice::default();
    let mut img = make_image(
        &device,
        &ImageInfo {
            extent: Extent3D::new(64, 64, 1),
            memory_usage: MemoryUsage::CpuToGpu,
            tiling: Tiling::Linear,
            ..Default::default()
        },
    );

    let first = img.map().unwrap();
    let second = img.map().unwrap();
    assert_eq!(first, second);
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::MapMemory { .. })),
        1
    );

    img.unmap();
    let _ = img.map().unwrap();
    img.unmap();
    drop(img);

    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::MapMemory { .. })),
        2
    );
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::UnmapMemory { .. })),
        2
    );
}

#[test]
#[serial]
fn linear_map_write_unmap_emits_no_warning() {
    install_logger();

    let device = MockDevice::default();
    let mut img = make_image(
        &device,
        &ImageInfo {
            extent: Extent3D::new(64, 64, 1),
            memory_usage: MemoryUsage::CpuToGpu,
            tiling: Tiling::Linear,
            ..Default::default()
        },
    );

    let ptr = img.map().unwrap();
    unsafe {
        for i in 0..16 {
            ptr.add(i).write(0xA5);
        }
    }
    let written = &img.memory().unwrap().backing[..16];
    assert!(written.iter().all(|&b| b == 0xA5));

    img.unmap();
    drop(img);

    assert!(captured_warnings().is_empty());
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::MapMemory { .. })),
        1
    );
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::UnmapMemory { .. })),
        1
    );
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::DestroyImage { .. })),
        1
    );
}

#[test]
#[serial]
fn warns_when_mapping_optimal_tiling() {
    install_logger();

    let device = MockDevice::default();
    let mut img = make_image(
        &device,
        &ImageInfo {
            tiling: Tiling::Optimal,
            memory_usage: MemoryUsage::CpuToGpu,
            ..Default::default()
        },
    );

    let ptr = img.map().unwrap();
    assert!(!ptr.is_null());

    let warnings = captured_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("not linear"));
}

#[test]
fn destroying_mapped_image_unmaps_first() {
    let device = MockDevice::default();
    let mut img = make_image(
        &device,
        &ImageInfo {
            tiling: Tiling::Linear,
            memory_usage: MemoryUsage::CpuToGpu,
            ..Default::default()
        },
    );
    let _ = img.map().unwrap();
    drop(img);

    let calls = device.allocator.calls();
    let unmap_at = calls
        .iter()
        .position(|c| matches!(c, AllocatorCall::UnmapMemory { .. }))
        .expect("no unmap observed");
    let destroy_at = calls
        .iter()
        .position(|c| matches!(c, AllocatorCall::DestroyImage { .. }))
        .expect("no destroy observed");
    assert!(unmap_at < destroy_at);
}

#[test]
fn take_transfers_ownership_and_rebinds_views() {
    let device = MockDevice::default();
    let mut pool: Pool<MockView> = Pool::default();

    let mut src = make_image(&device, &ImageInfo::default());
    let v1 = src.attach_view(&mut pool, MockView::default()).unwrap();
    let v2 = src.attach_view(&mut pool, MockView::default()).unwrap();
    let original_handle = src.handle();

    let dst = Image::take(&mut src, &mut pool);

    assert_eq!(src.handle(), vk::Image::null());
    assert!(!src.is_owned());
    assert!(src.memory().is_none());
    assert!(src.views().is_empty());
    assert!(!src.is_mapped());

    assert_eq!(dst.handle(), original_handle);
    assert!(dst.is_owned());
    assert_eq!(dst.views().len(), 2);

    for handle in [v1, v2] {
        let view = pool.get_ref(handle).unwrap();
        assert_eq!(view.rebinds, 1);
        assert_eq!(view.image, dst.handle());
    }

    drop(src);
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::DestroyImage { .. })),
        0
    );

    drop(dst);
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::DestroyImage { .. })),
        1
    );
}

#[test]
fn take_preserves_mapping() {
    let device = MockDevice::default();
    let mut pool: Pool<MockView> = Pool::default();

    let mut src = make_image(
        &device,
        &ImageInfo {
            tiling: Tiling::Linear,
            memory_usage: MemoryUsage::CpuToGpu,
            ..Default::default()
        },
    );
    let ptr = src.map().unwrap();

    let mut dst = Image::take(&mut src, &mut pool);
    assert!(!src.is_mapped());
    assert!(dst.is_mapped());
    assert_eq!(dst.map().unwrap(), ptr);

    drop(dst);
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::MapMemory { .. })),
        1
    );
    assert_eq!(
        device
            .allocator
            .count(|c| matches!(c, AllocatorCall::UnmapMemory { .. })),
        1
    );
}

#[test]
fn mapping_a_borrowed_image_fails() {
    let device = MockDevice::default();
    let mut img: Image<'_, MockDevice, MockView> = Image::from_raw(
        &device,
        vk::Image::from_raw(0xBEEF),
        Extent3D::new(800, 600, 1),
        Format::BGRA8,
        ImageUsage::COLOR_ATTACHMENT,
    )
    .unwrap();

    match img.map() {
        Err(ResourceError::MapFailed(_)) => {}
        other => panic!("expected MapFailed, got {:?}", other.map(|_| ())),
    }
    assert!(device.allocator.calls().is_empty());
}

#[test]
fn allocation_failure_carries_status() {
    let device = MockDevice::default();
    device
        .allocator
        .fail_create
        .set(Some(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));

    let result: Result<Image<'_, MockDevice, MockView>, _> =
        Image::new(&device, &ImageInfo::default());
    match result {
        Err(ResourceError::AllocationFailed(status)) => {
            assert_eq!(status, vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        other => panic!("expected AllocationFailed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn map_failure_carries_status() {
    let device = MockDevice::default();
    let mut img = make_image(
        &device,
        &ImageInfo {
            tiling: Tiling::Linear,
            memory_usage: MemoryUsage::CpuToGpu,
            ..Default::default()
        },
    );
    device
        .allocator
        .fail_map
        .set(Some(vk::Result::ERROR_MEMORY_MAP_FAILED));

    match img.map() {
        Err(ResourceError::MapFailed(status)) => {
            assert_eq!(status, vk::Result::ERROR_MEMORY_MAP_FAILED);
        }
        other => panic!("expected MapFailed, got {:?}", other.map(|_| ())),
    }
    assert!(!img.is_mapped());
}

#[test]
fn reregistering_a_view_is_idempotent() {
    let device = MockDevice::default();
    let mut pool: Pool<MockView> = Pool::default();

    let mut src = make_image(&device, &ImageInfo::default());
    let v = src.attach_view(&mut pool, MockView::default()).unwrap();
    src.views_mut().insert(v);
    assert_eq!(src.views().len(), 1);

    let dst = Image::take(&mut src, &mut pool);
    assert_eq!(pool.get_ref(v).unwrap().rebinds, 1);
    drop(dst);
}

#[test]
fn detached_views_are_not_rebound() {
    let device = MockDevice::default();
    let mut pool: Pool<MockView> = Pool::default();

    let mut src = make_image(&device, &ImageInfo::default());
    let v = src.attach_view(&mut pool, MockView::default()).unwrap();
    let detached = src.detach_view(&mut pool, v).expect("view not released");
    assert_eq!(detached.rebinds, 0);
    assert!(src.views().is_empty());
    assert!(pool.get_ref(v).is_none());

    let dst = Image::take(&mut src, &mut pool);
    assert!(dst.views().is_empty());
}

#[test]
#[should_panic(expected = "at least one mip level")]
fn zero_mip_levels_is_a_programmer_error() {
    let device = MockDevice::default();
    let _img = make_image(
        &device,
        &ImageInfo {
            mip_levels: 0,
            ..Default::default()
        },
    );
}

#[test]
#[should_panic(expected = "at least one array layer")]
fn zero_layers_is_a_programmer_error() {
    let device = MockDevice::default();
    let _img = make_image(
        &device,
        &ImageInfo {
            layers: 0,
            ..Default::default()
        },
    );
}

#[test]
fn one_dimensional_extent_classifies_as_1d() {
    let device = MockDevice::default();
    let img = make_image(
        &device,
        &ImageInfo {
            extent: Extent3D::new(4096, 0, 0),
            ..Default::default()
        },
    );
    assert_eq!(img.image_type(), ImageType::D1);
}

#[test]
fn volume_extent_classifies_as_3d() {
    let device = MockDevice::default();
    let img = make_image(
        &device,
        &ImageInfo {
            extent: Extent3D::new(64, 64, 16),
            ..Default::default()
        },
    );
    assert_eq!(img.image_type(), ImageType::D3);
}

#[test]
fn empty_extent_is_rejected() {
    let device = MockDevice::default();
    let result: Result<Image<'_, MockDevice, MockView>, _> = Image::new(
        &device,
        &ImageInfo {
            extent: Extent3D::new(0, 0, 0),
            ..Default::default()
        },
    );
    match result {
        Err(ResourceError::InvalidExtent(extent)) => {
            assert_eq!(extent, Extent3D::new(0, 0, 0));
        }
        other => panic!("expected InvalidExtent, got {:?}", other.map(|_| ())),
    }
    assert!(device.allocator.calls().is_empty());
}

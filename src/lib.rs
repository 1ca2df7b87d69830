pub mod utils;

pub mod device;
pub mod error;
pub mod image;
pub mod types;
pub mod view;

#[cfg(feature = "vkimg-vulkan")]
pub mod vulkan;

pub use device::{Device, MemoryAllocator};
pub use error::{ResourceError, Result};
pub use image::{infer_image_type, Image};
pub use types::*;
pub use utils::{Handle, Pool};
pub use view::{ImageDependent, ImageView};

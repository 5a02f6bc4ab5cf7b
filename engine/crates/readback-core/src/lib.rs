//! 统一的 GPU 异步回读
//!
//! 有些图形后端没有原生的异步回读，这时通过 native 插件基于 fence 自己实现；
//! 对调用者来说，两种后端的请求 ([`request::ReadbackRequest`]) 没有区别。
//!
//! # 使用流程
//! ```ignore
//! let mut ctx = ReadbackContext::new(host, native_lib, ReadbackSettings::default())?;
//! let starter = TextureReadbackStarter::new(&mut ctx, texture, 0)?;
//! let mut queue = ReadbackQueue::from_settings(ctx.settings());
//!
//! // 每帧
//! queue.submit_from(&mut ctx, &starter)?;
//! queue.update(|request| save(request.get_data::<u8>()));
//! ctx.on_frame();
//! ```

pub mod context;
pub mod error;
pub mod frame_queue;
pub mod native_task;
pub mod pointer_cache;
pub mod render_thread;
pub mod request;
pub mod settings;
pub mod starter;
pub mod updater;

mod payload;

pub use readback_interface as interface;

pub use context::ReadbackContext;
pub use error::{ReadbackError, ReadbackResult};
pub use frame_queue::{DrainReport, ReadbackQueue};
pub use request::ReadbackRequest;
pub use settings::{ReadbackSettings, RenderThreadMode};
pub use starter::{BufferReadbackStarter, ReadbackStarter, TextureReadbackStarter};

#[cfg(test)]
pub(crate) mod test_utils;

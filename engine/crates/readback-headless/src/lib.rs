//! 纯软件实现的 headless 设备
//!
//! [`HeadlessGpu`] 同时实现了 [`GraphicsHost`](readback_interface::host::GraphicsHost) 和
//! [`NativeReadbackLib`](readback_interface::native_lib::NativeReadbackLib)，
//! 用内存中的字节数组模拟 texture / buffer，用计数器模拟 fence。
//! 它不是驱动的实现，只用于在没有 GPU 的环境下驱动回读层。

pub mod engine_request;
pub mod headless_gpu;
mod software_task;

pub use headless_gpu::HeadlessGpu;
